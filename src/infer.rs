//! Declaration inference
//!
//! Given raw statements plus optional aliases and type hints, produce a
//! symbol table declaring every free name before evaluation begins. The
//! resolution order is fixed: aliases first, then explicit hints, then
//! heuristic classification from how each name is used in the text.
//!
//! The heuristic is deliberately simple. A name applied to arguments is a
//! relation with the observed arity; a bare name starting with a lowercase
//! letter is an individual; any other bare name is a relation of the
//! configured default arity.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::{EntailError, EntailResult, ErrorCode};
use crate::expr::{self, Expr};
use crate::scan;

// ============================================================================
// Symbol model
// ============================================================================

/// Classification of a declared name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    /// A constant entity in the domain
    Individual,
    /// A predicate applied to entity arguments
    Relation,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolKind::Individual => write!(f, "individual"),
            SymbolKind::Relation => write!(f, "relation"),
        }
    }
}

/// Numeric sort for variables in arithmetic statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericType {
    Int,
    Real,
    Bool,
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericType::Int => write!(f, "int"),
            NumericType::Real => write!(f, "real"),
            NumericType::Bool => write!(f, "bool"),
        }
    }
}

/// A caller-supplied hint constraining how a name is declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeHint {
    Individual,
    Relation(Option<usize>),
    Numeric(NumericType),
}

impl TypeHint {
    /// Parse a wire-format hint such as `"individual"`, `"relation"`,
    /// `"relation/2"`, `"int"`, `"real"`, or `"bool"`.
    pub fn parse(text: &str) -> EntailResult<Self> {
        let lower = text.trim().to_ascii_lowercase();
        if let Some(arity_text) = lower.strip_prefix("relation/") {
            let arity = arity_text.parse::<usize>().map_err(|_| {
                EntailError::new(ErrorCode::InvalidHint, format!("invalid relation arity '{}'", arity_text))
            })?;
            return Ok(TypeHint::Relation(Some(arity)));
        }
        match lower.as_str() {
            "individual" | "const" | "constant" => Ok(TypeHint::Individual),
            "relation" | "predicate" => Ok(TypeHint::Relation(None)),
            "int" | "integer" => Ok(TypeHint::Numeric(NumericType::Int)),
            "real" | "float" => Ok(TypeHint::Numeric(NumericType::Real)),
            "bool" | "boolean" => Ok(TypeHint::Numeric(NumericType::Bool)),
            other => Err(EntailError::new(
                ErrorCode::InvalidHint,
                format!("unknown type hint '{}'", other),
            )
            .with_hint("Expected individual, relation, relation/N, int, real, or bool")),
        }
    }
}

/// A fully inferred declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    /// The name as written in the statements
    pub source_name: String,
    /// The name after alias resolution
    pub canonical_name: String,
    pub kind: SymbolKind,
    /// Argument count for relations, zero for individuals
    pub arity: usize,
    /// Numeric sort, present only for numeric-mode variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numeric: Option<NumericType>,
}

/// Inferred declarations for one query, in first-appearance order
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: IndexMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { symbols: IndexMap::new() }
    }

    /// Look up a declaration by source name
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// Resolve a source name to its canonical form, or echo it back
    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.symbols.get(name).map(|s| s.canonical_name.as_str()).unwrap_or(name)
    }

    pub fn insert(&mut self, symbol: Symbol) -> EntailResult<()> {
        if let Some(existing) = self.symbols.get(&symbol.source_name) {
            if existing != &symbol {
                return Err(EntailError::conflict(
                    &symbol.source_name,
                    &describe(&symbol),
                    &describe(existing),
                ));
            }
            return Ok(());
        }
        // One canonical name cannot be both an entity and a predicate, no
        // matter how many source spellings reach it.
        if let Some(existing) = self
            .symbols
            .values()
            .find(|s| s.canonical_name == symbol.canonical_name && s.kind != symbol.kind)
        {
            return Err(EntailError::conflict(
                &symbol.canonical_name,
                &describe(&symbol),
                &describe(existing),
            ));
        }
        self.symbols.insert(symbol.source_name.clone(), symbol);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Canonical names of every individual, in declaration order
    pub fn individuals(&self) -> Vec<&str> {
        self.symbols
            .values()
            .filter(|s| s.kind == SymbolKind::Individual)
            .map(|s| s.canonical_name.as_str())
            .collect()
    }

    /// True if any declared symbol is a relation
    pub fn has_relations(&self) -> bool {
        self.symbols.values().any(|s| s.kind == SymbolKind::Relation)
    }
}

fn describe(symbol: &Symbol) -> String {
    match symbol.kind {
        SymbolKind::Individual => match symbol.numeric {
            Some(numeric) => format!("{} {}", numeric, symbol.kind),
            None => symbol.kind.to_string(),
        },
        SymbolKind::Relation => format!("{}/{}", symbol.kind, symbol.arity),
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Strategy for classifying names with no hint and no applied usage
pub trait Classify {
    fn classify(&self, name: &str) -> SymbolKind;
    /// Arity assigned to a relation never seen applied to arguments
    fn default_arity(&self) -> usize;
}

/// Case-based classifier: lowercase-initial names are individuals,
/// everything else is a relation.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicClassifier {
    pub default_arity: usize,
}

impl Default for HeuristicClassifier {
    fn default() -> Self {
        HeuristicClassifier { default_arity: 1 }
    }
}

impl Classify for HeuristicClassifier {
    fn classify(&self, name: &str) -> SymbolKind {
        match name.chars().next() {
            Some(c) if c.is_lowercase() => SymbolKind::Individual,
            _ => SymbolKind::Relation,
        }
    }

    fn default_arity(&self) -> usize {
        self.default_arity
    }
}

// ============================================================================
// Name discovery
// ============================================================================

/// Binder list of a quantifier call, accepting the bracket form and the
/// single-variable shorthand
fn quantifier_binders(arg: &Expr) -> Option<Vec<String>> {
    match arg {
        Expr::Bindings(names) => Some(names.clone()),
        Expr::Ident(name) => Some(vec![name.clone()]),
        _ => None,
    }
}

/// Walk a parsed statement collecting the names that occur free.
/// Quantifier-bound variables belong to their statement alone and are
/// never declared.
fn collect_free_names(ast: &Expr, bound: &mut Vec<String>, found: &mut IndexSet<String>) {
    match ast {
        Expr::Int(_) | Expr::Real(_) | Expr::Bindings(_) => {}
        Expr::Ident(name) => {
            if !scan::is_reserved(name) && !bound.iter().any(|b| b == name) {
                found.insert(name.clone());
            }
        }
        Expr::Neg(inner) => collect_free_names(inner, bound, found),
        Expr::Binary(_, lhs, rhs) => {
            collect_free_names(lhs, bound, found);
            collect_free_names(rhs, bound, found);
        }
        Expr::Call(name, args) => {
            if (name == "ForAll" || name == "Exists") && args.len() == 2 {
                if let Some(binders) = quantifier_binders(&args[0]) {
                    let depth = bound.len();
                    bound.extend(binders);
                    collect_free_names(&args[1], bound, found);
                    bound.truncate(depth);
                    return;
                }
            }
            if !scan::is_reserved(name) && !bound.iter().any(|b| b == name) {
                found.insert(name.clone());
            }
            for arg in args {
                collect_free_names(arg, bound, found);
            }
        }
    }
}

/// Free names across all statements, in first-appearance order. A statement
/// that does not parse falls back to textual scanning; its parse error
/// surfaces later, during evaluation.
fn free_names<S: AsRef<str>>(statements: &[S]) -> IndexSet<String> {
    let mut found = IndexSet::new();
    for statement in statements {
        match expr::parse_statement(statement.as_ref()) {
            Ok(ast) => collect_free_names(&ast, &mut Vec::new(), &mut found),
            Err(_) => found.extend(scan::scan_identifiers(&[statement.as_ref()])),
        }
    }
    found
}

// ============================================================================
// Inference
// ============================================================================

/// Output of declaration inference: the symbol table plus any
/// non-fatal observations worth reporting to the caller.
#[derive(Debug, Clone, Default)]
pub struct Inference {
    pub table: SymbolTable,
    pub warnings: Vec<String>,
}

/// Infer declarations for every free name appearing in `statements`.
///
/// `aliases` maps short source names to canonical ones. `hints` maps either
/// form of a name to a wire-format [`TypeHint`]. A hint that contradicts
/// observed usage, or two hints that disagree through an alias, is a
/// declaration conflict and aborts the query.
pub fn infer_declarations<S: AsRef<str>>(
    statements: &[S],
    aliases: &BTreeMap<String, String>,
    hints: &BTreeMap<String, String>,
    classifier: &dyn Classify,
) -> EntailResult<Inference> {
    let mut parsed_hints: BTreeMap<&str, TypeHint> = BTreeMap::new();
    for (name, text) in hints {
        let hint = TypeHint::parse(text).map_err(|e| e.with_context("symbol", name.clone()))?;
        parsed_hints.insert(name.as_str(), hint);
    }

    let joined: String = statements.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join("\n");
    let names = free_names(statements);

    let mut inference = Inference::default();
    for name in &names {
        if scan::is_reserved(name) {
            continue;
        }

        let canonical = aliases.get(name).cloned().unwrap_or_else(|| name.clone());

        // A hint on either form applies; the source-name hint wins if both
        // are present and they agree, otherwise it is a conflict.
        let hint = match (parsed_hints.get(name.as_str()), parsed_hints.get(canonical.as_str())) {
            (Some(a), Some(b)) if a != b => {
                return Err(EntailError::new(
                    ErrorCode::DeclarationConflict,
                    format!("hints for '{}' and its alias target '{}' disagree", name, canonical),
                ));
            }
            (Some(h), _) | (None, Some(h)) => Some(*h),
            (None, None) => None,
        };

        // An unhinted alias target still has to agree in kind with what the
        // source name is hinted as, or the declaration is silently wrong.
        if let Some(h) = hint {
            if canonical != *name && !parsed_hints.contains_key(canonical.as_str()) {
                let hinted_kind = match h {
                    TypeHint::Relation(_) => SymbolKind::Relation,
                    TypeHint::Individual | TypeHint::Numeric(_) => SymbolKind::Individual,
                };
                let target_kind = classifier.classify(&canonical);
                if hinted_kind != target_kind {
                    return Err(EntailError::new(
                        ErrorCode::DeclarationConflict,
                        format!(
                            "'{}' hinted as {} but its alias target '{}' is {} by naming convention",
                            name, hinted_kind, canonical, target_kind
                        ),
                    ));
                }
            }
        }

        let arities = scan::observed_arities(name, &joined);
        let observed_arity = arities.first().copied();
        if let Some(first) = observed_arity {
            if arities.iter().any(|&a| a != first) {
                inference.warnings.push(format!(
                    "'{}' applied with inconsistent arities {:?}; using {}",
                    name, arities, first
                ));
            }
        }

        let symbol = match hint {
            Some(TypeHint::Individual) => {
                if observed_arity.is_some() {
                    return Err(EntailError::conflict(name, "relation (applied to arguments)", "individual (hinted)"));
                }
                Symbol {
                    source_name: name.clone(),
                    canonical_name: canonical,
                    kind: SymbolKind::Individual,
                    arity: 0,
                    numeric: None,
                }
            }
            Some(TypeHint::Relation(hinted_arity)) => {
                let arity = match (hinted_arity, observed_arity) {
                    (Some(h), Some(o)) if h != o => {
                        return Err(EntailError::new(
                            ErrorCode::ArityAmbiguity,
                            format!("'{}' hinted as relation/{} but applied to {} arguments", name, h, o),
                        ));
                    }
                    (Some(h), _) => h,
                    (None, Some(o)) => o,
                    (None, None) => classifier.default_arity(),
                };
                Symbol {
                    source_name: name.clone(),
                    canonical_name: canonical,
                    kind: SymbolKind::Relation,
                    arity,
                    numeric: None,
                }
            }
            Some(TypeHint::Numeric(numeric)) => {
                if observed_arity.is_some() {
                    return Err(EntailError::conflict(name, "relation (applied to arguments)", "numeric variable (hinted)"));
                }
                Symbol {
                    source_name: name.clone(),
                    canonical_name: canonical,
                    kind: SymbolKind::Individual,
                    arity: 0,
                    numeric: Some(numeric),
                }
            }
            None => match observed_arity {
                Some(arity) => Symbol {
                    source_name: name.clone(),
                    canonical_name: canonical,
                    kind: SymbolKind::Relation,
                    arity,
                    numeric: None,
                },
                None => match classifier.classify(name) {
                    SymbolKind::Individual => Symbol {
                        source_name: name.clone(),
                        canonical_name: canonical,
                        kind: SymbolKind::Individual,
                        arity: 0,
                        numeric: None,
                    },
                    SymbolKind::Relation => Symbol {
                        source_name: name.clone(),
                        canonical_name: canonical,
                        kind: SymbolKind::Relation,
                        arity: classifier.default_arity(),
                        numeric: None,
                    },
                },
            },
        };

        inference.table.insert(symbol)?;
    }

    Ok(inference)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn infer(statements: &[&str]) -> Inference {
        infer_declarations(statements, &BTreeMap::new(), &BTreeMap::new(), &HeuristicClassifier::default())
            .unwrap()
    }

    #[test]
    fn classifies_lowercase_as_individual() {
        let inference = infer(&["H(s)"]);
        let s = inference.table.get("s").unwrap();
        assert_eq!(s.kind, SymbolKind::Individual);
        assert_eq!(s.arity, 0);
    }

    #[test]
    fn classifies_applied_name_as_relation() {
        let inference = infer(&["H(s)"]);
        let h = inference.table.get("H").unwrap();
        assert_eq!(h.kind, SymbolKind::Relation);
        assert_eq!(h.arity, 1);
    }

    #[test]
    fn infers_binary_arity_from_usage() {
        let inference = infer(&["Loves(a, b)"]);
        assert_eq!(inference.table.get("Loves").unwrap().arity, 2);
    }

    #[test]
    fn bare_relation_defaults_to_unary() {
        let inference = infer(&["Implies(Raining, Wet)"]);
        let raining = inference.table.get("Raining").unwrap();
        assert_eq!(raining.kind, SymbolKind::Relation);
        assert_eq!(raining.arity, 1);
    }

    #[test]
    fn skips_reserved_words() {
        let inference = infer(&["Implies(H(s), Not(M(s)))"]);
        assert!(inference.table.get("Implies").is_none());
        assert!(inference.table.get("Not").is_none());
        assert!(inference.table.get("H").is_some());
    }

    #[test]
    fn resolves_aliases_to_canonical_names() {
        let mut aliases = BTreeMap::new();
        aliases.insert("H".to_string(), "Human".to_string());
        aliases.insert("s".to_string(), "socrates".to_string());
        let inference =
            infer_declarations(&["H(s)"], &aliases, &BTreeMap::new(), &HeuristicClassifier::default()).unwrap();
        assert_eq!(inference.table.canonical("H"), "Human");
        assert_eq!(inference.table.canonical("s"), "socrates");
    }

    #[test]
    fn hint_overrides_case_heuristic() {
        let mut hints = BTreeMap::new();
        hints.insert("x".to_string(), "int".to_string());
        let inference =
            infer_declarations(&["x > 3"], &BTreeMap::new(), &hints, &HeuristicClassifier::default()).unwrap();
        let x = inference.table.get("x").unwrap();
        assert_eq!(x.kind, SymbolKind::Individual);
        assert_eq!(x.numeric, Some(NumericType::Int));
    }

    #[test]
    fn individual_hint_conflicts_with_applied_usage() {
        let mut hints = BTreeMap::new();
        hints.insert("s".to_string(), "individual".to_string());
        let err = infer_declarations(&["s(x)"], &BTreeMap::new(), &hints, &HeuristicClassifier::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DeclarationConflict);
    }

    #[test]
    fn relation_hint_arity_conflicts_with_usage() {
        let mut hints = BTreeMap::new();
        hints.insert("R".to_string(), "relation/2".to_string());
        let err = infer_declarations(&["R(a)"], &BTreeMap::new(), &hints, &HeuristicClassifier::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ArityAmbiguity);
    }

    #[test]
    fn inconsistent_arities_warn_and_use_first() {
        let inference = infer(&["R(a)", "R(a, b)"]);
        assert_eq!(inference.table.get("R").unwrap().arity, 1);
        assert_eq!(inference.warnings.len(), 1);
    }

    #[test]
    fn parses_relation_hint_with_arity() {
        assert_eq!(TypeHint::parse("relation/3").unwrap(), TypeHint::Relation(Some(3)));
        assert_eq!(TypeHint::parse("Individual").unwrap(), TypeHint::Individual);
        assert!(TypeHint::parse("widget").is_err());
    }

    #[test]
    fn canonical_echoes_undeclared_names() {
        let table = SymbolTable::default();
        assert_eq!(table.canonical("never_seen"), "never_seen");
    }

    #[test]
    fn alias_target_kind_conflicts_with_relation_hint() {
        let mut aliases = BTreeMap::new();
        aliases.insert("s".to_string(), "socrates".to_string());
        let mut hints = BTreeMap::new();
        hints.insert("s".to_string(), "relation".to_string());
        let err = infer_declarations(&["H(s)"], &aliases, &hints, &HeuristicClassifier::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::DeclarationConflict);
    }

    #[test]
    fn canonical_name_demanded_as_both_kinds_is_conflict() {
        let mut aliases = BTreeMap::new();
        aliases.insert("t".to_string(), "Thing".to_string());
        let err = infer_declarations(
            &["Thing(a)", "H(t)"],
            &aliases,
            &BTreeMap::new(),
            &HeuristicClassifier::default(),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::DeclarationConflict);
    }

    #[test]
    fn quantifier_binders_are_not_declared() {
        let inference = infer(&["ForAll([x], Implies(H(x), M(x)))"]);
        assert!(inference.table.get("x").is_none());
        assert!(inference.table.get("H").is_some());
        assert!(inference.table.get("M").is_some());
    }

    #[test]
    fn binder_name_used_free_elsewhere_is_declared() {
        let inference = infer(&["ForAll([x], H(x))", "M(x)"]);
        let x = inference.table.get("x").unwrap();
        assert_eq!(x.kind, SymbolKind::Individual);
    }

    #[test]
    fn first_appearance_order_is_preserved() {
        let inference = infer(&["M(b)", "H(a)"]);
        let order: Vec<&str> = inference.table.iter().map(|s| s.source_name.as_str()).collect();
        assert_eq!(order, vec!["M", "b", "H", "a"]);
    }
}
