//! Statement evaluation
//!
//! Bridges the surface syntax and the decision engines. The evaluator
//! owns an inferred symbol table, picks the query mode from it, and
//! lowers each parsed statement into a solver [`Term`] with canonical
//! names, checked arities, and resolved sorts. Every failure here is a
//! hard error that names the offending statement; nothing speculative
//! reaches the engines.

use indexmap::IndexMap;

use crate::error::{EntailError, EntailResult, ErrorCode};
use crate::expr::{self, BinOp, Expr};
use crate::infer::{NumericType, SymbolKind, SymbolTable};
use crate::solver::term::{Sort, Term};
use crate::solver::{Session, SolverLimits};

/// How a query's statements are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Relations over typed individuals
    Predicate,
    /// Arithmetic over numeric variables
    Numeric,
}

/// Pick the mode for a query from its declarations. Any relation symbol
/// forces predicate mode; a purely nominal query is numeric.
pub fn select_mode(table: &SymbolTable) -> QueryMode {
    if table.has_relations() {
        QueryMode::Predicate
    } else {
        QueryMode::Numeric
    }
}

pub struct Evaluator<'a> {
    table: &'a SymbolTable,
    mode: QueryMode,
}

impl<'a> Evaluator<'a> {
    pub fn new(table: &'a SymbolTable) -> Self {
        let mode = select_mode(table);
        Evaluator { table, mode }
    }

    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    /// A fresh solver session matching this query's mode
    pub fn session(&self, limits: SolverLimits) -> Session {
        match self.mode {
            QueryMode::Predicate => {
                let individuals = self.table.individuals().into_iter().map(String::from).collect();
                Session::typed_individuals(individuals, limits)
            }
            QueryMode::Numeric => {
                let mut vars = IndexMap::new();
                for symbol in self.table.iter() {
                    if symbol.kind != SymbolKind::Individual {
                        continue;
                    }
                    let sort = match symbol.numeric {
                        Some(NumericType::Int) | None => Sort::Int,
                        Some(NumericType::Real) => Sort::Real,
                        Some(NumericType::Bool) => Sort::Bool,
                    };
                    vars.insert(symbol.canonical_name.clone(), sort);
                }
                Session::numeric(vars, limits)
            }
        }
    }

    /// Parse and lower one statement
    pub fn lower_statement(&self, statement: &str) -> EntailResult<Term> {
        let ast = expr::parse_statement(statement).map_err(|e| e.in_statement(statement))?;
        let mut scope = Vec::new();
        self.lower(&ast, &mut scope).map_err(|e| e.in_statement(statement))
    }

    fn lower(&self, ast: &Expr, scope: &mut Vec<String>) -> EntailResult<Term> {
        match ast {
            Expr::Int(n) => Ok(Term::Int(*n)),
            Expr::Real(x) => Ok(Term::Real(*x)),
            Expr::Ident(name) => self.lower_name(name, scope),
            Expr::Neg(inner) => Ok(Term::Neg(Box::new(self.lower(inner, scope)?))),
            Expr::Binary(op, lhs, rhs) => {
                let lhs = Box::new(self.lower(lhs, scope)?);
                let rhs = Box::new(self.lower(rhs, scope)?);
                Ok(match op {
                    BinOp::Eq => Term::Eq(lhs, rhs),
                    BinOp::Ne => Term::Ne(lhs, rhs),
                    BinOp::Lt => Term::Lt(lhs, rhs),
                    BinOp::Le => Term::Le(lhs, rhs),
                    BinOp::Gt => Term::Gt(lhs, rhs),
                    BinOp::Ge => Term::Ge(lhs, rhs),
                    BinOp::Add => Term::Add(lhs, rhs),
                    BinOp::Sub => Term::Sub(lhs, rhs),
                    BinOp::Mul => Term::Mul(lhs, rhs),
                    BinOp::Div => Term::Div(lhs, rhs),
                })
            }
            Expr::Call(name, args) => self.lower_call(name, args, scope),
            Expr::Bindings(_) => Err(EntailError::new(
                ErrorCode::InvalidBinding,
                "binding lists are only valid as a quantifier's first argument",
            )),
        }
    }

    fn lower_name(&self, name: &str, scope: &[String]) -> EntailResult<Term> {
        match name {
            "True" => return Ok(Term::True),
            "False" => return Ok(Term::False),
            _ => {}
        }
        if scope.iter().any(|bound| bound == name) {
            return Ok(Term::Var(name.to_string()));
        }
        let symbol = self
            .table
            .get(name)
            .ok_or_else(|| EntailError::unbound(name))?;
        match symbol.kind {
            SymbolKind::Relation => {
                // Bare relation name in formula position is a propositional atom
                Ok(Term::App(symbol.canonical_name.clone(), Vec::new()))
            }
            SymbolKind::Individual => match self.mode {
                QueryMode::Predicate => Ok(Term::Const(symbol.canonical_name.clone())),
                QueryMode::Numeric => Ok(Term::Var(symbol.canonical_name.clone())),
            },
        }
    }

    fn lower_call(&self, name: &str, args: &[Expr], scope: &mut Vec<String>) -> EntailResult<Term> {
        match name {
            "Not" => {
                self.expect_args(name, args, 1)?;
                Ok(Term::not(self.lower(&args[0], scope)?))
            }
            "And" | "Or" => {
                if args.is_empty() {
                    return Err(EntailError::new(
                        ErrorCode::ArityMismatch,
                        format!("'{}' requires at least one argument", name),
                    ));
                }
                let mut parts = Vec::with_capacity(args.len());
                for arg in args {
                    parts.push(self.lower(arg, scope)?);
                }
                Ok(if name == "And" { Term::And(parts) } else { Term::Or(parts) })
            }
            "Implies" => {
                self.expect_args(name, args, 2)?;
                Ok(Term::Implies(
                    Box::new(self.lower(&args[0], scope)?),
                    Box::new(self.lower(&args[1], scope)?),
                ))
            }
            "ForAll" | "Exists" => {
                self.expect_args(name, args, 2)?;
                let bindings = binding_names(&args[0]).ok_or_else(|| {
                    EntailError::new(
                        ErrorCode::InvalidBinding,
                        format!("'{}' requires a variable or [list] as its first argument", name),
                    )
                })?;
                let depth = scope.len();
                scope.extend(bindings.iter().cloned());
                let body = self.lower(&args[1], scope);
                scope.truncate(depth);
                let body = Box::new(body?);
                Ok(if name == "ForAll" {
                    Term::ForAll(bindings, body)
                } else {
                    Term::Exists(bindings, body)
                })
            }
            _ => {
                let symbol = self.table.get(name).ok_or_else(|| {
                    EntailError::new(ErrorCode::UnknownOperator, format!("unknown operator '{}'", name))
                })?;
                if symbol.kind != SymbolKind::Relation {
                    return Err(EntailError::new(
                        ErrorCode::SortMismatch,
                        format!("'{}' is an individual and cannot be applied to arguments", name),
                    ));
                }
                if symbol.arity != args.len() {
                    return Err(EntailError::arity_mismatch(name, symbol.arity, args.len()));
                }
                let mut lowered = Vec::with_capacity(args.len());
                for arg in args {
                    lowered.push(self.lower(arg, scope)?);
                }
                Ok(Term::App(symbol.canonical_name.clone(), lowered))
            }
        }
    }

    fn expect_args(&self, name: &str, args: &[Expr], expected: usize) -> EntailResult<()> {
        if args.len() != expected {
            return Err(EntailError::arity_mismatch(name, expected, args.len()));
        }
        Ok(())
    }
}

/// Accept both `ForAll([x, y], ...)` and the single-variable `ForAll(x, ...)`
fn binding_names(arg: &Expr) -> Option<Vec<String>> {
    match arg {
        Expr::Bindings(names) => Some(names.clone()),
        Expr::Ident(name) => Some(vec![name.clone()]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::{infer_declarations, HeuristicClassifier};
    use std::collections::BTreeMap;

    fn table_for(statements: &[&str]) -> SymbolTable {
        table_with_aliases(statements, &BTreeMap::new())
    }

    fn table_with_aliases(statements: &[&str], aliases: &BTreeMap<String, String>) -> SymbolTable {
        infer_declarations(statements, aliases, &BTreeMap::new(), &HeuristicClassifier::default())
            .unwrap()
            .table
    }

    #[test]
    fn relation_symbols_force_predicate_mode() {
        let table = table_for(&["H(s)"]);
        assert_eq!(select_mode(&table), QueryMode::Predicate);
    }

    #[test]
    fn nominal_statements_select_numeric_mode() {
        let table = table_for(&["x + y == 10"]);
        assert_eq!(select_mode(&table), QueryMode::Numeric);
    }

    #[test]
    fn lowers_implication_with_canonical_names() {
        let mut aliases = BTreeMap::new();
        aliases.insert("H".to_string(), "Human".to_string());
        aliases.insert("s".to_string(), "socrates".to_string());
        let table = table_with_aliases(&["Implies(H(s), M(s))"], &aliases);
        let evaluator = Evaluator::new(&table);
        let term = evaluator.lower_statement("Implies(H(s), M(s))").unwrap();
        assert_eq!(term.to_string(), "Implies(Human(socrates), M(socrates))");
    }

    #[test]
    fn lowers_quantifier_with_bound_variables() {
        let statement = "ForAll([x], Implies(Human(x), Mortal(x)))";
        let table = table_for(&[statement]);
        let evaluator = Evaluator::new(&table);
        let term = evaluator.lower_statement(statement).unwrap();
        match term {
            Term::ForAll(vars, body) => {
                assert_eq!(vars, vec!["x".to_string()]);
                assert!(body.to_string().contains("Human(x)"));
            }
            other => panic!("expected ForAll, got {:?}", other),
        }
    }

    #[test]
    fn accepts_single_variable_quantifier_form() {
        let statement = "Exists(x, Human(x))";
        let table = table_for(&[statement]);
        let evaluator = Evaluator::new(&table);
        let term = evaluator.lower_statement(statement).unwrap();
        assert!(matches!(term, Term::Exists(_, _)));
    }

    #[test]
    fn arity_mismatch_names_the_statement() {
        let table = table_for(&["Loves(a, b)", "Loves(a)"]);
        let evaluator = Evaluator::new(&table);
        let err = evaluator.lower_statement("Loves(a)").unwrap_err();
        assert_eq!(err.code, ErrorCode::ArityMismatch);
        assert_eq!(err.statement(), Some("Loves(a)"));
    }

    #[test]
    fn numeric_individuals_lower_to_variables() {
        let table = table_for(&["x > 3"]);
        let evaluator = Evaluator::new(&table);
        let term = evaluator.lower_statement("x > 3").unwrap();
        assert_eq!(term, Term::Gt(Box::new(Term::Var("x".to_string())), Box::new(Term::Int(3))));
    }

    #[test]
    fn reserved_truth_constants_lower_directly() {
        let table = table_for(&["Implies(True, H(s))"]);
        let evaluator = Evaluator::new(&table);
        let term = evaluator.lower_statement("Implies(True, H(s))").unwrap();
        assert!(matches!(term, Term::Implies(ref a, _) if **a == Term::True));
    }

    #[test]
    fn applying_an_individual_is_a_sort_error() {
        let mut hints = BTreeMap::new();
        hints.insert("s".to_string(), "individual".to_string());
        let inference =
            infer_declarations(&["H(a)", "s"], &BTreeMap::new(), &hints, &HeuristicClassifier::default())
                .unwrap();
        let evaluator = Evaluator::new(&inference.table);
        let err = evaluator.lower_statement("s(a)").unwrap_err();
        assert_eq!(err.code, ErrorCode::SortMismatch);
    }

    #[test]
    fn not_requires_exactly_one_argument() {
        let table = table_for(&["H(s)"]);
        let evaluator = Evaluator::new(&table);
        let err = evaluator.lower_statement("Not(H(s), H(s))").unwrap_err();
        assert_eq!(err.code, ErrorCode::ArityMismatch);
    }
}
