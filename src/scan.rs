//! Identifier scanning for statement texts
//!
//! Extracts identifier-like tokens from a batch of raw statement strings
//! using word-boundary matching. Reserved connective, quantifier, and
//! built-in names are filtered out so they never reach declaration
//! inference.

use std::sync::OnceLock;

use indexmap::IndexSet;
use regex::Regex;

/// Names owned by the formula language itself. These are never declared
/// as symbols.
pub const RESERVED: &[&str] = &[
    "And", "Or", "Not", "Implies", "ForAll", "Exists", "Object", "True", "False",
];

fn ident_pattern() -> &'static Regex {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    IDENT.get_or_init(|| Regex::new(r"\b[A-Za-z_][A-Za-z0-9_]*\b").expect("identifier pattern"))
}

/// Check whether a name is reserved by the formula language
pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Extract every distinct identifier from the given statements, in order of
/// first appearance. Reserved names are excluded.
pub fn scan_identifiers<S: AsRef<str>>(statements: &[S]) -> IndexSet<String> {
    let mut found = IndexSet::new();
    for statement in statements {
        for m in ident_pattern().find_iter(statement.as_ref()) {
            let token = m.as_str();
            if !is_reserved(token) {
                found.insert(token.to_string());
            }
        }
    }
    found
}

/// Find the argument counts with which `name` is syntactically applied in
/// `text`, in order of appearance. `name()` counts as zero arguments;
/// nested parentheses and nested applications are handled by depth
/// tracking.
pub fn observed_arities(name: &str, text: &str) -> Vec<usize> {
    let pattern = Regex::new(&format!(r"\b{}\s*\(", regex::escape(name)))
        .expect("application pattern");

    let mut arities = Vec::new();
    for m in pattern.find_iter(text) {
        let rest = &text[m.end()..];
        if let Some(arity) = count_arguments(rest) {
            arities.push(arity);
        }
    }
    arities
}

/// Count top-level comma-separated arguments up to the matching close
/// paren. `rest` starts just after the opening paren. Returns None when the
/// paren is never closed.
fn count_arguments(rest: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut commas = 0usize;
    let mut saw_content = false;

    for ch in rest.chars() {
        match ch {
            '(' | '[' => {
                depth += 1;
                saw_content = true;
            }
            ')' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(if saw_content { commas + 1 } else { 0 });
                }
            }
            ',' if depth == 1 => {
                commas += 1;
                saw_content = true;
            }
            c if !c.is_whitespace() => saw_content = true,
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_basic() {
        let found = scan_identifiers(&["H(s)", "M(s)"]);
        let names: Vec<&str> = found.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["H", "s", "M"]);
    }

    #[test]
    fn test_scan_excludes_reserved() {
        let found = scan_identifiers(&["Implies(H(s), M(s))", "ForAll(x, Not(H(x)))"]);
        assert!(!found.contains("Implies"));
        assert!(!found.contains("ForAll"));
        assert!(!found.contains("Not"));
        assert!(found.contains("H"));
        assert!(found.contains("x"));
    }

    #[test]
    fn test_scan_arithmetic() {
        let found = scan_identifiers(&["x + y == 10", "x > 3"]);
        let names: Vec<&str> = found.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["x", "y"]);
    }

    #[test]
    fn test_scan_underscore_names() {
        let found = scan_identifiers(&["total_cost > min_price"]);
        assert!(found.contains("total_cost"));
        assert!(found.contains("min_price"));
    }

    #[test]
    fn test_observed_arity_binary() {
        assert_eq!(observed_arities("Parent", "Parent(a, b)"), vec![2]);
    }

    #[test]
    fn test_observed_arity_unary() {
        assert_eq!(observed_arities("Tall", "Tall(a)"), vec![1]);
    }

    #[test]
    fn test_observed_arity_nullary() {
        assert_eq!(observed_arities("Flag", "Flag()"), vec![0]);
    }

    #[test]
    fn test_observed_arity_never_applied() {
        assert!(observed_arities("Flag", "And(Flag, Other)").is_empty());
    }

    #[test]
    fn test_observed_arity_nested_application() {
        // The comma inside the inner application must not count.
        assert_eq!(observed_arities("Knows", "Knows(FatherOf(a, b), c)"), vec![2]);
    }

    #[test]
    fn test_observed_arity_multiple_usages() {
        let arities = observed_arities("R", "And(R(a), R(a, b))");
        assert_eq!(arities, vec![1, 2]);
    }

    #[test]
    fn test_word_boundary() {
        // `Parental` must not match `Parent`.
        assert!(observed_arities("Parent", "Parental(a)").is_empty());
    }
}
