//! Logical terms
//!
//! The solver-facing representation of statements. Evaluation lowers the
//! surface AST into [`Term`]s with sorts resolved, so the decision engines
//! never see raw text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Sort of a term or declared name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    Entity,
    Bool,
    Int,
    Real,
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sort::Entity => write!(f, "entity"),
            Sort::Bool => write!(f, "bool"),
            Sort::Int => write!(f, "int"),
            Sort::Real => write!(f, "real"),
        }
    }
}

/// A lowered statement
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    True,
    False,
    /// A declared individual, by canonical name
    Const(String),
    /// A bound or numeric variable
    Var(String),
    Int(i64),
    Real(f64),
    /// Relation application, by canonical name
    App(String, Vec<Term>),
    Not(Box<Term>),
    And(Vec<Term>),
    Or(Vec<Term>),
    Implies(Box<Term>, Box<Term>),
    ForAll(Vec<String>, Box<Term>),
    Exists(Vec<String>, Box<Term>),
    Eq(Box<Term>, Box<Term>),
    Ne(Box<Term>, Box<Term>),
    Lt(Box<Term>, Box<Term>),
    Le(Box<Term>, Box<Term>),
    Gt(Box<Term>, Box<Term>),
    Ge(Box<Term>, Box<Term>),
    Add(Box<Term>, Box<Term>),
    Sub(Box<Term>, Box<Term>),
    Mul(Box<Term>, Box<Term>),
    Div(Box<Term>, Box<Term>),
    Neg(Box<Term>),
}

impl Term {
    pub fn not(inner: Term) -> Term {
        Term::Not(Box::new(inner))
    }

    /// True if the term is a boolean connective, quantifier, or comparison
    pub fn is_formula(&self) -> bool {
        matches!(
            self,
            Term::True
                | Term::False
                | Term::App(_, _)
                | Term::Not(_)
                | Term::And(_)
                | Term::Or(_)
                | Term::Implies(_, _)
                | Term::ForAll(_, _)
                | Term::Exists(_, _)
                | Term::Eq(_, _)
                | Term::Ne(_, _)
                | Term::Lt(_, _)
                | Term::Le(_, _)
                | Term::Gt(_, _)
                | Term::Ge(_, _)
                | Term::Var(_)
        )
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::True => write!(f, "True"),
            Term::False => write!(f, "False"),
            Term::Const(name) | Term::Var(name) => write!(f, "{}", name),
            Term::Int(n) => write!(f, "{}", n),
            Term::Real(x) => write!(f, "{}", x),
            Term::App(name, args) => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Term::Not(inner) => write!(f, "Not({})", inner),
            Term::And(terms) => {
                write!(f, "And(")?;
                for (i, t) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
            Term::Or(terms) => {
                write!(f, "Or(")?;
                for (i, t) in terms.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
            Term::Implies(a, b) => write!(f, "Implies({}, {})", a, b),
            Term::ForAll(vars, body) => write!(f, "ForAll([{}], {})", vars.join(", "), body),
            Term::Exists(vars, body) => write!(f, "Exists([{}], {})", vars.join(", "), body),
            Term::Eq(a, b) => write!(f, "({} == {})", a, b),
            Term::Ne(a, b) => write!(f, "({} != {})", a, b),
            Term::Lt(a, b) => write!(f, "({} < {})", a, b),
            Term::Le(a, b) => write!(f, "({} <= {})", a, b),
            Term::Gt(a, b) => write!(f, "({} > {})", a, b),
            Term::Ge(a, b) => write!(f, "({} >= {})", a, b),
            Term::Add(a, b) => write!(f, "({} + {})", a, b),
            Term::Sub(a, b) => write!(f, "({} - {})", a, b),
            Term::Mul(a, b) => write!(f, "({} * {})", a, b),
            Term::Div(a, b) => write!(f, "({} / {})", a, b),
            Term::Neg(inner) => write!(f, "(-{})", inner),
        }
    }
}

/// A concrete value reported in a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Real(f64),
    Entity(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Real(x) => write!(f, "{}", x),
            Value::Entity(name) => write!(f, "{}", name),
        }
    }
}
