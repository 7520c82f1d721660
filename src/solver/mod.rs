//! Decision engines
//!
//! The capability boundary between the query pipeline and the machinery
//! that decides satisfiability. The pipeline talks to a [`DecisionEngine`]
//! only: it asserts lowered terms and asks for one three-valued verdict.
//! Two engines ship with the crate, one per query mode, and the trait is
//! the seam where an external solver could be swapped in.

pub mod arith;
pub mod ground;
pub mod sat;
pub mod term;

use std::collections::BTreeMap;
use std::time::Duration;

use indexmap::IndexMap;

use crate::error::EntailResult;
use crate::solver::term::{Sort, Term, Value};

pub use arith::ArithEngine;
pub use ground::GroundEngine;

/// Three-valued result of a satisfiability check
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// Satisfiable, with a witness assignment
    Sat(BTreeMap<String, Value>),
    /// Proven unsatisfiable
    Unsat,
    /// Undecided within the engine's capability or budget
    Unknown(String),
}

impl CheckOutcome {
    pub fn is_definitive(&self) -> bool {
        !matches!(self, CheckOutcome::Unknown(_))
    }
}

/// Resource limits applied to a single check
#[derive(Debug, Clone, Copy)]
pub struct SolverLimits {
    /// Branching decisions before the propositional core gives up
    pub max_decisions: u64,
    /// Wall-clock budget for one check
    pub timeout: Option<Duration>,
}

impl Default for SolverLimits {
    fn default() -> Self {
        SolverLimits { max_decisions: 100_000, timeout: Some(Duration::from_secs(10)) }
    }
}

/// A solver capable of deciding satisfiability of asserted statements.
///
/// Implementations must be sound: `Unsat` only when the assertions are
/// provably unsatisfiable, `Sat` only with a genuine witness. Anything
/// else is `Unknown`.
pub trait DecisionEngine {
    fn assert(&mut self, term: Term) -> EntailResult<()>;
    fn check(&mut self) -> EntailResult<CheckOutcome>;
}

/// One solving session, bound to a query mode at construction
pub struct Session {
    engine: Box<dyn DecisionEngine>,
}

impl Session {
    /// Session over declared individuals, for predicate-mode queries
    pub fn typed_individuals(individuals: Vec<String>, limits: SolverLimits) -> Session {
        Session { engine: Box::new(GroundEngine::new(individuals, limits)) }
    }

    /// Session over numeric variables, for arithmetic-mode queries
    pub fn numeric(vars: IndexMap<String, Sort>, limits: SolverLimits) -> Session {
        Session { engine: Box::new(ArithEngine::new(vars, limits)) }
    }

    pub fn assert(&mut self, term: Term) -> EntailResult<()> {
        self.engine.assert(term)
    }

    pub fn check(&mut self) -> EntailResult<CheckOutcome> {
        self.engine.check()
    }
}
