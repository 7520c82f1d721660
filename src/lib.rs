//! Entail - logic entailment and satisfiability frontend
//!
//! A query engine that takes statements as plain text, infers declarations
//! for every free name, and decides entailment and satisfiability with
//! built-in decision procedures behind a pluggable solver boundary.
//!
//! # Architecture
//!
//! A query flows through a fixed pipeline:
//!
//! - [`scan`] - Identifier scanning and arity observation over raw text
//! - [`infer`] - Declaration inference (aliases, hints, classification)
//! - [`expr`] - Statement grammar: calls, quantifiers, infix arithmetic
//! - [`eval`] - Lowering to solver terms, mode selection, sort checks
//! - [`solver`] - Decision engines behind the [`solver::DecisionEngine`] trait
//! - [`cache`] - Durable verdict cache keyed by canonical query identity
//! - [`query`] - The engine tying the pipeline together
//! - [`server`] - Async HTTP surface over the engine
//!
//! # Example
//!
//! ```rust,ignore
//! use entail::query::{Engine, ProveRequest};
//! use entail::solver::SolverLimits;
//!
//! let engine = Engine::new(None, SolverLimits::default());
//! let verdict = engine.prove(&ProveRequest {
//!     premises: vec!["H(s)".into(), "Implies(H(s), M(s))".into()],
//!     conclusion: "M(s)".into(),
//!     ..ProveRequest::default()
//! })?;
//! assert!(verdict.proven);
//! # Ok::<(), entail::EntailError>(())
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod eval;
pub mod expr;
pub mod infer;
pub mod query;
pub mod scan;
pub mod server;
pub mod solver;

// Re-export the engine and wire types
pub use query::{Engine, ProofReason, ProofVerdict, ProveRequest, SatVerdict, SolveRequest};

// Re-export inference types
pub use infer::{Classify, HeuristicClassifier, NumericType, Symbol, SymbolKind, SymbolTable, TypeHint};

// Re-export solver surface
pub use solver::{CheckOutcome, DecisionEngine, Session, SolverLimits};

// Re-export the cache
pub use cache::{identity, ProofCache};

// Re-export async server types
pub use server::{create_router, run_server, AppState, ServerConfig};

// Re-export configuration types
pub use config::{CacheConfig, EntailConfig, ServerConfig as ServerSettings, SolverConfig};

// Re-export error types
pub use error::{EntailError, EntailResult, ErrorCode, ErrorContext, ErrorResponse};
