//! Query pipeline
//!
//! Wires the full path from raw request to verdict: declaration
//! inference, evaluation, the solver session, and the verdict cache.
//! Two entry points exist. `prove` asks whether a conclusion follows
//! from premises by checking the premises plus the negated conclusion;
//! `solve` asks whether a constraint set is satisfiable at all.
//!
//! Error discipline: malformed declarations and invalid requests fail
//! the call with a typed error, while failures that arise from the
//! meaning of an individual statement are reported in-band on the
//! verdict. Neither path ever writes to the cache, and only definitive
//! verdicts are ever stored.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cache::{self, ProofCache};
use crate::error::{EntailError, EntailResult};
use crate::eval::Evaluator;
use crate::infer::{infer_declarations, HeuristicClassifier};
use crate::solver::term::{Term, Value};
use crate::solver::{CheckOutcome, SolverLimits};

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProveRequest {
    pub premises: Vec<String>,
    pub conclusion: String,
    /// Short name to canonical name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,
    /// Symbol name to declaration hint
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub type_hints: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolveRequest {
    pub constraints: Vec<String>,
    /// Explicit numeric variable declarations, name to sort
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub type_hints: BTreeMap<String, String>,
}

// ============================================================================
// Verdicts
// ============================================================================

/// Why a proof query came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProofReason {
    /// Premises plus negated conclusion are unsatisfiable
    Proved,
    /// A countermodel exists
    Refuted,
    /// The solver could not decide within its capability or budget
    Undecided,
    /// A statement failed to evaluate
    EvaluationError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofVerdict {
    pub proven: bool,
    pub reason: ProofReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterexample: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True when served from the cache
    #[serde(default)]
    pub cached: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatVerdict {
    /// None when the solver could not decide
    pub satisfiable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<BTreeMap<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub cached: bool,
}

impl ProofVerdict {
    fn evaluation_error(error: EntailError, warnings: Vec<String>) -> ProofVerdict {
        ProofVerdict {
            proven: false,
            reason: ProofReason::EvaluationError,
            counterexample: None,
            warnings,
            error: Some(error.to_string()),
            cached: false,
        }
    }

    /// Cacheable verdicts are the settled ones
    fn is_definitive(&self) -> bool {
        matches!(self.reason, ProofReason::Proved | ProofReason::Refuted)
    }
}

impl SatVerdict {
    fn evaluation_error(error: EntailError, warnings: Vec<String>) -> SatVerdict {
        SatVerdict { satisfiable: None, model: None, warnings, error: Some(error.to_string()), cached: false }
    }

    fn is_definitive(&self) -> bool {
        self.satisfiable.is_some() && self.error.is_none()
    }
}

// ============================================================================
// Engine
// ============================================================================

pub struct Engine {
    cache: Option<ProofCache>,
    limits: SolverLimits,
    classifier: HeuristicClassifier,
}

impl Engine {
    pub fn new(cache: Option<ProofCache>, limits: SolverLimits) -> Engine {
        Engine { cache, limits, classifier: HeuristicClassifier::default() }
    }

    pub fn with_default_arity(mut self, default_arity: usize) -> Engine {
        self.classifier.default_arity = default_arity;
        self
    }

    /// Number of cached verdicts, zero when caching is off
    pub fn cache_len(&self) -> usize {
        self.cache.as_ref().map(|c| c.len()).unwrap_or(0)
    }

    /// Decide whether `conclusion` follows from `premises`
    pub fn prove(&self, request: &ProveRequest) -> EntailResult<ProofVerdict> {
        if request.conclusion.trim().is_empty() {
            return Err(EntailError::empty_input("conclusion"));
        }

        // The identity hashes the statement text as written: premise order
        // is normalized by sorting, while aliases and hints stay out of the
        // key. A hit short-circuits the whole pipeline.
        let identity = cache::identity(&request.premises, Some(&request.conclusion));
        if let Some(cache) = &self.cache {
            if let Some(stored) = cache.lookup(&identity) {
                match serde_json::from_str::<ProofVerdict>(&stored) {
                    Ok(mut verdict) => {
                        verdict.cached = true;
                        return Ok(verdict);
                    }
                    Err(err) => eprintln!("warning: discarding corrupt cache entry: {}", err),
                }
            }
        }

        let mut statements: Vec<&str> = request.premises.iter().map(String::as_str).collect();
        statements.push(&request.conclusion);
        let inference =
            infer_declarations(&statements, &request.aliases, &request.type_hints, &self.classifier)?;
        let warnings = inference.warnings.clone();
        let evaluator = Evaluator::new(&inference.table);

        let mut premise_terms = Vec::with_capacity(request.premises.len());
        for premise in &request.premises {
            match evaluator.lower_statement(premise) {
                Ok(term) => premise_terms.push(term),
                Err(err) => return Ok(ProofVerdict::evaluation_error(err, warnings)),
            }
        }
        let conclusion_term = match evaluator.lower_statement(&request.conclusion) {
            Ok(term) => term,
            Err(err) => return Ok(ProofVerdict::evaluation_error(err, warnings)),
        };

        let mut session = evaluator.session(self.limits);
        let verdict = (|| -> EntailResult<ProofVerdict> {
            for term in premise_terms {
                session.assert(term)?;
            }
            session.assert(Term::not(conclusion_term))?;
            let outcome = session.check()?;
            Ok(match outcome {
                CheckOutcome::Unsat => ProofVerdict {
                    proven: true,
                    reason: ProofReason::Proved,
                    counterexample: None,
                    warnings: warnings.clone(),
                    error: None,
                    cached: false,
                },
                CheckOutcome::Sat(model) => ProofVerdict {
                    proven: false,
                    reason: ProofReason::Refuted,
                    counterexample: Some(model),
                    warnings: warnings.clone(),
                    error: None,
                    cached: false,
                },
                CheckOutcome::Unknown(reason) => {
                    let mut warnings = warnings.clone();
                    warnings.push(format!("undecided: {}", reason));
                    ProofVerdict {
                        proven: false,
                        reason: ProofReason::Undecided,
                        counterexample: None,
                        warnings,
                        error: None,
                        cached: false,
                    }
                }
            })
        })();

        let verdict = match verdict {
            Ok(verdict) => verdict,
            Err(err) => return Ok(ProofVerdict::evaluation_error(err, warnings)),
        };

        if verdict.is_definitive() {
            if let Some(cache) = &self.cache {
                let mut stored = verdict.clone();
                stored.warnings.clear();
                if let Ok(payload) = serde_json::to_string(&stored) {
                    cache.store(&identity, &payload);
                }
            }
        }
        Ok(verdict)
    }

    /// Decide whether a constraint set is satisfiable
    pub fn solve(&self, request: &SolveRequest) -> EntailResult<SatVerdict> {
        if request.constraints.is_empty() {
            return Err(EntailError::empty_input("constraints"));
        }

        let identity = cache::identity(&request.constraints, None);
        if let Some(cache) = &self.cache {
            if let Some(stored) = cache.lookup(&identity) {
                match serde_json::from_str::<SatVerdict>(&stored) {
                    Ok(mut verdict) => {
                        verdict.cached = true;
                        return Ok(verdict);
                    }
                    Err(err) => eprintln!("warning: discarding corrupt cache entry: {}", err),
                }
            }
        }

        // Explicit variable declarations are just hints with a dedicated field
        let mut hints = request.type_hints.clone();
        for (name, sort) in &request.variables {
            hints.entry(name.clone()).or_insert_with(|| sort.clone());
        }

        let inference = infer_declarations(&request.constraints, &request.aliases, &hints, &self.classifier)?;
        let warnings = inference.warnings.clone();
        let evaluator = Evaluator::new(&inference.table);

        let mut terms = Vec::with_capacity(request.constraints.len());
        for constraint in &request.constraints {
            match evaluator.lower_statement(constraint) {
                Ok(term) => terms.push(term),
                Err(err) => return Ok(SatVerdict::evaluation_error(err, warnings)),
            }
        }

        let mut session = evaluator.session(self.limits);
        let verdict = (|| -> EntailResult<SatVerdict> {
            for term in terms {
                session.assert(term)?;
            }
            let outcome = session.check()?;
            Ok(match outcome {
                CheckOutcome::Sat(model) => SatVerdict {
                    satisfiable: Some(true),
                    model: Some(model),
                    warnings: warnings.clone(),
                    error: None,
                    cached: false,
                },
                CheckOutcome::Unsat => SatVerdict {
                    satisfiable: Some(false),
                    model: None,
                    warnings: warnings.clone(),
                    error: None,
                    cached: false,
                },
                CheckOutcome::Unknown(reason) => {
                    let mut warnings = warnings.clone();
                    warnings.push(format!("undecided: {}", reason));
                    SatVerdict { satisfiable: None, model: None, warnings, error: None, cached: false }
                }
            })
        })();

        let verdict = match verdict {
            Ok(verdict) => verdict,
            Err(err) => return Ok(SatVerdict::evaluation_error(err, warnings)),
        };

        if verdict.is_definitive() {
            if let Some(cache) = &self.cache {
                let mut stored = verdict.clone();
                stored.warnings.clear();
                if let Ok(payload) = serde_json::to_string(&stored) {
                    cache.store(&identity, &payload);
                }
            }
        }
        Ok(verdict)
    }
}
