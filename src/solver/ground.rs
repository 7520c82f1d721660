//! Typed-individuals decision engine
//!
//! Handles predicate-mode queries by grounding quantifiers over the
//! declared individuals, Tseitin-encoding the resulting propositional
//! formula, and running DPLL. With every domain element named up front
//! the grounding is exact, so Sat and Unsat verdicts are both sound;
//! Unknown arises only from the decision budget or a grounding that
//! would exceed the size guard.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Instant;

use fnv::FnvHashMap;

use crate::error::{EntailError, EntailResult, ErrorCode};
use crate::solver::sat::{CnfBuilder, DpllSolver, Prop, SatResult};
use crate::solver::term::{Term, Value};
use crate::solver::{CheckOutcome, DecisionEngine, SolverLimits};

/// Upper bound on ground instances produced per quantifier
const MAX_GROUND_INSTANCES: usize = 100_000;

pub struct GroundEngine {
    individuals: Vec<String>,
    assertions: Vec<Term>,
    limits: SolverLimits,
}

impl GroundEngine {
    pub fn new(individuals: Vec<String>, limits: SolverLimits) -> Self {
        GroundEngine { individuals, assertions: Vec::new(), limits }
    }

    /// Domain for quantifier expansion; a single anonymous element keeps
    /// quantified statements meaningful when no individual was declared.
    fn domain(&self) -> Vec<String> {
        if self.individuals.is_empty() {
            vec!["e0".to_string()]
        } else {
            self.individuals.clone()
        }
    }

    fn ground(&self, term: &Term, env: &mut FnvHashMap<String, String>) -> EntailResult<Prop> {
        match term {
            Term::True => Ok(Prop::True),
            Term::False => Ok(Prop::False),
            Term::App(name, args) => {
                let mut key = String::new();
                key.push_str(name);
                if !args.is_empty() {
                    key.push('(');
                    for (i, arg) in args.iter().enumerate() {
                        if i > 0 {
                            key.push(',');
                        }
                        let _ = write!(key, "{}", self.resolve_entity(arg, env)?);
                    }
                    key.push(')');
                }
                Ok(Prop::Atom(key))
            }
            Term::Not(inner) => Ok(Prop::not(self.ground(inner, env)?)),
            Term::And(parts) => {
                let mut grounded = Vec::with_capacity(parts.len());
                for part in parts {
                    grounded.push(self.ground(part, env)?);
                }
                Ok(Prop::And(grounded))
            }
            Term::Or(parts) => {
                let mut grounded = Vec::with_capacity(parts.len());
                for part in parts {
                    grounded.push(self.ground(part, env)?);
                }
                Ok(Prop::Or(grounded))
            }
            Term::Implies(a, b) => Ok(Prop::implies(self.ground(a, env)?, self.ground(b, env)?)),
            Term::ForAll(vars, body) => {
                let instances = self.instantiate(vars, body, env)?;
                Ok(Prop::And(instances))
            }
            Term::Exists(vars, body) => {
                let instances = self.instantiate(vars, body, env)?;
                Ok(Prop::Or(instances))
            }
            Term::Eq(a, b) => {
                let left = self.resolve_entity(a, env)?;
                let right = self.resolve_entity(b, env)?;
                if left == right {
                    Ok(Prop::True)
                } else {
                    Ok(Prop::Atom(equality_key(&left, &right)))
                }
            }
            Term::Ne(a, b) => {
                let left = self.resolve_entity(a, env)?;
                let right = self.resolve_entity(b, env)?;
                if left == right {
                    Ok(Prop::False)
                } else {
                    Ok(Prop::not(Prop::Atom(equality_key(&left, &right))))
                }
            }
            other => Err(EntailError::new(
                ErrorCode::SortMismatch,
                format!("arithmetic term '{}' is not valid in a typed-individuals query", other),
            )),
        }
    }

    /// Expand a quantifier body over every tuple drawn from the domain
    fn instantiate(
        &self,
        vars: &[String],
        body: &Term,
        env: &mut FnvHashMap<String, String>,
    ) -> EntailResult<Vec<Prop>> {
        let domain = self.domain();
        let count = domain.len().checked_pow(vars.len() as u32).unwrap_or(usize::MAX);
        if count > MAX_GROUND_INSTANCES {
            return Err(EntailError::new(
                ErrorCode::UnsupportedFormula,
                format!("grounding {} variables over {} individuals is too large", vars.len(), domain.len()),
            ));
        }

        let mut out = Vec::with_capacity(count);
        let mut indices = vec![0usize; vars.len()];
        loop {
            for (var, &index) in vars.iter().zip(indices.iter()) {
                env.insert(var.clone(), domain[index].clone());
            }
            out.push(self.ground(body, env)?);

            // Advance the tuple like an odometer
            let mut position = vars.len();
            loop {
                if position == 0 {
                    for var in vars {
                        env.remove(var);
                    }
                    return Ok(out);
                }
                position -= 1;
                indices[position] += 1;
                if indices[position] < domain.len() {
                    break;
                }
                indices[position] = 0;
            }
        }
    }

    fn resolve_entity(&self, term: &Term, env: &FnvHashMap<String, String>) -> EntailResult<String> {
        match term {
            Term::Const(name) => Ok(name.clone()),
            Term::Var(name) => match env.get(name) {
                Some(entity) => Ok(entity.clone()),
                None => Err(EntailError::unbound(name)),
            },
            other => Err(EntailError::new(
                ErrorCode::SortMismatch,
                format!("expected an entity, found '{}'", other),
            )),
        }
    }
}

/// Order-insensitive key for entity equality atoms
fn equality_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}=={}", a, b)
    } else {
        format!("{}=={}", b, a)
    }
}

impl DecisionEngine for GroundEngine {
    fn assert(&mut self, term: Term) -> EntailResult<()> {
        if !term.is_formula() {
            return Err(EntailError::new(
                ErrorCode::SortMismatch,
                format!("'{}' is not a boolean statement", term),
            ));
        }
        self.assertions.push(term);
        Ok(())
    }

    fn check(&mut self) -> EntailResult<CheckOutcome> {
        let mut builder = CnfBuilder::new();
        let mut env = FnvHashMap::default();
        for assertion in &self.assertions {
            // Running out of grounding room is a capability limit, not a
            // malformed query; report it as an undecided outcome.
            let prop = match self.ground(assertion, &mut env) {
                Ok(prop) => prop,
                Err(err) if err.code == ErrorCode::UnsupportedFormula => {
                    return Ok(CheckOutcome::Unknown(err.message));
                }
                Err(err) => return Err(err),
            };
            builder.assert(&prop);
        }

        let atoms: Vec<(String, usize)> =
            builder.atom_keys().map(|(key, var)| (key.to_string(), var)).collect();
        let (clauses, num_vars) = builder.into_clauses();

        let deadline = self.limits.timeout.map(|t| Instant::now() + t);
        let mut solver = DpllSolver::new(clauses, num_vars).with_budget(self.limits.max_decisions, deadline);

        match solver.solve() {
            SatResult::Unsat => Ok(CheckOutcome::Unsat),
            SatResult::Unknown => Ok(CheckOutcome::Unknown("decision budget exhausted".to_string())),
            SatResult::Sat(model) => {
                let mut values = BTreeMap::new();
                for (key, var) in atoms {
                    values.insert(key, Value::Bool(model[var].unwrap_or(false)));
                }
                for name in &self.individuals {
                    values.insert(name.clone(), Value::Entity(name.clone()));
                }
                Ok(CheckOutcome::Sat(values))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(individuals: &[&str]) -> GroundEngine {
        GroundEngine::new(individuals.iter().map(|s| s.to_string()).collect(), SolverLimits::default())
    }

    fn app(name: &str, args: &[&str]) -> Term {
        Term::App(name.to_string(), args.iter().map(|a| Term::Const(a.to_string())).collect())
    }

    #[test]
    fn modus_ponens_is_unsat_with_negated_conclusion() {
        let mut engine = engine(&["socrates"]);
        engine.assert(app("Human", &["socrates"])).unwrap();
        engine
            .assert(Term::Implies(
                Box::new(app("Human", &["socrates"])),
                Box::new(app("Mortal", &["socrates"])),
            ))
            .unwrap();
        engine.assert(Term::not(app("Mortal", &["socrates"]))).unwrap();
        assert_eq!(engine.check().unwrap(), CheckOutcome::Unsat);
    }

    #[test]
    fn satisfiable_premises_yield_model() {
        let mut engine = engine(&["socrates"]);
        engine.assert(app("Human", &["socrates"])).unwrap();
        engine
            .assert(Term::Implies(
                Box::new(app("Human", &["socrates"])),
                Box::new(app("Mortal", &["socrates"])),
            ))
            .unwrap();
        match engine.check().unwrap() {
            CheckOutcome::Sat(model) => {
                assert_eq!(model.get("Human(socrates)"), Some(&Value::Bool(true)));
                assert_eq!(model.get("Mortal(socrates)"), Some(&Value::Bool(true)));
                assert_eq!(model.get("socrates"), Some(&Value::Entity("socrates".to_string())));
            }
            other => panic!("expected sat, got {:?}", other),
        }
    }

    #[test]
    fn universal_rule_applies_to_every_individual() {
        let mut engine = engine(&["socrates", "plato"]);
        engine
            .assert(Term::ForAll(
                vec!["x".to_string()],
                Box::new(Term::Implies(
                    Box::new(Term::App("Human".to_string(), vec![Term::Var("x".to_string())])),
                    Box::new(Term::App("Mortal".to_string(), vec![Term::Var("x".to_string())])),
                )),
            ))
            .unwrap();
        engine.assert(app("Human", &["plato"])).unwrap();
        engine.assert(Term::not(app("Mortal", &["plato"]))).unwrap();
        assert_eq!(engine.check().unwrap(), CheckOutcome::Unsat);
    }

    #[test]
    fn existential_over_empty_declared_domain_uses_anonymous_element() {
        let mut engine = engine(&[]);
        engine
            .assert(Term::Exists(
                vec!["x".to_string()],
                Box::new(Term::App("P".to_string(), vec![Term::Var("x".to_string())])),
            ))
            .unwrap();
        assert!(matches!(engine.check().unwrap(), CheckOutcome::Sat(_)));
    }

    #[test]
    fn oversized_grounding_reports_unknown() {
        let mut engine = engine(&["a", "b"]);
        let vars: Vec<String> = (0..17).map(|i| format!("v{}", i)).collect();
        let body = Term::App("R".to_string(), vec![Term::Var("v0".to_string())]);
        engine.assert(Term::ForAll(vars, Box::new(body))).unwrap();
        match engine.check().unwrap() {
            CheckOutcome::Unknown(reason) => assert!(reason.contains("too large")),
            other => panic!("expected unknown, got {:?}", other),
        }
    }

    #[test]
    fn identical_constants_are_equal() {
        let mut engine = engine(&["a"]);
        engine
            .assert(Term::Ne(Box::new(Term::Const("a".to_string())), Box::new(Term::Const("a".to_string()))))
            .unwrap();
        assert_eq!(engine.check().unwrap(), CheckOutcome::Unsat);
    }

    #[test]
    fn distinct_constants_may_be_equal_or_not() {
        // Without unique-name semantics, a == b alone is satisfiable
        let mut engine = engine(&["a", "b"]);
        engine
            .assert(Term::Eq(Box::new(Term::Const("a".to_string())), Box::new(Term::Const("b".to_string()))))
            .unwrap();
        assert!(matches!(engine.check().unwrap(), CheckOutcome::Sat(_)));
    }

    #[test]
    fn arithmetic_is_rejected() {
        let mut engine = engine(&["a"]);
        engine
            .assert(Term::Eq(
                Box::new(Term::Add(Box::new(Term::Var("x".to_string())), Box::new(Term::Int(1)))),
                Box::new(Term::Int(2)),
            ))
            .unwrap();
        let err = engine.check().unwrap_err();
        assert_eq!(err.code, ErrorCode::SortMismatch);
    }

    #[test]
    fn unbound_variable_is_reported() {
        let mut engine = engine(&["a"]);
        engine.assert(Term::App("P".to_string(), vec![Term::Var("x".to_string())])).unwrap();
        let err = engine.check().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnboundName);
    }
}
