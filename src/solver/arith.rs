//! Numeric decision engine
//!
//! Handles arithmetic-mode queries over integer, real, and boolean
//! variables. The boolean structure runs through the propositional core;
//! each comparison becomes a named theory atom backed by a normalized
//! linear constraint. A DPLL(T)-style loop asks the SAT solver for a
//! candidate atom assignment, checks it with interval propagation, and
//! feeds conflict clauses back until the loop converges.
//!
//! Verdict discipline: Unsat is reported only when every boolean case was
//! refuted by a propagation-proven infeasibility, and Sat only with a
//! concrete model that has been re-verified against the chosen atoms.
//! Anything the engine cannot decide within its budget, and anything
//! nonlinear, comes back as Unknown rather than a guess.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Instant;

use indexmap::IndexMap;

use crate::error::{EntailError, EntailResult, ErrorCode};
use crate::solver::sat::{CnfBuilder, DpllSolver, Lit, Prop, SatResult};
use crate::solver::term::{Sort, Term, Value};
use crate::solver::{CheckOutcome, DecisionEngine, SolverLimits};

const MAX_THEORY_ROUNDS: usize = 200;
const MAX_PROPAGATION_PASSES: usize = 50;
const MODEL_CANDIDATES_PER_VAR: usize = 4;
const EPS: f64 = 1e-9;

// ============================================================================
// Linear constraints
// ============================================================================

/// A linear expression `Σ c_i · x_i + constant`
#[derive(Debug, Clone, Default)]
struct LinExpr {
    coeffs: BTreeMap<String, f64>,
    constant: f64,
}

impl LinExpr {
    fn constant(value: f64) -> LinExpr {
        LinExpr { coeffs: BTreeMap::new(), constant: value }
    }

    fn variable(name: &str) -> LinExpr {
        let mut coeffs = BTreeMap::new();
        coeffs.insert(name.to_string(), 1.0);
        LinExpr { coeffs, constant: 0.0 }
    }

    fn add(mut self, other: LinExpr) -> LinExpr {
        for (name, coeff) in other.coeffs {
            let entry = self.coeffs.entry(name).or_insert(0.0);
            *entry += coeff;
        }
        self.constant += other.constant;
        self.coeffs.retain(|_, c| *c != 0.0);
        self
    }

    fn scale(mut self, factor: f64) -> LinExpr {
        for coeff in self.coeffs.values_mut() {
            *coeff *= factor;
        }
        self.constant *= factor;
        self.coeffs.retain(|_, c| *c != 0.0);
        self
    }

    fn as_constant(&self) -> Option<f64> {
        if self.coeffs.is_empty() {
            Some(self.constant)
        } else {
            None
        }
    }
}

/// A normalized constraint `Σ c_i · x_i ≤ bound` (or `<` when strict)
#[derive(Debug, Clone, PartialEq)]
struct LinearAtom {
    coeffs: BTreeMap<String, f64>,
    bound: f64,
    strict: bool,
}

impl LinearAtom {
    /// From `expr ≤ 0` (strict: `expr < 0`)
    fn from_expr(expr: LinExpr, strict: bool) -> LinearAtom {
        LinearAtom { coeffs: expr.coeffs, bound: -expr.constant, strict }
    }

    /// The complement constraint, used when the SAT core assigns the atom false
    fn negated(&self) -> LinearAtom {
        LinearAtom {
            coeffs: self.coeffs.iter().map(|(n, c)| (n.clone(), -c)).collect(),
            bound: -self.bound,
            strict: !self.strict,
        }
    }

    fn key(&self) -> String {
        let mut key = String::new();
        for (name, coeff) in &self.coeffs {
            let _ = write!(key, "{:+}{}", coeff, name);
        }
        let _ = write!(key, "{}{}", if self.strict { "<" } else { "<=" }, self.bound);
        key
    }

    fn holds(&self, values: &BTreeMap<String, f64>) -> bool {
        let total: f64 = self
            .coeffs
            .iter()
            .map(|(name, coeff)| coeff * values.get(name).copied().unwrap_or(0.0))
            .sum();
        if self.strict {
            total < self.bound - EPS
        } else {
            total <= self.bound + EPS
        }
    }
}

// ============================================================================
// Intervals
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Interval {
    lo: f64,
    lo_strict: bool,
    hi: f64,
    hi_strict: bool,
}

impl Interval {
    fn unbounded() -> Interval {
        Interval { lo: f64::NEG_INFINITY, lo_strict: false, hi: f64::INFINITY, hi_strict: false }
    }

    fn point(value: f64) -> Interval {
        Interval { lo: value, lo_strict: false, hi: value, hi_strict: false }
    }

    fn is_empty(&self) -> bool {
        self.lo > self.hi || (self.lo == self.hi && (self.lo_strict || self.hi_strict))
    }

    /// Tighten the upper bound; returns true if anything changed
    fn tighten_hi(&mut self, bound: f64, strict: bool) -> bool {
        if bound < self.hi || (bound == self.hi && strict && !self.hi_strict) {
            self.hi = bound;
            self.hi_strict = strict;
            true
        } else {
            false
        }
    }

    fn tighten_lo(&mut self, bound: f64, strict: bool) -> bool {
        if bound > self.lo || (bound == self.lo && strict && !self.lo_strict) {
            self.lo = bound;
            self.lo_strict = strict;
            true
        } else {
            false
        }
    }

    /// Round the bounds inward to integers
    fn round_integral(&mut self) -> bool {
        let mut changed = false;
        if self.lo.is_finite() {
            let rounded = if self.lo_strict && self.lo.fract() == 0.0 { self.lo + 1.0 } else { self.lo.ceil() };
            if rounded > self.lo || self.lo_strict {
                self.lo = rounded;
                self.lo_strict = false;
                changed = true;
            }
        }
        if self.hi.is_finite() {
            let rounded = if self.hi_strict && self.hi.fract() == 0.0 { self.hi - 1.0 } else { self.hi.floor() };
            if rounded < self.hi || self.hi_strict {
                self.hi = rounded;
                self.hi_strict = false;
                changed = true;
            }
        }
        changed
    }
}

/// True when `value` lies inside `interval`, honoring strict bounds
fn admits(interval: Interval, value: f64) -> bool {
    let above_lo = if interval.lo_strict { value > interval.lo } else { value >= interval.lo };
    let below_hi = if interval.hi_strict { value < interval.hi } else { value <= interval.hi };
    above_lo && below_hi
}

// ============================================================================
// Engine
// ============================================================================

pub struct ArithEngine {
    /// Declared numeric variables in declaration order
    vars: IndexMap<String, Sort>,
    assertions: Vec<Term>,
    limits: SolverLimits,
}

impl ArithEngine {
    pub fn new(vars: IndexMap<String, Sort>, limits: SolverLimits) -> Self {
        ArithEngine { vars, assertions: Vec::new(), limits }
    }

    fn sort_of(&mut self, name: &str) -> Sort {
        if let Some(&sort) = self.vars.get(name) {
            return sort;
        }
        // Undeclared names default to integers
        self.vars.insert(name.to_string(), Sort::Int);
        Sort::Int
    }

    fn linearize(&mut self, term: &Term) -> EntailResult<LinExpr> {
        match term {
            Term::Int(n) => Ok(LinExpr::constant(*n as f64)),
            Term::Real(x) => Ok(LinExpr::constant(*x)),
            Term::Var(name) | Term::Const(name) => {
                match self.sort_of(name) {
                    Sort::Bool => Err(EntailError::new(
                        ErrorCode::SortMismatch,
                        format!("boolean variable '{}' used in arithmetic", name),
                    )),
                    _ => Ok(LinExpr::variable(name)),
                }
            }
            Term::Add(a, b) => Ok(self.linearize(a)?.add(self.linearize(b)?)),
            Term::Sub(a, b) => Ok(self.linearize(a)?.add(self.linearize(b)?.scale(-1.0))),
            Term::Neg(inner) => Ok(self.linearize(inner)?.scale(-1.0)),
            Term::Mul(a, b) => {
                let left = self.linearize(a)?;
                let right = self.linearize(b)?;
                match (left.as_constant(), right.as_constant()) {
                    (Some(k), _) => Ok(right.scale(k)),
                    (_, Some(k)) => Ok(left.scale(k)),
                    _ => Err(EntailError::new(
                        ErrorCode::UnsupportedFormula,
                        "nonlinear multiplication is not supported",
                    )),
                }
            }
            Term::Div(a, b) => {
                let left = self.linearize(a)?;
                let right = self.linearize(b)?;
                match right.as_constant() {
                    Some(k) if k != 0.0 => Ok(left.scale(1.0 / k)),
                    Some(_) => Err(EntailError::new(ErrorCode::UnsupportedFormula, "division by zero")),
                    None => Err(EntailError::new(
                        ErrorCode::UnsupportedFormula,
                        "division by a variable is not supported",
                    )),
                }
            }
            other => Err(EntailError::new(
                ErrorCode::SortMismatch,
                format!("'{}' is not a numeric expression", other),
            )),
        }
    }

    /// Comparison atom over `lhs - rhs`, with constant comparisons folded away
    fn comparison(
        &mut self,
        lhs: &Term,
        rhs: &Term,
        strict: bool,
        atoms: &mut IndexMap<String, LinearAtom>,
    ) -> EntailResult<Prop> {
        let diff = self.linearize(lhs)?.add(self.linearize(rhs)?.scale(-1.0));
        if let Some(value) = diff.as_constant() {
            let holds = if strict { value < 0.0 } else { value <= 0.0 };
            return Ok(if holds { Prop::True } else { Prop::False });
        }
        let atom = LinearAtom::from_expr(diff, strict);
        let key = atom.key();
        atoms.entry(key.clone()).or_insert(atom);
        Ok(Prop::Atom(key))
    }

    fn lower(&mut self, term: &Term, atoms: &mut IndexMap<String, LinearAtom>) -> EntailResult<Prop> {
        match term {
            Term::True => Ok(Prop::True),
            Term::False => Ok(Prop::False),
            Term::Var(name) | Term::Const(name) => match self.sort_of(name) {
                Sort::Bool => Ok(Prop::Atom(name.clone())),
                sort => Err(EntailError::new(
                    ErrorCode::SortMismatch,
                    format!("{} variable '{}' used as a statement", sort, name),
                )),
            },
            Term::Not(inner) => Ok(Prop::not(self.lower(inner, atoms)?)),
            Term::And(parts) => {
                let mut lowered = Vec::with_capacity(parts.len());
                for part in parts {
                    lowered.push(self.lower(part, atoms)?);
                }
                Ok(Prop::And(lowered))
            }
            Term::Or(parts) => {
                let mut lowered = Vec::with_capacity(parts.len());
                for part in parts {
                    lowered.push(self.lower(part, atoms)?);
                }
                Ok(Prop::Or(lowered))
            }
            Term::Implies(a, b) => Ok(Prop::implies(self.lower(a, atoms)?, self.lower(b, atoms)?)),
            Term::Lt(a, b) => self.comparison(a, b, true, atoms),
            Term::Le(a, b) => self.comparison(a, b, false, atoms),
            Term::Gt(a, b) => self.comparison(b, a, true, atoms),
            Term::Ge(a, b) => self.comparison(b, a, false, atoms),
            // Equality splits into a bound pair so negation stays linear
            Term::Eq(a, b) => Ok(Prop::And(vec![
                self.comparison(a, b, false, atoms)?,
                self.comparison(b, a, false, atoms)?,
            ])),
            Term::Ne(a, b) => Ok(Prop::Or(vec![
                self.comparison(a, b, true, atoms)?,
                self.comparison(b, a, true, atoms)?,
            ])),
            Term::ForAll(_, _) | Term::Exists(_, _) => Err(EntailError::new(
                ErrorCode::UnsupportedFormula,
                "quantifiers over numeric variables are not supported",
            )),
            Term::App(name, _) => Err(EntailError::new(
                ErrorCode::SortMismatch,
                format!("relation '{}' is not valid in a numeric query", name),
            )),
            other => Err(EntailError::new(
                ErrorCode::SortMismatch,
                format!("'{}' is not a boolean statement", other),
            )),
        }
    }

    /// Interval propagation to fixpoint. Returns None on a proven conflict.
    fn propagate(&self, constraints: &[LinearAtom], seed: &BTreeMap<String, Interval>) -> Option<BTreeMap<String, Interval>> {
        let mut intervals = seed.clone();
        for atom in constraints {
            for name in atom.coeffs.keys() {
                intervals.entry(name.clone()).or_insert_with(Interval::unbounded);
            }
        }

        for _ in 0..MAX_PROPAGATION_PASSES {
            let mut changed = false;
            for atom in constraints {
                for (target, &coeff) in &atom.coeffs {
                    // Lower-bound the rest of the sum from current intervals
                    let mut rest = 0.0;
                    let mut rest_strict = false;
                    let mut bounded = true;
                    for (name, &c) in &atom.coeffs {
                        if name == target {
                            continue;
                        }
                        let interval = intervals[name];
                        let (contribution, strict) = if c > 0.0 {
                            (c * interval.lo, interval.lo_strict)
                        } else {
                            (c * interval.hi, interval.hi_strict)
                        };
                        if !contribution.is_finite() {
                            bounded = false;
                            break;
                        }
                        rest += contribution;
                        rest_strict |= strict;
                    }
                    if !bounded {
                        continue;
                    }

                    let limit = (atom.bound - rest) / coeff;
                    let strict = atom.strict || rest_strict;
                    let interval = match intervals.get_mut(target) {
                        Some(interval) => interval,
                        None => continue,
                    };
                    if coeff > 0.0 {
                        changed |= interval.tighten_hi(limit, strict);
                    } else {
                        changed |= interval.tighten_lo(limit, strict);
                    }
                    if self.vars.get(target) == Some(&Sort::Int) || self.vars.get(target).is_none() {
                        changed |= interval.round_integral();
                    }
                    if interval.is_empty() {
                        return None;
                    }
                }
            }
            if !changed {
                break;
            }
        }
        Some(intervals)
    }

    /// Candidate values for one variable, sorted by its declared sort.
    /// Integer intervals step by whole units; real intervals pick interior
    /// points so a strict window narrower than a unit still yields one.
    fn candidates(&self, name: &str, interval: Interval) -> Vec<f64> {
        let real = self.vars.get(name) == Some(&Sort::Real);
        let mut candidates = Vec::with_capacity(MODEL_CANDIDATES_PER_VAR);
        if real && interval.lo.is_finite() && interval.hi.is_finite() {
            let width = interval.hi - interval.lo;
            candidates.push(interval.lo + width / 2.0);
            candidates.push(interval.lo + width / 4.0);
            if !interval.lo_strict {
                candidates.push(interval.lo);
            }
            if !interval.hi_strict {
                candidates.push(interval.hi);
            }
        } else if interval.lo.is_finite() {
            let offset = if real { 0.5 } else { 1.0 };
            let base = if interval.lo_strict { interval.lo + offset } else { interval.lo };
            for step in 0..MODEL_CANDIDATES_PER_VAR {
                candidates.push(base + step as f64);
            }
        } else if interval.hi.is_finite() {
            let offset = if real { 0.5 } else { 1.0 };
            let base = if interval.hi_strict { interval.hi - offset } else { interval.hi };
            for step in 0..MODEL_CANDIDATES_PER_VAR {
                candidates.push(base - step as f64);
            }
        } else {
            candidates.push(0.0);
        }
        candidates
    }

    /// Greedy search for a concrete assignment inside the propagated intervals
    fn find_model(&self, constraints: &[LinearAtom], intervals: &BTreeMap<String, Interval>) -> Option<BTreeMap<String, f64>> {
        let mut fixed: BTreeMap<String, Interval> = intervals.clone();
        let names: Vec<String> = intervals.keys().cloned().collect();

        for name in &names {
            let interval = fixed[name];
            let candidates = self.candidates(name, interval);

            let mut chosen = None;
            for candidate in candidates {
                if !admits(interval, candidate) {
                    continue;
                }
                let mut trial = fixed.clone();
                trial.insert(name.clone(), Interval::point(candidate));
                if let Some(next) = self.propagate(constraints, &trial) {
                    fixed = next;
                    fixed.insert(name.clone(), Interval::point(candidate));
                    chosen = Some(candidate);
                    break;
                }
            }
            chosen?;
        }

        let values: BTreeMap<String, f64> = fixed.iter().map(|(name, iv)| (name.clone(), iv.lo)).collect();
        if constraints.iter().all(|atom| atom.holds(&values)) {
            Some(values)
        } else {
            None
        }
    }
}

impl DecisionEngine for ArithEngine {
    fn assert(&mut self, term: Term) -> EntailResult<()> {
        self.assertions.push(term);
        Ok(())
    }

    fn check(&mut self) -> EntailResult<CheckOutcome> {
        let mut atoms: IndexMap<String, LinearAtom> = IndexMap::new();
        let mut props = Vec::with_capacity(self.assertions.len());
        let assertions = std::mem::take(&mut self.assertions);
        for assertion in &assertions {
            match self.lower(assertion, &mut atoms) {
                Ok(prop) => props.push(prop),
                Err(err) if err.code == ErrorCode::UnsupportedFormula => {
                    self.assertions = assertions;
                    return Ok(CheckOutcome::Unknown(err.message));
                }
                Err(err) => {
                    self.assertions = assertions;
                    return Err(err);
                }
            }
        }
        self.assertions = assertions;

        let mut builder = CnfBuilder::new();
        for prop in &props {
            builder.assert(prop);
        }
        // Touching every atom key keeps the var map complete even for atoms
        // that only appear under negations.
        let atom_vars: Vec<(String, usize)> = atoms
            .keys()
            .map(|key| (key.clone(), builder.atom_var(key)))
            .collect();
        let bool_vars: Vec<(String, usize)> = self
            .vars
            .iter()
            .filter(|(_, &sort)| sort == Sort::Bool)
            .map(|(name, _)| (name.clone(), builder.atom_var(name)))
            .collect();

        let (clauses, num_vars) = builder.into_clauses();
        let deadline = self.limits.timeout.map(|t| Instant::now() + t);
        let mut solver = DpllSolver::new(clauses, num_vars).with_budget(self.limits.max_decisions, deadline);

        for _ in 0..MAX_THEORY_ROUNDS {
            let model = match solver.solve() {
                SatResult::Unsat => return Ok(CheckOutcome::Unsat),
                SatResult::Unknown => {
                    return Ok(CheckOutcome::Unknown("decision budget exhausted".to_string()));
                }
                SatResult::Sat(model) => model,
            };

            // Collect the theory constraints this boolean case commits to
            let mut constraints = Vec::new();
            let mut committed: Vec<Lit> = Vec::new();
            for (key, var) in &atom_vars {
                match model.get(*var).copied().flatten() {
                    Some(true) => {
                        constraints.push(atoms[key].clone());
                        committed.push(Lit::pos(*var));
                    }
                    Some(false) => {
                        constraints.push(atoms[key].negated());
                        committed.push(Lit::neg(*var));
                    }
                    None => {}
                }
            }

            match self.propagate(&constraints, &BTreeMap::new()) {
                None => {
                    // Proven infeasible: refute this boolean case and retry
                    let conflict: Vec<Lit> = committed.iter().map(|lit| lit.negated()).collect();
                    if conflict.is_empty() {
                        return Ok(CheckOutcome::Unsat);
                    }
                    solver.add_clause(conflict);
                }
                Some(intervals) => {
                    let numeric = match self.find_model(&constraints, &intervals) {
                        Some(values) => values,
                        None => {
                            return Ok(CheckOutcome::Unknown(
                                "no concrete model found within budget".to_string(),
                            ));
                        }
                    };
                    let mut values: BTreeMap<String, Value> = BTreeMap::new();
                    for (name, &sort) in &self.vars {
                        match sort {
                            Sort::Int => {
                                let v = numeric.get(name).copied().unwrap_or(0.0);
                                values.insert(name.clone(), Value::Int(v as i64));
                            }
                            Sort::Real => {
                                let v = numeric.get(name).copied().unwrap_or(0.0);
                                values.insert(name.clone(), Value::Real(v));
                            }
                            Sort::Bool => {
                                let assigned = bool_vars
                                    .iter()
                                    .find(|(n, _)| n == name)
                                    .and_then(|(_, var)| model.get(*var).copied().flatten())
                                    .unwrap_or(false);
                                values.insert(name.clone(), Value::Bool(assigned));
                            }
                            Sort::Entity => {}
                        }
                    }
                    return Ok(CheckOutcome::Sat(values));
                }
            }
        }

        Ok(CheckOutcome::Unknown("theory loop budget exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BinOp;

    fn engine() -> ArithEngine {
        ArithEngine::new(IndexMap::new(), SolverLimits::default())
    }

    fn var(name: &str) -> Term {
        Term::Var(name.to_string())
    }

    fn cmp(op: BinOp, lhs: Term, rhs: Term) -> Term {
        let (lhs, rhs) = (Box::new(lhs), Box::new(rhs));
        match op {
            BinOp::Eq => Term::Eq(lhs, rhs),
            BinOp::Ne => Term::Ne(lhs, rhs),
            BinOp::Lt => Term::Lt(lhs, rhs),
            BinOp::Le => Term::Le(lhs, rhs),
            BinOp::Gt => Term::Gt(lhs, rhs),
            BinOp::Ge => Term::Ge(lhs, rhs),
            _ => panic!("not a comparison"),
        }
    }

    fn sum(a: Term, b: Term) -> Term {
        Term::Add(Box::new(a), Box::new(b))
    }

    #[test]
    fn finds_integer_model_for_sum_constraint() {
        let mut engine = engine();
        engine.assert(cmp(BinOp::Eq, sum(var("x"), var("y")), Term::Int(10))).unwrap();
        engine.assert(cmp(BinOp::Gt, var("x"), Term::Int(3))).unwrap();
        engine.assert(cmp(BinOp::Gt, var("y"), Term::Int(2))).unwrap();
        match engine.check().unwrap() {
            CheckOutcome::Sat(model) => {
                let x = match model.get("x") {
                    Some(Value::Int(v)) => *v,
                    other => panic!("expected int for x, got {:?}", other),
                };
                let y = match model.get("y") {
                    Some(Value::Int(v)) => *v,
                    other => panic!("expected int for y, got {:?}", other),
                };
                assert_eq!(x + y, 10);
                assert!(x > 3);
                assert!(y > 2);
            }
            other => panic!("expected sat, got {:?}", other),
        }
    }

    #[test]
    fn refutes_conditional_contradiction() {
        // Implies(x > 0, y > 0), x == 5, y < 0
        let mut engine = engine();
        engine
            .assert(Term::Implies(
                Box::new(cmp(BinOp::Gt, var("x"), Term::Int(0))),
                Box::new(cmp(BinOp::Gt, var("y"), Term::Int(0))),
            ))
            .unwrap();
        engine.assert(cmp(BinOp::Eq, var("x"), Term::Int(5))).unwrap();
        engine.assert(cmp(BinOp::Lt, var("y"), Term::Int(0))).unwrap();
        assert_eq!(engine.check().unwrap(), CheckOutcome::Unsat);
    }

    #[test]
    fn detects_direct_bound_conflict() {
        let mut engine = engine();
        engine.assert(cmp(BinOp::Gt, var("x"), Term::Int(5))).unwrap();
        engine.assert(cmp(BinOp::Lt, var("x"), Term::Int(3))).unwrap();
        assert_eq!(engine.check().unwrap(), CheckOutcome::Unsat);
    }

    #[test]
    fn strict_integer_window_is_empty() {
        // 3 < x < 4 has no integer solution
        let mut engine = engine();
        engine.assert(cmp(BinOp::Gt, var("x"), Term::Int(3))).unwrap();
        engine.assert(cmp(BinOp::Lt, var("x"), Term::Int(4))).unwrap();
        assert_eq!(engine.check().unwrap(), CheckOutcome::Unsat);
    }

    #[test]
    fn real_variable_fits_strict_window() {
        let mut vars = IndexMap::new();
        vars.insert("x".to_string(), Sort::Real);
        let mut engine = ArithEngine::new(vars, SolverLimits::default());
        engine.assert(cmp(BinOp::Gt, var("x"), Term::Int(3))).unwrap();
        engine.assert(cmp(BinOp::Lt, var("x"), Term::Int(4))).unwrap();
        match engine.check().unwrap() {
            CheckOutcome::Sat(model) => match model.get("x") {
                Some(Value::Real(v)) => assert!(*v > 3.0 && *v < 4.0),
                other => panic!("expected real for x, got {:?}", other),
            },
            other => panic!("expected sat, got {:?}", other),
        }
    }

    #[test]
    fn real_sub_unit_window_yields_interior_point() {
        let mut vars = IndexMap::new();
        vars.insert("x".to_string(), Sort::Real);
        let mut engine = ArithEngine::new(vars, SolverLimits::default());
        engine.assert(cmp(BinOp::Gt, var("x"), Term::Int(0))).unwrap();
        engine.assert(cmp(BinOp::Lt, var("x"), Term::Int(1))).unwrap();
        match engine.check().unwrap() {
            CheckOutcome::Sat(model) => match model.get("x") {
                Some(Value::Real(v)) => assert!(*v > 0.0 && *v < 1.0),
                other => panic!("expected real for x, got {:?}", other),
            },
            other => panic!("expected sat, got {:?}", other),
        }
    }

    #[test]
    fn disequality_splits_into_cases() {
        let mut engine = engine();
        engine.assert(cmp(BinOp::Ge, var("x"), Term::Int(0))).unwrap();
        engine.assert(cmp(BinOp::Le, var("x"), Term::Int(1))).unwrap();
        engine.assert(cmp(BinOp::Ne, var("x"), Term::Int(0))).unwrap();
        match engine.check().unwrap() {
            CheckOutcome::Sat(model) => assert_eq!(model.get("x"), Some(&Value::Int(1))),
            other => panic!("expected sat, got {:?}", other),
        }
    }

    #[test]
    fn nonlinear_terms_report_unknown() {
        let mut engine = engine();
        engine.assert(cmp(BinOp::Eq, Term::Mul(Box::new(var("x")), Box::new(var("y"))), Term::Int(6))).unwrap();
        match engine.check().unwrap() {
            CheckOutcome::Unknown(reason) => assert!(reason.contains("nonlinear")),
            other => panic!("expected unknown, got {:?}", other),
        }
    }

    #[test]
    fn division_by_constant_stays_linear() {
        // x / 2 >= 3 and x <= 6 forces x == 6
        let mut engine = engine();
        engine.assert(cmp(BinOp::Ge, Term::Div(Box::new(var("x")), Box::new(Term::Int(2))), Term::Int(3))).unwrap();
        engine.assert(cmp(BinOp::Le, var("x"), Term::Int(6))).unwrap();
        match engine.check().unwrap() {
            CheckOutcome::Sat(model) => assert_eq!(model.get("x"), Some(&Value::Int(6))),
            other => panic!("expected sat, got {:?}", other),
        }
    }

    #[test]
    fn boolean_variables_participate_in_structure() {
        let mut vars = IndexMap::new();
        vars.insert("p".to_string(), Sort::Bool);
        let mut engine = ArithEngine::new(vars, SolverLimits::default());
        engine
            .assert(Term::Implies(Box::new(var("p")), Box::new(cmp(BinOp::Gt, var("x"), Term::Int(0)))))
            .unwrap();
        engine.assert(var("p")).unwrap();
        match engine.check().unwrap() {
            CheckOutcome::Sat(model) => {
                assert_eq!(model.get("p"), Some(&Value::Bool(true)));
                match model.get("x") {
                    Some(Value::Int(v)) => assert!(*v > 0),
                    other => panic!("expected int for x, got {:?}", other),
                }
            }
            other => panic!("expected sat, got {:?}", other),
        }
    }

    #[test]
    fn constant_comparison_folds_away() {
        let mut engine = engine();
        engine.assert(cmp(BinOp::Lt, Term::Int(2), Term::Int(1))).unwrap();
        assert_eq!(engine.check().unwrap(), CheckOutcome::Unsat);
    }

    #[test]
    fn relation_in_numeric_query_is_sort_error() {
        let mut engine = engine();
        engine.assert(Term::App("Human".to_string(), vec![Term::Const("s".to_string())])).unwrap();
        let err = engine.check().unwrap_err();
        assert_eq!(err.code, ErrorCode::SortMismatch);
    }
}
