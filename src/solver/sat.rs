//! Propositional core
//!
//! A DPLL satisfiability solver over clause sets, plus a Tseitin encoder
//! that turns arbitrary propositional structure into CNF. Both decision
//! engines lower their statements to [`Prop`] formulas over named atoms and
//! hand the clauses to [`DpllSolver`].
//!
//! The solver is budgeted: it counts branching decisions and checks an
//! optional wall-clock deadline, returning [`SatResult::Unknown`] rather
//! than running unbounded.

use std::time::Instant;

use fnv::FnvHashMap;
use indexmap::IndexMap;

/// Propositional variable index
pub type Var = usize;

/// A literal: a variable with a polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lit {
    pub var: Var,
    pub positive: bool,
}

impl Lit {
    pub fn pos(var: Var) -> Lit {
        Lit { var, positive: true }
    }

    pub fn neg(var: Var) -> Lit {
        Lit { var, positive: false }
    }

    pub fn negated(self) -> Lit {
        Lit { var: self.var, positive: !self.positive }
    }
}

pub type Clause = Vec<Lit>;

/// Outcome of a propositional check
#[derive(Debug, Clone, PartialEq)]
pub enum SatResult {
    /// Satisfying assignment, indexed by variable
    Sat(Vec<Option<bool>>),
    Unsat,
    /// Budget exhausted before a verdict
    Unknown,
}

// ============================================================================
// Formula structure
// ============================================================================

/// A propositional formula over named atoms
#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
    True,
    False,
    Atom(String),
    Not(Box<Prop>),
    And(Vec<Prop>),
    Or(Vec<Prop>),
    Implies(Box<Prop>, Box<Prop>),
}

impl Prop {
    pub fn not(inner: Prop) -> Prop {
        Prop::Not(Box::new(inner))
    }

    pub fn implies(a: Prop, b: Prop) -> Prop {
        Prop::Implies(Box::new(a), Box::new(b))
    }
}

/// Tseitin encoder mapping named atoms to variables
#[derive(Debug, Default)]
pub struct CnfBuilder {
    atoms: IndexMap<String, Var>,
    next_var: Var,
    clauses: Vec<Clause>,
}

impl CnfBuilder {
    pub fn new() -> Self {
        CnfBuilder::default()
    }

    /// Variable for a named atom, allocating on first use
    pub fn atom_var(&mut self, key: &str) -> Var {
        if let Some(&var) = self.atoms.get(key) {
            return var;
        }
        let var = self.fresh();
        self.atoms.insert(key.to_string(), var);
        var
    }

    fn fresh(&mut self) -> Var {
        let var = self.next_var;
        self.next_var += 1;
        var
    }

    pub fn num_vars(&self) -> usize {
        self.next_var
    }

    /// Atom keys in allocation order, for reading models back out
    pub fn atom_keys(&self) -> impl Iterator<Item = (&str, Var)> {
        self.atoms.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn add_clause(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    /// Assert a formula at the top level
    pub fn assert(&mut self, prop: &Prop) {
        let lit = self.encode(prop);
        self.clauses.push(vec![lit]);
    }

    /// Tseitin encoding: returns a literal equisatisfiable with `prop`
    fn encode(&mut self, prop: &Prop) -> Lit {
        match prop {
            Prop::True => {
                let var = self.fresh();
                self.clauses.push(vec![Lit::pos(var)]);
                Lit::pos(var)
            }
            Prop::False => {
                let var = self.fresh();
                self.clauses.push(vec![Lit::neg(var)]);
                Lit::pos(var)
            }
            Prop::Atom(key) => Lit::pos(self.atom_var(key)),
            Prop::Not(inner) => self.encode(inner).negated(),
            Prop::And(parts) => {
                let lits: Vec<Lit> = parts.iter().map(|p| self.encode(p)).collect();
                let out = Lit::pos(self.fresh());
                // out -> each part; all parts -> out
                for &lit in &lits {
                    self.clauses.push(vec![out.negated(), lit]);
                }
                let mut long: Clause = lits.iter().map(|l| l.negated()).collect();
                long.push(out);
                self.clauses.push(long);
                out
            }
            Prop::Or(parts) => {
                let lits: Vec<Lit> = parts.iter().map(|p| self.encode(p)).collect();
                let out = Lit::pos(self.fresh());
                // each part -> out; out -> some part
                for &lit in &lits {
                    self.clauses.push(vec![lit.negated(), out]);
                }
                let mut long: Clause = lits.clone();
                long.push(out.negated());
                self.clauses.push(long);
                out
            }
            Prop::Implies(a, b) => {
                let or = Prop::Or(vec![Prop::not((**a).clone()), (**b).clone()]);
                self.encode(&or)
            }
        }
    }

    pub fn into_clauses(self) -> (Vec<Clause>, usize) {
        (self.clauses, self.next_var)
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
}

// ============================================================================
// DPLL
// ============================================================================

/// Budgeted DPLL solver
pub struct DpllSolver {
    clauses: Vec<Clause>,
    num_vars: usize,
    max_decisions: u64,
    deadline: Option<Instant>,
    decisions: u64,
}

impl DpllSolver {
    pub fn new(clauses: Vec<Clause>, num_vars: usize) -> Self {
        DpllSolver {
            clauses,
            num_vars,
            max_decisions: u64::MAX,
            deadline: None,
            decisions: 0,
        }
    }

    pub fn with_budget(mut self, max_decisions: u64, deadline: Option<Instant>) -> Self {
        self.max_decisions = max_decisions;
        self.deadline = deadline;
        self
    }

    pub fn add_clause(&mut self, clause: Clause) {
        for lit in &clause {
            if lit.var >= self.num_vars {
                self.num_vars = lit.var + 1;
            }
        }
        self.clauses.push(clause);
    }

    pub fn solve(&mut self) -> SatResult {
        let mut assignment: Vec<Option<bool>> = vec![None; self.num_vars];
        self.decisions = 0;
        self.dpll(&mut assignment)
    }

    fn out_of_budget(&self) -> bool {
        if self.decisions > self.max_decisions {
            return true;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return true;
            }
        }
        false
    }

    fn dpll(&mut self, assignment: &mut Vec<Option<bool>>) -> SatResult {
        if self.out_of_budget() {
            return SatResult::Unknown;
        }

        // Unit propagation to fixpoint
        loop {
            let mut propagated = false;
            for clause in &self.clauses {
                match clause_status(clause, assignment) {
                    ClauseStatus::Satisfied => continue,
                    ClauseStatus::Conflict => return SatResult::Unsat,
                    ClauseStatus::Unit(lit) => {
                        assignment[lit.var] = Some(lit.positive);
                        propagated = true;
                    }
                    ClauseStatus::Open => continue,
                }
            }
            if !propagated {
                break;
            }
        }

        // Pure literal elimination
        let mut polarity: FnvHashMap<Var, (bool, bool)> = FnvHashMap::default();
        for clause in &self.clauses {
            if clause_status(clause, assignment) == ClauseStatus::Satisfied {
                continue;
            }
            for lit in clause {
                if assignment[lit.var].is_none() {
                    let entry = polarity.entry(lit.var).or_insert((false, false));
                    if lit.positive {
                        entry.0 = true;
                    } else {
                        entry.1 = true;
                    }
                }
            }
        }
        let mut assigned_pure = false;
        for (&var, &(pos, neg)) in &polarity {
            if pos != neg {
                assignment[var] = Some(pos);
                assigned_pure = true;
            }
        }
        if assigned_pure {
            return self.dpll(assignment);
        }

        // All clauses satisfied?
        let branch_var = match self.pick_branch_var(assignment) {
            Some(var) => var,
            None => {
                for clause in &self.clauses {
                    if clause_status(clause, assignment) == ClauseStatus::Conflict {
                        return SatResult::Unsat;
                    }
                }
                return SatResult::Sat(assignment.clone());
            }
        };

        self.decisions += 1;

        for &value in &[true, false] {
            let mut trial = assignment.clone();
            trial[branch_var] = Some(value);
            match self.dpll(&mut trial) {
                SatResult::Sat(model) => return SatResult::Sat(model),
                SatResult::Unknown => return SatResult::Unknown,
                SatResult::Unsat => continue,
            }
        }
        SatResult::Unsat
    }

    /// Most frequent unassigned variable among open clauses
    fn pick_branch_var(&self, assignment: &[Option<bool>]) -> Option<Var> {
        let mut counts: FnvHashMap<Var, usize> = FnvHashMap::default();
        for clause in &self.clauses {
            if clause_status(clause, assignment) == ClauseStatus::Satisfied {
                continue;
            }
            for lit in clause {
                if assignment[lit.var].is_none() {
                    *counts.entry(lit.var).or_insert(0) += 1;
                }
            }
        }
        counts.into_iter().max_by_key(|&(var, count)| (count, usize::MAX - var)).map(|(var, _)| var)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClauseStatus {
    Satisfied,
    Conflict,
    Unit(Lit),
    Open,
}

fn clause_status(clause: &[Lit], assignment: &[Option<bool>]) -> ClauseStatus {
    let mut unassigned: Option<Lit> = None;
    let mut open = 0;
    for &lit in clause {
        match assignment[lit.var] {
            Some(value) if value == lit.positive => return ClauseStatus::Satisfied,
            Some(_) => continue,
            None => {
                open += 1;
                unassigned = Some(lit);
            }
        }
    }
    match (open, unassigned) {
        (0, _) => ClauseStatus::Conflict,
        (1, Some(lit)) => ClauseStatus::Unit(lit),
        _ => ClauseStatus::Open,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn solves_trivial_sat() {
        let mut solver = DpllSolver::new(vec![vec![Lit::pos(0)], vec![Lit::pos(1), Lit::neg(0)]], 2);
        match solver.solve() {
            SatResult::Sat(model) => {
                assert_eq!(model[0], Some(true));
                assert_eq!(model[1], Some(true));
            }
            other => panic!("expected sat, got {:?}", other),
        }
    }

    #[test]
    fn detects_direct_contradiction() {
        let mut solver = DpllSolver::new(vec![vec![Lit::pos(0)], vec![Lit::neg(0)]], 1);
        assert_eq!(solver.solve(), SatResult::Unsat);
    }

    #[test]
    fn detects_unsat_after_branching() {
        // (a | b) & (a | !b) & (!a | b) & (!a | !b)
        let clauses = vec![
            vec![Lit::pos(0), Lit::pos(1)],
            vec![Lit::pos(0), Lit::neg(1)],
            vec![Lit::neg(0), Lit::pos(1)],
            vec![Lit::neg(0), Lit::neg(1)],
        ];
        let mut solver = DpllSolver::new(clauses, 2);
        assert_eq!(solver.solve(), SatResult::Unsat);
    }

    #[test]
    fn tseitin_implication_unsat_with_negated_conclusion() {
        // H, H -> M, !M is unsatisfiable
        let mut builder = CnfBuilder::new();
        builder.assert(&Prop::Atom("H".into()));
        builder.assert(&Prop::implies(Prop::Atom("H".into()), Prop::Atom("M".into())));
        builder.assert(&Prop::not(Prop::Atom("M".into())));
        let (clauses, num_vars) = builder.into_clauses();
        let mut solver = DpllSolver::new(clauses, num_vars);
        assert_eq!(solver.solve(), SatResult::Unsat);
    }

    #[test]
    fn tseitin_satisfiable_formula_yields_model() {
        let mut builder = CnfBuilder::new();
        builder.assert(&Prop::implies(Prop::Atom("H".into()), Prop::Atom("M".into())));
        builder.assert(&Prop::Atom("H".into()));
        let h = builder.atom_var("H");
        let m = builder.atom_var("M");
        let (clauses, num_vars) = builder.into_clauses();
        let mut solver = DpllSolver::new(clauses, num_vars);
        match solver.solve() {
            SatResult::Sat(model) => {
                assert_eq!(model[h], Some(true));
                assert_eq!(model[m], Some(true));
            }
            other => panic!("expected sat, got {:?}", other),
        }
    }

    #[test]
    fn expired_deadline_reports_unknown() {
        let clauses = vec![vec![Lit::pos(0), Lit::pos(1)], vec![Lit::neg(0), Lit::neg(1)]];
        let deadline = Instant::now() - Duration::from_millis(1);
        let mut solver = DpllSolver::new(clauses, 2).with_budget(u64::MAX, Some(deadline));
        assert_eq!(solver.solve(), SatResult::Unknown);
    }

    #[test]
    fn atom_vars_are_stable() {
        let mut builder = CnfBuilder::new();
        let a = builder.atom_var("P(a)");
        let b = builder.atom_var("P(b)");
        assert_ne!(a, b);
        assert_eq!(builder.atom_var("P(a)"), a);
    }
}
