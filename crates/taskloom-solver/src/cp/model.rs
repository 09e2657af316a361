//! A narrow wrapper around `pumpkin_solver` exposing exactly the five
//! primitives the scheduler needs: integer variables, boolean variables,
//! intervals, a no-overlap constraint over optional intervals, and linear
//! sums. Nothing in `taskloom_solver` outside this module touches
//! `pumpkin_solver` types directly, per §9's "Constraint-solver binding"
//! redesign flag.
//!
//! `pumpkin_solver` itself only proves out linear (in)equalities over
//! affine views of bounded integers (see `utf8proj-solver::optimal`, the
//! teacher's own use of the crate). Booleans are represented as integers
//! bounded to `[0, 1]`; optional-interval no-overlap is built on top of
//! that using the standard big-M disjunctive-ordering encoding rather than
//! a dedicated reified interval primitive, since the teacher's own usage
//! of `pumpkin_solver` never reaches for one either.

use std::time::Duration;

use pumpkin_solver::constraints as pcp;
use pumpkin_solver::optimisation::linear_sat_unsat::LinearSatUnsat;
use pumpkin_solver::optimisation::OptimisationDirection;
use pumpkin_solver::results::{OptimisationResult, ProblemSolution};
use pumpkin_solver::termination::TimeBudget;
use pumpkin_solver::variables::{AffineView, DomainId, TransformableVariable};
use pumpkin_solver::Solver;

/// A bounded integer decision variable. Booleans are `IntVar`s domained to
/// `[0, 1]`; see [`Model::new_bool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntVar(pub(crate) DomainId);

/// An alias documenting intent at call sites; identical representation to
/// [`IntVar`].
pub type BoolVar = IntVar;

/// A task's time span in the model: `end - start == duration` is posted at
/// construction.
#[derive(Debug, Clone, Copy)]
pub struct Interval {
    pub start: IntVar,
    pub end: IntVar,
}

/// Outcome of [`Model::minimize`], mirroring the solver contract in §4.5:
/// `Optimal`/`Feasible` carry a readable solution, `Infeasible` and
/// `Timeout` do not.
pub enum Outcome {
    Optimal(Solution),
    Feasible(Solution),
    Infeasible,
    Timeout,
}

/// A solved assignment of values to every variable created on the model
/// that produced it, read out eagerly because [`OptimisationResult`]'s two
/// success variants are distinct concrete types behind the same
/// [`ProblemSolution`] trait.
pub struct Solution {
    values: std::collections::HashMap<DomainId, i64>,
}

impl Solution {
    pub fn value(&self, var: IntVar) -> i64 {
        self.values[&var.0]
    }
}

/// An upper bound large enough to make any big-M disjunctive constraint
/// vacuous when its guarding indicator is zero. Set from the model's
/// horizon plus the dense person-id range, both passed in at construction.
pub struct Model {
    solver: Solver,
    tag: pumpkin_solver::ConstraintTag,
    big_m: i64,
    vars: Vec<DomainId>,
}

impl Model {
    /// `big_m` must exceed the largest magnitude any guarded linear
    /// expression in the model can take (the scheduler passes
    /// `horizon + num_people`, which dominates both start/end differences
    /// and person-id differences).
    pub fn new(big_m: i64) -> Self {
        let mut solver = Solver::default();
        let tag = solver.new_constraint_tag();
        Self {
            solver,
            tag,
            big_m,
            vars: Vec::new(),
        }
    }

    pub fn new_int(&mut self, lower: i64, upper: i64) -> IntVar {
        let id = self.solver.new_bounded_integer(lower as i32, upper as i32);
        self.vars.push(id);
        IntVar(id)
    }

    /// A variable pinned to a single value, used for fixed (single-person)
    /// assignments where the domain is a singleton.
    pub fn new_constant(&mut self, value: i64) -> IntVar {
        self.new_int(value, value)
    }

    pub fn new_bool(&mut self) -> BoolVar {
        self.new_int(0, 1)
    }

    pub fn new_interval(&mut self, start: IntVar, end: IntVar, duration: i64) -> Interval {
        self.eq_offset(end, start, duration);
        Interval { start, end }
    }

    fn terms(vars: &[(IntVar, i64)]) -> Vec<AffineView<DomainId>> {
        vars.iter().map(|(v, c)| v.0.scaled(*c as i32)).collect()
    }

    /// Posts `sum(coeff * var) >= bound` unconditionally.
    pub fn linear_ge(&mut self, vars: &[(IntVar, i64)], bound: i64) {
        let _ = self
            .solver
            .add_constraint(pcp::greater_than_or_equals(
                Self::terms(vars),
                bound as i32,
                self.tag,
            ))
            .post();
    }

    /// Posts `sum(coeff * var) <= bound` unconditionally (negate and
    /// delegate to [`Model::linear_ge`], the one primitive `pumpkin_solver`
    /// proves out directly).
    pub fn linear_le(&mut self, vars: &[(IntVar, i64)], bound: i64) {
        let negated: Vec<(IntVar, i64)> = vars.iter().map(|(v, c)| (*v, -c)).collect();
        self.linear_ge(&negated, -bound);
    }

    /// Posts `a >= b + offset` unconditionally.
    pub fn ge_offset(&mut self, a: IntVar, b: IntVar, offset: i64) {
        self.linear_ge(&[(a, 1), (b, -1)], offset);
    }

    /// Posts `a == b + offset` unconditionally (two opposing inequalities).
    pub fn eq_offset(&mut self, a: IntVar, b: IntVar, offset: i64) {
        self.ge_offset(a, b, offset);
        self.ge_offset(b, a, -offset);
    }

    pub fn eq(&mut self, a: IntVar, b: IntVar) {
        self.eq_offset(a, b, 0);
    }

    /// Posts `a >= bound`/`a <= bound` against a plain constant.
    pub fn ge_const(&mut self, a: IntVar, bound: i64) {
        self.linear_ge(&[(a, 1)], bound);
    }

    pub fn le_const(&mut self, a: IntVar, bound: i64) {
        self.linear_le(&[(a, 1)], bound);
    }

    pub fn eq_const(&mut self, a: IntVar, value: i64) {
        self.ge_const(a, value);
        self.le_const(a, value);
    }

    /// Posts `sum(lits) == 1`. Used both to force exactly one assignee
    /// literal on per task and, with a singleton slice, to pin a fixed
    /// assignment's literal to 1 without a separate constant variable.
    pub fn exactly_one(&mut self, lits: &[BoolVar]) {
        let terms: Vec<(IntVar, i64)> = lits.iter().map(|l| (*l, 1)).collect();
        self.linear_ge(&terms, 1);
        self.linear_le(&terms, 1);
    }

    /// Optional-interval no-overlap (§4.5 constraint 5): `entries` pair each
    /// task's interval with the boolean indicating whether it is actually
    /// present on this resource. For every pair, a `conflict` boolean is
    /// forced on whenever both are present, and a shared `order` boolean
    /// then picks which direction the pair must be sequenced in, vacuously
    /// satisfied whenever `conflict` is 0.
    pub fn no_overlap(&mut self, entries: &[(Interval, BoolVar)]) {
        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                let (a, present_a) = entries[i];
                let (b, present_b) = entries[j];
                let conflict = self.new_bool();
                // conflict >= present_a + present_b - 1
                self.linear_ge(
                    &[(conflict, 1), (present_a, -1), (present_b, -1)],
                    -1,
                );
                let order = self.new_bool();
                // order=1 and conflict=1 => b.start >= a.end; vacuous otherwise.
                self.linear_ge(
                    &[
                        (b.start, 1),
                        (a.end, -1),
                        (order, -self.big_m),
                        (conflict, -self.big_m),
                    ],
                    -2 * self.big_m,
                );
                // order=0 and conflict=1 => a.start >= b.end; vacuous otherwise.
                self.linear_ge(
                    &[
                        (a.start, 1),
                        (b.end, -1),
                        (order, self.big_m),
                        (conflict, -self.big_m),
                    ],
                    -self.big_m,
                );
            }
        }
    }

    /// Solves, minimizing `objective`, under a wall-clock `budget`.
    pub fn minimize(mut self, objective: IntVar, budget: Duration) -> Outcome {
        let vars = std::mem::take(&mut self.vars);
        let mut brancher = self.solver.default_brancher();
        let mut termination = TimeBudget::starting_now(budget);
        fn noop<B>(_: &Solver, _: pumpkin_solver::results::SolutionReference, _: &B) {}
        let result = self.solver.optimise(
            &mut brancher,
            &mut termination,
            LinearSatUnsat::new(OptimisationDirection::Minimise, objective.0, noop),
        );
        match result {
            OptimisationResult::Optimal(solution) => {
                Outcome::Optimal(Self::read_solution(&solution, &vars))
            }
            OptimisationResult::Satisfiable(solution) => {
                Outcome::Feasible(Self::read_solution(&solution, &vars))
            }
            OptimisationResult::Unsatisfiable => Outcome::Infeasible,
            OptimisationResult::Unknown => Outcome::Timeout,
        }
    }

    fn read_solution(solution: &impl ProblemSolution, vars: &[DomainId]) -> Solution {
        let values = vars
            .iter()
            .map(|&id| (id, i64::from(solution.get_integer_value(id))))
            .collect();
        Solution { values }
    }
}
