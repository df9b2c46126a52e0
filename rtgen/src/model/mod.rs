/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Constraint model built on top of an opaque solver.
//!
//! ```text
//! DomainBuilder ──► ModelAssembler ──► HintGenerator ──► SolverBackend::solve
//!   (bounds)          (variables,        (initial            │
//!                      constraints)       guesses)           ▼
//!                                                      ScheduleReader
//! ```
//!
//! The solver owns every variable and constraint.  This module only holds
//! lightweight handles ([`IntVar`], [`BoolVar`], [`IntervalVar`]) returned by
//! the backend.  [`ModelRecorder`] is a backend that records the model and
//! checks given assignments against it; it does not search.

pub mod assembler;
pub mod domain;
pub mod hints;
pub mod reader;
pub mod recorder;

use serde::Serialize;

use crate::config::SolverParams;
use crate::task::TaskId;

pub use assembler::ModelAssembler;
pub use domain::{Bounds, DomainBuilder, DomainError, TaskDomain};
pub use hints::HintGenerator;
pub use reader::ScheduleReader;
pub use recorder::ModelRecorder;

// ── Handles ───────────────────────────────────────────────────────────────────

/// Bounded integer variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IntVar(pub usize);

/// Boolean indicator variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoolVar(pub usize);

impl BoolVar {
    pub fn literal(self) -> Literal {
        Literal::Pos(self)
    }

    pub fn negated(self) -> Literal {
        Literal::Neg(self)
    }
}

/// A boolean variable or its negation, used as an enforcement condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Literal {
    Pos(BoolVar),
    Neg(BoolVar),
}

impl Literal {
    pub fn var(self) -> BoolVar {
        match self {
            Literal::Pos(v) | Literal::Neg(v) => v,
        }
    }

    /// Truth value of the literal when its variable is `value`.
    pub fn holds(self, value: bool) -> bool {
        match self {
            Literal::Pos(_) => value,
            Literal::Neg(_) => !value,
        }
    }
}

/// Optional interval `[start, start + size) = [start, end)`, present only
/// when its literal holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntervalVar(pub usize);

// ── Linear constraints ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Le,
    Ge,
    Ne,
}

impl Relation {
    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Relation::Eq => lhs == rhs,
            Relation::Le => lhs <= rhs,
            Relation::Ge => lhs >= rhs,
            Relation::Ne => lhs != rhs,
        }
    }
}

/// `Σ coefficient × var  <relation>  rhs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearConstraint {
    pub terms: Vec<(i64, IntVar)>,
    pub relation: Relation,
    pub rhs: i64,
}

impl LinearConstraint {
    pub fn new(terms: Vec<(i64, IntVar)>, relation: Relation, rhs: i64) -> Self {
        Self {
            terms,
            relation,
            rhs,
        }
    }

    /// `var <relation> rhs`.
    pub fn single(var: IntVar, relation: Relation, rhs: i64) -> Self {
        Self::new(vec![(1, var)], relation, rhs)
    }

    /// `a − b <relation> rhs`.
    pub fn difference(a: IntVar, b: IntVar, relation: Relation, rhs: i64) -> Self {
        Self::new(vec![(1, a), (-1, b)], relation, rhs)
    }

    /// Evaluate with `value` supplying each variable.  `None` if a variable
    /// has no value.
    pub fn evaluate(&self, value: impl Fn(IntVar) -> Option<i64>) -> Option<bool> {
        let mut lhs = 0i64;
        for &(coefficient, var) in &self.terms {
            lhs += coefficient * value(var)?;
        }
        Some(self.relation.holds(lhs, self.rhs))
    }
}

// ── Solver collaborator ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveStatus {
    Infeasible,
    Feasible,
    Optimal,
    /// The solver stopped without a verdict (time limit, incomplete input).
    Unknown,
}

impl SolveStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, SolveStatus::Feasible | SolveStatus::Optimal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// Number of solutions that can be read back with
    /// [`SolverBackend::value`].
    pub solutions: usize,
}

impl SolveOutcome {
    pub fn none(status: SolveStatus) -> Self {
        Self {
            status,
            solutions: 0,
        }
    }
}

/// The operations the generator needs from a constraint solver.
pub trait SolverBackend {
    fn new_int_var(&mut self, lo: i64, hi: i64, name: &str) -> IntVar;

    fn new_bool_var(&mut self, name: &str) -> BoolVar;

    /// Post `constraint`, enforced only when every literal in `enforce` holds.
    fn add_linear(&mut self, constraint: LinearConstraint, enforce: &[Literal]);

    /// `target = Σ coefficient × var + constant`.
    fn add_weighted_sum_eq(&mut self, target: IntVar, terms: &[(i64, IntVar)], constant: i64) {
        let mut all: Vec<(i64, IntVar)> = terms.to_vec();
        all.push((-1, target));
        self.add_linear(LinearConstraint::new(all, Relation::Eq, -constant), &[]);
    }

    fn add_optional_interval(
        &mut self,
        start: IntVar,
        size: IntVar,
        end: IntVar,
        presence: Literal,
    ) -> IntervalVar;

    /// No two present intervals of `intervals` may overlap.
    fn add_no_overlap(&mut self, intervals: &[IntervalVar]);

    fn add_hint(&mut self, var: IntVar, value: i64);

    fn solve(&mut self, params: &SolverParams) -> SolveOutcome;

    /// Value of `var` in solution `solution` of the last solve.
    fn value(&self, var: IntVar, solution: usize) -> Option<i64>;
}

// ── Variable bundle ───────────────────────────────────────────────────────────

/// Solver handles for one task.  `end = start + wcet` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskVars {
    pub start: IntVar,
    pub end: IntVar,
    pub wcet: IntVar,
    pub resource: IntVar,
}

/// The six task-set-wide bounds referenced by every task's constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicConstraints {
    pub min_release_time: IntVar,
    pub max_release_time: IntVar,
    pub min_deadline: IntVar,
    pub max_deadline: IntVar,
    pub min_exec_time: IntVar,
    pub max_exec_time: IntVar,
}

impl DynamicConstraints {
    /// `(name, min, max)` for each bounded quantity.
    pub fn pairs(&self) -> [(&'static str, IntVar, IntVar); 3] {
        [
            ("release_time", self.min_release_time, self.max_release_time),
            ("deadline", self.min_deadline, self.max_deadline),
            ("exec_time", self.min_exec_time, self.max_exec_time),
        ]
    }
}

/// Concrete values of the six dynamic bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DynamicValues {
    pub min_release_time: i64,
    pub max_release_time: i64,
    pub min_deadline: i64,
    pub max_deadline: i64,
    pub min_exec_time: i64,
    pub max_exec_time: i64,
}

/// Indicator posted for a pair of tasks that may share a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapGuard {
    pub first: TaskId,
    pub second: TaskId,
    /// True iff both tasks run on the same resource.
    pub same_resource: BoolVar,
}

/// Every handle the assembler created, indexed by task id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableBundle {
    pub dynamic: DynamicConstraints,
    pub tasks: Vec<TaskVars>,
    pub guards: Vec<OverlapGuard>,
}

impl VariableBundle {
    pub fn task(&self, id: TaskId) -> &TaskVars {
        &self.tasks[id]
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
