/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! A [`SolverBackend`] that records the model instead of searching it.
//!
//! Useful for model statistics, for tests and for validating a concrete
//! schedule: [`ModelRecorder::solve`] checks the assignment given with
//! [`ModelRecorder::assign`] / [`ModelRecorder::assign_schedule`] (or the
//! hints when nothing was assigned) against every recorded constraint.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use super::reader::ScheduleReader;
use super::{
    BoolVar, IntVar, IntervalVar, LinearConstraint, Literal, SolveOutcome, SolveStatus,
    SolverBackend, VariableBundle,
};
use crate::config::SolverParams;
use crate::task::TaskSet;

/// First constraint an assignment breaks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("variable {name} has no value")]
    Unassigned { name: String },

    #[error("{name} = {value} outside [{lo}, {hi}]")]
    OutOfDomain {
        name: String,
        value: i64,
        lo: i64,
        hi: i64,
    },

    #[error("linear constraint #{index} violated")]
    Linear { index: usize },

    #[error("interval #{index}: start + size != end")]
    IntervalLength { index: usize },

    #[error("intervals #{first} and #{second} overlap")]
    Overlap { first: usize, second: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModelStats {
    pub int_vars: usize,
    pub bool_vars: usize,
    pub linear_constraints: usize,
    pub intervals: usize,
    pub no_overlap_groups: usize,
    pub hints: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Assignment {
    ints: BTreeMap<IntVar, i64>,
    bools: BTreeMap<BoolVar, bool>,
}

#[derive(Debug, Clone, Copy)]
struct Interval {
    start: IntVar,
    size: IntVar,
    end: IntVar,
    presence: Literal,
}

#[derive(Debug, Default)]
pub struct ModelRecorder {
    int_vars: Vec<(String, i64, i64)>,
    bool_vars: Vec<String>,
    linear: Vec<(LinearConstraint, Vec<Literal>)>,
    intervals: Vec<Interval>,
    no_overlaps: Vec<Vec<IntervalVar>>,
    hints: BTreeMap<IntVar, i64>,
    assignment: Option<Assignment>,
    solution: Option<Assignment>,
    last_violation: Option<Violation>,
}

impl ModelRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> ModelStats {
        ModelStats {
            int_vars: self.int_vars.len(),
            bool_vars: self.bool_vars.len(),
            linear_constraints: self.linear.len(),
            intervals: self.intervals.len(),
            no_overlap_groups: self.no_overlaps.len(),
            hints: self.hints.len(),
        }
    }

    /// Declared bounds of `var`.
    pub fn domain(&self, var: IntVar) -> Option<(i64, i64)> {
        self.int_vars.get(var.0).map(|(_, lo, hi)| (*lo, *hi))
    }

    pub fn hint(&self, var: IntVar) -> Option<i64> {
        self.hints.get(&var).copied()
    }

    /// Why the last [`solve`](SolverBackend::solve) was infeasible.
    pub fn last_violation(&self) -> Option<&Violation> {
        self.last_violation.as_ref()
    }

    pub fn assign(&mut self, var: IntVar, value: i64) {
        self.assignment
            .get_or_insert_with(Assignment::default)
            .ints
            .insert(var, value);
    }

    pub fn assign_bool(&mut self, var: BoolVar, value: bool) {
        self.assignment
            .get_or_insert_with(Assignment::default)
            .bools
            .insert(var, value);
    }

    /// Assign every variable in `bundle` from the solved timings in `tasks`.
    ///
    /// Dynamic bounds take their fixed value when the variable is a constant
    /// and the observed extremes otherwise.  Returns `false` (assigning
    /// nothing) if some task has not been solved.
    pub fn assign_schedule(
        &mut self,
        bundle: &VariableBundle,
        tasks: &TaskSet,
        phased: bool,
    ) -> bool {
        if tasks.iter().any(|t| t.solved.is_none()) {
            return false;
        }
        let Some(observed) = ScheduleReader::observed_bounds(tasks, phased) else {
            return false;
        };

        for (task, vars) in tasks.iter().zip(&bundle.tasks) {
            let Some(s) = task.solved else { continue };
            self.assign(vars.start, s.start);
            self.assign(vars.end, s.end);
            self.assign(vars.wcet, s.wcet);
            self.assign(vars.resource, s.resource as i64);
        }

        let d = &bundle.dynamic;
        for (var, seen) in [
            (d.min_release_time, observed.min_release_time),
            (d.max_release_time, observed.max_release_time),
            (d.min_deadline, observed.min_deadline),
            (d.max_deadline, observed.max_deadline),
            (d.min_exec_time, observed.min_exec_time),
            (d.max_exec_time, observed.max_exec_time),
        ] {
            let value = match self.domain(var) {
                Some((lo, hi)) if lo == hi => lo,
                _ => seen,
            };
            self.assign(var, value);
        }

        for guard in &bundle.guards {
            let resource = |id: usize| tasks.get(id).solved.map(|s| s.resource);
            let same = resource(guard.first) == resource(guard.second);
            self.assign_bool(guard.same_resource, same);
        }
        true
    }

    /// Check `self`'s explicit assignment against the recorded model.
    pub fn check(&self) -> Result<(), Violation> {
        match &self.assignment {
            Some(a) => self.check_assignment(a),
            None => Err(Violation::Unassigned {
                name: "<no assignment>".to_string(),
            }),
        }
    }

    fn check_assignment(&self, a: &Assignment) -> Result<(), Violation> {
        for (index, (name, lo, hi)) in self.int_vars.iter().enumerate() {
            let value = *a.ints.get(&IntVar(index)).ok_or_else(|| Violation::Unassigned {
                name: name.clone(),
            })?;
            if value < *lo || value > *hi {
                return Err(Violation::OutOfDomain {
                    name: name.clone(),
                    value,
                    lo: *lo,
                    hi: *hi,
                });
            }
        }
        for (index, name) in self.bool_vars.iter().enumerate() {
            if !a.bools.contains_key(&BoolVar(index)) {
                return Err(Violation::Unassigned { name: name.clone() });
            }
        }

        let literal = |l: Literal| l.holds(a.bools[&l.var()]);
        let int = |v: IntVar| a.ints.get(&v).copied();

        for (index, (constraint, enforce)) in self.linear.iter().enumerate() {
            if !enforce.iter().all(|&l| literal(l)) {
                continue;
            }
            if constraint.evaluate(int) != Some(true) {
                return Err(Violation::Linear { index });
            }
        }

        for (index, iv) in self.intervals.iter().enumerate() {
            if !literal(iv.presence) {
                continue;
            }
            let (start, size, end) = (a.ints[&iv.start], a.ints[&iv.size], a.ints[&iv.end]);
            if start + size != end {
                return Err(Violation::IntervalLength { index });
            }
        }

        for group in &self.no_overlaps {
            let present: Vec<usize> = group
                .iter()
                .map(|iv| iv.0)
                .filter(|&i| literal(self.intervals[i].presence))
                .collect();
            for (n, &i) in present.iter().enumerate() {
                for &j in &present[n + 1..] {
                    let (x, y) = (&self.intervals[i], &self.intervals[j]);
                    let overlap = a.ints[&x.start] < a.ints[&y.end]
                        && a.ints[&y.start] < a.ints[&x.end];
                    if overlap {
                        return Err(Violation::Overlap {
                            first: i,
                            second: j,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// The explicit assignment, or the hints when nothing was assigned.
    fn candidate(&self) -> Assignment {
        self.assignment.clone().unwrap_or_else(|| Assignment {
            ints: self.hints.clone(),
            bools: BTreeMap::new(),
        })
    }
}

impl SolverBackend for ModelRecorder {
    fn new_int_var(&mut self, lo: i64, hi: i64, name: &str) -> IntVar {
        self.int_vars.push((name.to_string(), lo, hi));
        IntVar(self.int_vars.len() - 1)
    }

    fn new_bool_var(&mut self, name: &str) -> BoolVar {
        self.bool_vars.push(name.to_string());
        BoolVar(self.bool_vars.len() - 1)
    }

    fn add_linear(&mut self, constraint: LinearConstraint, enforce: &[Literal]) {
        self.linear.push((constraint, enforce.to_vec()));
    }

    fn add_optional_interval(
        &mut self,
        start: IntVar,
        size: IntVar,
        end: IntVar,
        presence: Literal,
    ) -> IntervalVar {
        self.intervals.push(Interval {
            start,
            size,
            end,
            presence,
        });
        IntervalVar(self.intervals.len() - 1)
    }

    fn add_no_overlap(&mut self, intervals: &[IntervalVar]) {
        self.no_overlaps.push(intervals.to_vec());
    }

    fn add_hint(&mut self, var: IntVar, value: i64) {
        self.hints.insert(var, value);
    }

    fn solve(&mut self, params: &SolverParams) -> SolveOutcome {
        let stats = self.stats();
        info!(
            int_vars = stats.int_vars,
            bool_vars = stats.bool_vars,
            constraints = stats.linear_constraints,
            workers = params.workers,
            "Checking recorded model"
        );

        let candidate = self.candidate();
        self.solution = None;
        self.last_violation = None;

        match self.check_assignment(&candidate) {
            Ok(()) => {
                self.solution = Some(candidate);
                SolveOutcome {
                    status: SolveStatus::Feasible,
                    solutions: 1,
                }
            }
            Err(violation @ Violation::Unassigned { .. }) => {
                debug!(%violation, "assignment incomplete");
                self.last_violation = Some(violation);
                SolveOutcome::none(SolveStatus::Unknown)
            }
            Err(violation) => {
                debug!(%violation, "assignment rejected");
                self.last_violation = Some(violation);
                SolveOutcome::none(SolveStatus::Infeasible)
            }
        }
    }

    fn value(&self, var: IntVar, solution: usize) -> Option<i64> {
        if solution != 0 {
            return None;
        }
        self.solution.as_ref()?.ints.get(&var).copied()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Relation;

    #[test]
    fn records_every_call() {
        let mut r = ModelRecorder::new();
        let x = r.new_int_var(0, 5, "x");
        let y = r.new_int_var(0, 5, "y");
        let b = r.new_bool_var("b");
        r.add_linear(LinearConstraint::difference(x, y, Relation::Le, 0), &[b.literal()]);
        let ix = r.add_optional_interval(x, y, y, b.literal());
        r.add_no_overlap(&[ix]);
        r.add_hint(x, 2);
        assert_eq!(
            r.stats(),
            ModelStats {
                int_vars: 2,
                bool_vars: 1,
                linear_constraints: 1,
                intervals: 1,
                no_overlap_groups: 1,
                hints: 1,
            }
        );
        assert_eq!(r.domain(y), Some((0, 5)));
        assert_eq!(r.hint(x), Some(2));
    }

    #[test]
    fn enforcement_literal_switches_constraint() {
        let mut r = ModelRecorder::new();
        let x = r.new_int_var(0, 5, "x");
        let b = r.new_bool_var("b");
        r.add_linear(LinearConstraint::single(x, Relation::Eq, 1), &[b.literal()]);
        r.assign(x, 4);
        r.assign_bool(b, false);
        assert_eq!(r.check(), Ok(()));
        r.assign_bool(b, true);
        assert_eq!(r.check(), Err(Violation::Linear { index: 0 }));
    }

    #[test]
    fn overlapping_present_intervals_are_rejected() {
        let mut r = ModelRecorder::new();
        let mut var = |name: &str, lo: i64| r.new_int_var(lo, 9, name);
        let (s1, d1, e1) = (var("s1", 0), var("d1", 1), var("e1", 0));
        let (s2, d2, e2) = (var("s2", 0), var("d2", 1), var("e2", 0));
        let b = r.new_bool_var("same");
        let i1 = r.add_optional_interval(s1, d1, e1, b.literal());
        let i2 = r.add_optional_interval(s2, d2, e2, b.literal());
        r.add_no_overlap(&[i1, i2]);
        for (var, value) in [(s1, 0), (d1, 3), (e1, 3), (s2, 2), (d2, 2), (e2, 4)] {
            r.assign(var, value);
        }
        r.assign_bool(b, true);
        let outcome = r.solve(&SolverParams::default());
        assert_eq!(outcome.status, SolveStatus::Infeasible);
        assert!(matches!(r.last_violation(), Some(Violation::Overlap { .. })));

        // on different resources the intervals are absent
        r.assign_bool(b, false);
        let outcome = r.solve(&SolverParams::default());
        assert_eq!(outcome.status, SolveStatus::Feasible);
        assert_eq!(r.value(s2, 0), Some(2));
        assert_eq!(r.value(s2, 1), None);
    }

    #[test]
    fn hints_alone_leave_the_verdict_open() {
        let mut r = ModelRecorder::new();
        let x = r.new_int_var(0, 3, "x");
        let _y = r.new_int_var(0, 3, "y");
        r.add_hint(x, 1);
        let outcome = r.solve(&SolverParams::default());
        assert_eq!(outcome.status, SolveStatus::Unknown);
        assert_eq!(outcome.solutions, 0);
    }

    #[test]
    fn out_of_domain_value_is_reported() {
        let mut r = ModelRecorder::new();
        let x = r.new_int_var(2, 3, "x");
        r.assign(x, 7);
        assert!(matches!(
            r.check(),
            Err(Violation::OutOfDomain { value: 7, .. })
        ));
    }
}
