/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Posts the scheduling model onto a [`SolverBackend`].
//!
//! Per task: start/end/wcet/resource variables with [`TaskDomain`] bounds,
//! `end = start + wcet`, a resource domain from the residency set, and
//! window-relative bounds against the six dynamic variables.  Instances are
//! tied to their original by a fixed offset.  Between tasks: a guarded
//! no-overlap for every pair that may share time and a resource, and
//! `pred.end ≤ succ.start` for every precedence relation the domains leave
//! open.

use tracing::{debug, info, warn};

use super::domain::TaskDomain;
use super::{
    DynamicConstraints, LinearConstraint, OverlapGuard, Relation, SolverBackend, TaskVars,
    VariableBundle,
};
use crate::config::GenerationConfig;
use crate::task::{Task, TaskSet};

/// Counts of what was posted, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub tasks: usize,
    pub guarded_pairs: usize,
    pub skipped_pairs: usize,
    pub precedence: usize,
    /// Relations whose domains leave no room for the order; not posted.
    pub unsatisfiable_precedence: usize,
}

#[derive(Debug, Clone)]
pub struct ModelAssembler<'a> {
    config: &'a GenerationConfig,
    horizon: i64,
    resource_count: u32,
}

impl<'a> ModelAssembler<'a> {
    pub fn new(config: &'a GenerationConfig, horizon: u64) -> Self {
        Self {
            config,
            horizon: horizon as i64,
            resource_count: config.resource_count,
        }
    }

    /// Override the resource count taken from the configuration.
    pub fn with_resource_count(mut self, resource_count: u32) -> Self {
        self.resource_count = resource_count;
        self
    }

    /// Post the whole model.  `domains` is indexed by task id.
    pub fn assemble<S: SolverBackend>(
        &self,
        tasks: &TaskSet,
        domains: &[TaskDomain],
        solver: &mut S,
    ) -> (VariableBundle, AssemblyStats) {
        let dynamic = self.dynamic_variables(solver);
        let mut stats = AssemblyStats {
            tasks: tasks.len(),
            ..Default::default()
        };

        let vars: Vec<TaskVars> = tasks
            .iter()
            .map(|task| self.task_variables(task, &domains[task.id], solver))
            .collect();

        for task in tasks.iter() {
            let own = vars[task.id];
            if let Some(inst) = task.instance_of {
                let original = vars[inst.original];
                let offset = domains[task.id].window_start - domains[inst.original].window_start;
                solver.add_linear(
                    LinearConstraint::difference(own.start, original.start, Relation::Eq, offset),
                    &[],
                );
                solver.add_linear(
                    LinearConstraint::difference(own.end, original.end, Relation::Eq, offset),
                    &[],
                );
                solver.add_linear(
                    LinearConstraint::difference(own.wcet, original.wcet, Relation::Eq, 0),
                    &[],
                );
                solver.add_linear(
                    LinearConstraint::difference(own.resource, original.resource, Relation::Eq, 0),
                    &[],
                );
            } else {
                self.bind_dynamic(task, &domains[task.id], own, &dynamic, solver);
            }
        }

        let mut guards = Vec::new();
        for a in tasks.iter() {
            for b in tasks.iter().skip(a.id + 1) {
                if a.original_id() == b.original_id() {
                    continue;
                }
                let disjoint_residency = !a.residency.is_empty()
                    && !b.residency.is_empty()
                    && a.residency.is_disjoint(&b.residency);
                if disjoint_residency || !domains[a.id].may_overlap(&domains[b.id]) {
                    stats.skipped_pairs += 1;
                    continue;
                }
                let (va, vb) = (vars[a.id], vars[b.id]);
                let same = solver.new_bool_var(&format!("same_resource_{}_{}", a.id, b.id));
                solver.add_linear(
                    LinearConstraint::difference(va.resource, vb.resource, Relation::Eq, 0),
                    &[same.literal()],
                );
                solver.add_linear(
                    LinearConstraint::difference(va.resource, vb.resource, Relation::Ne, 0),
                    &[same.negated()],
                );
                let ia = solver.add_optional_interval(va.start, va.wcet, va.end, same.literal());
                let ib = solver.add_optional_interval(vb.start, vb.wcet, vb.end, same.literal());
                solver.add_no_overlap(&[ia, ib]);
                guards.push(OverlapGuard {
                    first: a.id,
                    second: b.id,
                    same_resource: same,
                });
                stats.guarded_pairs += 1;
            }
        }

        for task in tasks.iter() {
            for &succ in &task.successors {
                let (pred, next) = (&domains[task.id], &domains[succ]);
                if pred.always_before(next) {
                    continue;
                }
                if !pred.can_precede(next) {
                    warn!(
                        from = task.id,
                        to = succ,
                        earliest_end = pred.end.lo,
                        latest_start = next.start.hi,
                        "precedence cannot hold inside the task windows, not posted"
                    );
                    stats.unsatisfiable_precedence += 1;
                    continue;
                }
                solver.add_linear(
                    LinearConstraint::difference(
                        vars[task.id].end,
                        vars[succ].start,
                        Relation::Le,
                        0,
                    ),
                    &[],
                );
                stats.precedence += 1;
            }
        }

        info!(
            tasks = stats.tasks,
            guarded_pairs = stats.guarded_pairs,
            skipped_pairs = stats.skipped_pairs,
            precedence = stats.precedence,
            unsatisfiable_precedence = stats.unsatisfiable_precedence,
            "Model assembled"
        );
        (
            VariableBundle {
                dynamic,
                tasks: vars,
                guards,
            },
            stats,
        )
    }

    /// The six task-set-wide bounds, fixed when the user set them.
    fn dynamic_variables<S: SolverBackend>(&self, solver: &mut S) -> DynamicConstraints {
        let h = self.horizon;
        let c = self.config;
        let mut var = |name: &str, fixed: Option<i64>, lo: i64, hi: i64| match fixed {
            Some(v) => solver.new_int_var(v, v, name),
            None => solver.new_int_var(lo, hi, name),
        };
        let dynamic = DynamicConstraints {
            min_release_time: var("min_release_time", c.min_release_time, 0, h - 1),
            max_release_time: var("max_release_time", c.max_release_time, 0, h - 1),
            min_deadline: var("min_deadline", c.min_deadline, 1, h),
            max_deadline: var("max_deadline", c.max_deadline, 1, h),
            min_exec_time: var("min_exec_time", c.min_exec_time, 1, h),
            max_exec_time: var("max_exec_time", c.max_exec_time, 1, h),
        };
        for (name, min, max) in dynamic.pairs() {
            debug!(bound = name, "min ≤ max");
            solver.add_linear(LinearConstraint::difference(min, max, Relation::Le, 0), &[]);
        }
        dynamic
    }

    fn task_variables<S: SolverBackend>(
        &self,
        task: &Task,
        domain: &TaskDomain,
        solver: &mut S,
    ) -> TaskVars {
        let id = task.id;
        let start = solver.new_int_var(domain.start.lo, domain.start.hi, &format!("start_{id}"));
        let end = solver.new_int_var(domain.end.lo, domain.end.hi, &format!("end_{id}"));
        let wcet = solver.new_int_var(domain.wcet.lo, domain.wcet.hi, &format!("wcet_{id}"));
        solver.add_weighted_sum_eq(end, &[(1, start), (1, wcet)], 0);

        let name = format!("resource_{id}");
        let resource = match (task.residency.first(), task.residency.last()) {
            (Some(&lo), Some(&hi)) => {
                let resource = solver.new_int_var(lo as i64, hi as i64, &name);
                // holes inside [lo, hi]
                for excluded in (lo..=hi).filter(|r| !task.residency.contains(r)) {
                    solver.add_linear(
                        LinearConstraint::single(resource, Relation::Ne, excluded as i64),
                        &[],
                    );
                }
                resource
            }
            _ => solver.new_int_var(0, self.resource_count as i64 - 1, &name),
        };

        TaskVars {
            start,
            end,
            wcet,
            resource,
        }
    }

    /// Window-relative bounds against the dynamic variables.  Only originals
    /// need them: instances follow by the fixed offset.
    fn bind_dynamic<S: SolverBackend>(
        &self,
        task: &Task,
        domain: &TaskDomain,
        vars: TaskVars,
        dynamic: &DynamicConstraints,
        solver: &mut S,
    ) {
        let w0 = domain.window_start;
        let mut post = |c: LinearConstraint| solver.add_linear(c, &[]);

        // start − w0 between min and max release time
        post(LinearConstraint::difference(vars.start, dynamic.min_release_time, Relation::Ge, w0));
        post(LinearConstraint::difference(vars.start, dynamic.max_release_time, Relation::Le, w0));

        let pinned_deadline = task.periodic && self.config.deadline_equals_period;
        if !pinned_deadline {
            post(LinearConstraint::difference(vars.end, dynamic.min_deadline, Relation::Ge, w0));
            post(LinearConstraint::difference(vars.end, dynamic.max_deadline, Relation::Le, w0));
        }

        post(LinearConstraint::difference(vars.wcet, dynamic.min_exec_time, Relation::Ge, 0));
        post(LinearConstraint::difference(vars.wcet, dynamic.max_exec_time, Relation::Le, 0));
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::model::domain::DomainBuilder;
    use crate::model::recorder::{ModelRecorder, Violation};
    use crate::task::{SolvedTiming, Task};

    fn assemble(
        tasks: &TaskSet,
        config: &GenerationConfig,
        horizon: u64,
    ) -> (ModelRecorder, VariableBundle, AssemblyStats) {
        let domains = DomainBuilder::new(horizon, config).build(tasks).unwrap();
        let mut recorder = ModelRecorder::new();
        let (bundle, stats) =
            ModelAssembler::new(config, horizon).assemble(tasks, &domains, &mut recorder);
        (recorder, bundle, stats)
    }

    #[test]
    fn one_bundle_per_task() {
        let tasks = TaskSet::new(vec![Task::aperiodic(0), Task::aperiodic(1)]);
        let config = GenerationConfig::default();
        let (recorder, bundle, stats) = assemble(&tasks, &config, 10);
        assert_eq!(bundle.tasks.len(), 2);
        assert_eq!(stats.guarded_pairs, 1);
        assert_eq!(bundle.guards.len(), 1);
        assert_eq!(recorder.domain(bundle.task(0).start), Some((0, 9)));
        assert_eq!(recorder.domain(bundle.task(1).resource), Some((0, 1)));
    }

    #[test]
    fn fixed_dynamic_bounds_are_constants() {
        let tasks = TaskSet::new(vec![Task::periodic(0, 10)]);
        let config = GenerationConfig {
            min_exec_time: Some(2),
            max_exec_time: Some(5),
            ..Default::default()
        };
        let (recorder, bundle, _) = assemble(&tasks, &config, 10);
        assert_eq!(recorder.domain(bundle.dynamic.min_exec_time), Some((2, 2)));
        assert_eq!(recorder.domain(bundle.dynamic.max_exec_time), Some((5, 5)));
        assert_eq!(recorder.domain(bundle.task(0).wcet), Some((2, 5)));
        assert_eq!(recorder.domain(bundle.dynamic.max_deadline), Some((1, 10)));
    }

    #[test]
    fn residency_shapes_resource_domain() {
        let mut tasks = TaskSet::new(vec![Task::aperiodic(0), Task::aperiodic(1)]);
        tasks.set_residency(0, BTreeSet::from([2]));
        tasks.set_residency(1, BTreeSet::from([0, 3]));
        let config = GenerationConfig {
            resource_count: 4,
            ..Default::default()
        };
        let (recorder, bundle, stats) = assemble(&tasks, &config, 10);
        assert_eq!(recorder.domain(bundle.task(0).resource), Some((2, 2)));
        assert_eq!(recorder.domain(bundle.task(1).resource), Some((0, 3)));
        // {2} and {0, 3} never meet
        assert_eq!(stats.guarded_pairs, 0);
        assert_eq!(stats.skipped_pairs, 1);
    }

    #[test]
    fn separated_windows_skip_no_overlap() {
        let mut tasks = TaskSet::new(vec![Task::periodic(0, 5), Task::periodic(1, 5)]);
        tasks.add_edge(0, 1);
        tasks.unroll(10, false);
        let config = GenerationConfig::default();
        let (_, bundle, stats) = assemble(&tasks, &config, 10);
        // pairs across different windows cannot overlap; same-window pairs
        // between the two tasks are guarded
        assert_eq!(stats.guarded_pairs, 2);
        assert_eq!(bundle.guards.len(), 2);
        // both relations (original and instance) are posted
        assert_eq!(stats.precedence, 2);
    }

    /// Solve every occurrence of original `id` at `offset` into its window,
    /// running for `wcet` on `resource`.
    fn place(
        tasks: &mut TaskSet,
        phased: bool,
        id: usize,
        offset: i64,
        wcet: i64,
        resource: u32,
    ) {
        let mut occurrences = vec![id];
        occurrences.extend(tasks.get(id).instances.iter().copied());
        for occ in occurrences {
            let start = tasks.get(occ).window_start(phased) + offset;
            tasks.get_mut(occ).solved = Some(SolvedTiming {
                start,
                end: start + wcet,
                wcet,
                resource,
            });
        }
    }

    #[test]
    fn relations_across_periods_stay_satisfiable() {
        let mut tasks = TaskSet::new(vec![
            Task::periodic(0, 20),
            Task::periodic(1, 10),
            Task::periodic(2, 40),
        ]);
        tasks.add_edge(0, 1);
        tasks.unroll(40, false);
        let config = GenerationConfig::default();
        let domains = DomainBuilder::new(40, &config).build(&tasks).unwrap();
        for task in tasks.iter() {
            for &succ in &task.successors {
                assert!(
                    domains[task.id].can_precede(&domains[succ]),
                    "{} -> {succ}",
                    task.id
                );
            }
        }

        let mut recorder = ModelRecorder::new();
        let (bundle, stats) =
            ModelAssembler::new(&config, 40).assemble(&tasks, &domains, &mut recorder);
        assert_eq!(stats.unsatisfiable_precedence, 0);
        // 0 → 1 and its second occurrence → 1's third and fourth occurrences
        assert_eq!(stats.precedence, 4);

        place(&mut tasks, false, 0, 0, 2, 0);
        place(&mut tasks, false, 1, 5, 1, 0);
        place(&mut tasks, false, 2, 10, 1, 1);
        assert!(recorder.assign_schedule(&bundle, &tasks, false));
        assert_eq!(recorder.check(), Ok(()));
    }

    #[test]
    fn impossible_relation_is_not_posted() {
        // periods 20 → 10 linked by hand in the wrong windows: the second
        // occurrence of 0 cannot end before the second occurrence of 1 starts
        let mut tasks = TaskSet::new(vec![Task::periodic(0, 20), Task::periodic(1, 10)]);
        tasks.unroll(40, false);
        let (late, early) = (tasks.get(0).instances[0], tasks.get(1).instances[0]);
        tasks.get_mut(late).successors.insert(early);
        tasks.get_mut(early).predecessors.insert(late);

        let (_, _, stats) = assemble(&tasks, &GenerationConfig::default(), 40);
        assert_eq!(stats.unsatisfiable_precedence, 1);
        assert_eq!(stats.precedence, 0);
    }

    #[test]
    fn instances_are_offset_by_whole_periods() {
        for phased in [false, true] {
            let mut task = Task::periodic(0, 5);
            if phased {
                task.phase = 10;
            }
            let mut tasks = TaskSet::new(vec![task]);
            let horizon = if phased { 30 } else { 15 };
            tasks.unroll(horizon, phased);
            let expected = if phased { 3 } else { 2 };
            assert_eq!(tasks.get(0).instances.len(), expected);

            let config = GenerationConfig {
                phased_release_times: phased,
                ..Default::default()
            };
            let domains = DomainBuilder::new(horizon, &config).build(&tasks).unwrap();
            let mut recorder = ModelRecorder::new();
            let (bundle, _) =
                ModelAssembler::new(&config, horizon).assemble(&tasks, &domains, &mut recorder);

            place(&mut tasks, phased, 0, 1, 2, 0);
            for &inst in &tasks.get(0).instances {
                let (occ, original) = (tasks.get(inst), tasks.get(0));
                let shift = occ.instance_number() as i64 * 5;
                let (a, b) = (occ.solved.unwrap(), original.solved.unwrap());
                assert_eq!(a.start - b.start, shift);
            }
            assert!(recorder.assign_schedule(&bundle, &tasks, phased));
            assert_eq!(recorder.check(), Ok(()), "phased = {phased}");

            // one instance a unit late, still inside its own window
            let last = *tasks.get(0).instances.last().unwrap();
            let moved = tasks.get(last).solved.unwrap();
            recorder.assign(bundle.task(last).start, moved.start + 1);
            recorder.assign(bundle.task(last).end, moved.end + 1);
            assert!(
                matches!(recorder.check(), Err(Violation::Linear { .. })),
                "phased = {phased}"
            );
        }
    }
}
