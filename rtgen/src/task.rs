/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Core task data structures for the generator.
//!
//! ```text
//! TaskSet
//! ├── originals   ids 0..n          – generated (or TGFF) tasks
//! └── instances   ids n..           – unrolled occurrences k = 1, 2, … of
//!                                     each periodic original
//! ```
//!
//! # Ownership model
//! The [`TaskSet`] is owned by one generation session.  Ids are dense indices
//! into it and are never reused.  Instances carry a back-reference
//! ([`InstanceOf`]) to their original; originals list their instances in
//! order, so `instances[k - 1]` is occurrence `k`.
//!
//! Precedence relations are stored on both endpoints.  [`TaskSet::add_edge`]
//! is the only way to add one, which keeps `predecessors` and `successors`
//! mutually consistent.

use std::collections::BTreeSet;

/// Dense index into a [`TaskSet`].
pub type TaskId = usize;

/// Resource identifier.  Valid ids are `0..resource_count`.
pub type ResourceId = u32;

// ── Instance back-reference ───────────────────────────────────────────────────

/// Marks a task as the `number`-th unrolled occurrence of `original`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstanceOf {
    pub original: TaskId,
    /// Occurrence number, starting at 1 (the original itself is occurrence 0).
    pub number: u64,
}

// ── Solved attributes ─────────────────────────────────────────────────────────

/// Concrete values read back from a solved model.  All times are absolute
/// positions within the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolvedTiming {
    pub start: i64,
    pub end: i64,
    pub wcet: i64,
    pub resource: ResourceId,
}

impl SolvedTiming {
    /// `true` if the two execution intervals `[start, end)` share any time.
    pub fn overlaps(&self, other: &SolvedTiming) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// `true` if this interval ends no later than `other` starts.
    pub fn precedes(&self, other: &SolvedTiming) -> bool {
        self.end <= other.start
    }
}

// ── Task ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    pub id: TaskId,

    // ── Timing parameters ─────────────────────────────────────────────────────
    pub periodic: bool,
    /// Period length.  `0` for aperiodic tasks.
    pub period: u64,
    /// Offset of the first window within the horizon.  `0` when unphased.
    pub phase: u64,

    // ── Relations ─────────────────────────────────────────────────────────────
    pub predecessors: BTreeSet<TaskId>,
    pub successors: BTreeSet<TaskId>,
    /// Allowed resources.  Empty means unconstrained.
    pub residency: BTreeSet<ResourceId>,

    // ── Unrolling ─────────────────────────────────────────────────────────────
    /// Set on unrolled occurrences only.
    pub instance_of: Option<InstanceOf>,
    /// Unrolled occurrences of a periodic original, in order.
    pub instances: Vec<TaskId>,

    /// Filled by the schedule reader.
    pub solved: Option<SolvedTiming>,
}

impl Task {
    pub fn periodic(id: TaskId, period: u64) -> Self {
        Self {
            id,
            periodic: true,
            period,
            ..Default::default()
        }
    }

    pub fn aperiodic(id: TaskId) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn is_instance(&self) -> bool {
        self.instance_of.is_some()
    }

    /// Occurrence number: `0` for originals.
    pub fn instance_number(&self) -> u64 {
        self.instance_of.map_or(0, |i| i.number)
    }

    /// Id of the original task (the task itself for originals).
    pub fn original_id(&self) -> TaskId {
        self.instance_of.map_or(self.id, |i| i.original)
    }

    /// Start of this occurrence's window: `phase + number × period` when
    /// phased release times are enabled, `number × period` otherwise.
    /// Aperiodic tasks always start at `0`.
    pub fn window_start(&self, phased: bool) -> i64 {
        if !self.periodic {
            return 0;
        }
        let phase = if phased { self.phase } else { 0 };
        (phase + self.instance_number() * self.period) as i64
    }

    /// Release time relative to the window start, once solved.
    pub fn release_time(&self, phased: bool) -> Option<i64> {
        self.solved.map(|s| s.start - self.window_start(phased))
    }

    /// Deadline (completion) relative to the window start, once solved.
    pub fn deadline(&self, phased: bool) -> Option<i64> {
        self.solved.map(|s| s.end - self.window_start(phased))
    }

    /// This task followed by its instances.
    fn occurrence_ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        std::iter::once(self.id).chain(self.instances.iter().copied())
    }

    /// Absolute `[start, end)` of a periodic occurrence.  Phases are only
    /// ever non-zero with phased release times, so the phase is included.
    fn occurrence_window(&self) -> (i64, i64) {
        let start = self.window_start(true);
        (start, start + self.period as i64)
    }
}

// ── TaskSet ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskSet {
    tasks: Vec<Task>,
}

impl TaskSet {
    /// Build a set from original tasks.  Ids are reassigned densely in order.
    pub fn new(mut tasks: Vec<Task>) -> Self {
        for (id, task) in tasks.iter_mut().enumerate() {
            task.id = id;
        }
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> &Task {
        &self.tasks[id]
    }

    pub fn get_mut(&mut self, id: TaskId) -> &mut Task {
        &mut self.tasks[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.tasks.iter_mut()
    }

    /// Non-instance tasks.
    pub fn originals(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|t| !t.is_instance())
    }

    pub fn original_ids(&self) -> Vec<TaskId> {
        self.originals().map(|t| t.id).collect()
    }

    pub fn has_instances(&self) -> bool {
        self.tasks.iter().any(Task::is_instance)
    }

    pub fn has_edge(&self, from: TaskId, to: TaskId) -> bool {
        self.tasks[from].successors.contains(&to)
    }

    /// Total number of precedence relations between original tasks.
    pub fn relation_count(&self) -> usize {
        self.originals().map(|t| t.successors.len()).sum()
    }

    /// Add `from → to` on both endpoints.
    ///
    /// When both tasks are periodic originals that have already been unrolled,
    /// the relation is also added between their occurrences as given by
    /// [`TaskSet::linked_occurrences`].
    pub fn add_edge(&mut self, from: TaskId, to: TaskId) {
        for (a, b) in self.linked_occurrences(from, to) {
            self.link(a, b);
        }
    }

    /// Occurrence pairs that a relation `from → to` between originals orders:
    /// the originals themselves, and for two periodic tasks every pair of
    /// occurrences whose windows intersect.  Occurrences in disjoint windows
    /// are left unlinked.
    pub fn linked_occurrences(&self, from: TaskId, to: TaskId) -> Vec<(TaskId, TaskId)> {
        let (a, b) = (&self.tasks[from], &self.tasks[to]);
        let mut pairs = vec![(from, to)];
        if !a.periodic || !b.periodic || a.period == 0 || b.period == 0 {
            return pairs;
        }
        for x in a.occurrence_ids() {
            let (x_start, x_end) = self.tasks[x].occurrence_window();
            for y in b.occurrence_ids() {
                if (x, y) == (from, to) {
                    continue;
                }
                let (y_start, y_end) = self.tasks[y].occurrence_window();
                if x_start < y_end && y_start < x_end {
                    pairs.push((x, y));
                }
            }
        }
        pairs
    }

    fn link(&mut self, from: TaskId, to: TaskId) {
        debug_assert_ne!(from, to, "self-loop on task {from}");
        self.tasks[from].successors.insert(to);
        self.tasks[to].predecessors.insert(from);
    }

    /// Replace the residency of `original` and mirror it onto its instances.
    pub fn set_residency(&mut self, original: TaskId, residency: BTreeSet<ResourceId>) {
        let instances = self.tasks[original].instances.clone();
        for id in instances {
            self.tasks[id].residency = residency.clone();
        }
        self.tasks[original].residency = residency;
    }

    /// Number of original tasks carrying a residency restriction.
    pub fn residency_count(&self) -> usize {
        self.originals().filter(|t| !t.residency.is_empty()).count()
    }

    /// Unroll every periodic original into the occurrences that fit in
    /// `horizon`.  Occurrence `k` covers `[start + k·p, start + (k+1)·p)`
    /// where `start` is the original's window start.
    ///
    /// Instances copy period, phase and residency, and inherit precedence
    /// relations between periodic originals for every pair of occurrences
    /// whose windows intersect.
    /// Calling this twice is a no-op.
    pub fn unroll(&mut self, horizon: u64, phased: bool) {
        if self.has_instances() {
            return;
        }
        let originals = self.original_ids();

        for &id in &originals {
            let task = &self.tasks[id];
            if !task.periodic || task.period == 0 {
                continue;
            }
            let start = task.window_start(phased) as u64;
            let period = task.period;
            let (phase, residency) = (task.phase, task.residency.clone());

            let mut number = 1;
            while start + (number + 1) * period <= horizon {
                let inst_id = self.tasks.len();
                self.tasks.push(Task {
                    id: inst_id,
                    periodic: true,
                    period,
                    phase,
                    residency: residency.clone(),
                    instance_of: Some(InstanceOf {
                        original: id,
                        number,
                    }),
                    ..Default::default()
                });
                self.tasks[id].instances.push(inst_id);
                number += 1;
            }
        }

        for &from in &originals {
            let successors: Vec<TaskId> = self.tasks[from].successors.iter().copied().collect();
            for to in successors {
                for (a, b) in self.linked_occurrences(from, to) {
                    self.link(a, b);
                }
            }
        }
    }

    /// Kahn's algorithm.  `None` if the precedence graph has a cycle.
    pub fn topological_order(&self) -> Option<Vec<TaskId>> {
        let mut in_degree: Vec<usize> = self.tasks.iter().map(|t| t.predecessors.len()).collect();
        let mut ready: Vec<TaskId> = (0..self.tasks.len())
            .filter(|&id| in_degree[id] == 0)
            .collect();
        let mut order = Vec::with_capacity(self.tasks.len());

        while let Some(id) = ready.pop() {
            order.push(id);
            for &succ in &self.tasks[id].successors {
                in_degree[succ] -= 1;
                if in_degree[succ] == 0 {
                    ready.push(succ);
                }
            }
        }

        (order.len() == self.tasks.len()).then_some(order)
    }

    /// `true` if every relation is stored on both endpoints.
    pub fn relations_are_symmetric(&self) -> bool {
        self.tasks.iter().all(|t| {
            t.successors
                .iter()
                .all(|s| self.tasks[*s].predecessors.contains(&t.id))
                && t.predecessors
                    .iter()
                    .all(|p| self.tasks[*p].successors.contains(&t.id))
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_reassigns_dense_ids() {
        let set = TaskSet::new(vec![Task::periodic(9, 4), Task::aperiodic(3)]);
        assert_eq!(set.get(0).id, 0);
        assert_eq!(set.get(1).id, 1);
    }

    #[test]
    fn add_edge_is_symmetric() {
        let mut set = TaskSet::new(vec![Task::aperiodic(0), Task::aperiodic(1)]);
        set.add_edge(0, 1);
        assert!(set.has_edge(0, 1));
        assert!(set.get(1).predecessors.contains(&0));
        assert!(set.relations_are_symmetric());
        assert_eq!(set.relation_count(), 1);
    }

    #[test]
    fn unroll_creates_occurrences_within_horizon() {
        let mut set = TaskSet::new(vec![Task::periodic(0, 4), Task::periodic(1, 6)]);
        set.unroll(12, false);
        // 12 / 4 = 3 occurrences → 2 instances; 12 / 6 = 2 → 1 instance
        assert_eq!(set.get(0).instances.len(), 2);
        assert_eq!(set.get(1).instances.len(), 1);
        assert_eq!(set.len(), 5);

        let second = set.get(set.get(0).instances[1]);
        assert_eq!(second.instance_number(), 2);
        assert_eq!(second.original_id(), 0);
        assert_eq!(second.window_start(false), 8);
    }

    #[test]
    fn unroll_respects_phase() {
        let mut task = Task::periodic(0, 5);
        task.phase = 10;
        let mut set = TaskSet::new(vec![task]);
        set.unroll(30, true);
        // windows [10,15) [15,20) [20,25) [25,30) → 3 instances
        assert_eq!(set.get(0).instances.len(), 3);
        assert_eq!(set.get(set.get(0).instances[0]).window_start(true), 15);
        // without phased release the phase is ignored
        assert_eq!(set.get(set.get(0).instances[0]).window_start(false), 5);
    }

    #[test]
    fn unroll_copies_relations_pairwise() {
        let mut set = TaskSet::new(vec![Task::periodic(0, 5), Task::periodic(1, 5)]);
        set.add_edge(0, 1);
        set.unroll(15, false);
        let a = set.get(0).instances.clone();
        let b = set.get(1).instances.clone();
        assert_eq!(a.len(), 2);
        for (x, y) in a.iter().zip(&b) {
            assert!(set.has_edge(*x, *y));
        }
        assert!(set.relations_are_symmetric());
        // only original relations are counted
        assert_eq!(set.relation_count(), 1);
    }

    #[test]
    fn relations_across_periods_link_intersecting_windows() {
        let mut set = TaskSet::new(vec![Task::periodic(0, 20), Task::periodic(1, 10)]);
        set.add_edge(0, 1);
        set.unroll(40, false);
        // 0: [0,20) and 2: [20,40); 1: [0,10), 3: [10,20), 4: [20,30), 5: [30,40)
        assert_eq!(set.get(0).instances, vec![2]);
        assert_eq!(set.get(1).instances, vec![3, 4, 5]);
        assert_eq!(set.linked_occurrences(0, 1), vec![(0, 1), (0, 3), (2, 4), (2, 5)]);
        for (from, to) in [(0, 1), (0, 3), (2, 4), (2, 5)] {
            assert!(set.has_edge(from, to), "{from} -> {to}");
        }
        // the second occurrence of 0 starts after 3's window has closed
        assert!(!set.has_edge(2, 3));
        assert!(set.relations_are_symmetric());
        assert!(set.topological_order().is_some());
        assert_eq!(set.relation_count(), 1);
    }

    #[test]
    fn phased_windows_decide_linked_occurrences() {
        let mut a = Task::periodic(0, 10);
        a.phase = 10;
        let b = Task::periodic(1, 10);
        let mut set = TaskSet::new(vec![a, b]);
        set.unroll(30, true);
        // 0: [10,20) and 2: [20,30); 1: [0,10), 3: [10,20), 4: [20,30)
        set.add_edge(0, 1);
        assert!(set.has_edge(0, 3));
        assert!(set.has_edge(2, 4));
        assert!(!set.has_edge(0, 4));
    }

    #[test]
    fn add_edge_after_unroll_links_instances() {
        let mut set = TaskSet::new(vec![Task::periodic(0, 5), Task::periodic(1, 5)]);
        set.unroll(10, false);
        set.add_edge(1, 0);
        let a = set.get(0).instances[0];
        let b = set.get(1).instances[0];
        assert!(set.has_edge(b, a));
    }

    #[test]
    fn set_residency_mirrors_instances() {
        let mut set = TaskSet::new(vec![Task::periodic(0, 2)]);
        set.unroll(6, false);
        set.set_residency(0, BTreeSet::from([1, 3]));
        for &inst in &set.get(0).instances {
            assert_eq!(set.get(inst).residency, BTreeSet::from([1, 3]));
        }
        assert_eq!(set.residency_count(), 1);
    }

    #[test]
    fn topological_order_detects_cycle() {
        let mut set = TaskSet::new(vec![
            Task::aperiodic(0),
            Task::aperiodic(1),
            Task::aperiodic(2),
        ]);
        set.add_edge(0, 1);
        set.add_edge(1, 2);
        assert!(set.topological_order().is_some());
        set.add_edge(2, 0);
        assert!(set.topological_order().is_none());
    }

    #[test]
    fn solved_timing_relations() {
        let a = SolvedTiming {
            start: 0,
            end: 3,
            wcet: 3,
            resource: 0,
        };
        let b = SolvedTiming {
            start: 3,
            end: 5,
            wcet: 2,
            resource: 1,
        };
        assert!(!a.overlaps(&b));
        assert!(a.precedes(&b));
        assert!(!b.precedes(&a));
    }
}
