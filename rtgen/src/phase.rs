/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Phase (initial offset) assignment for periodic tasks.
//!
//! A phase is a whole number of periods, `k × period` with `k` counted by
//! coin flips and capped at [`PHASE_MULTIPLIER_CAP`].  Every task connected
//! to the drawn task through precedence relations receives the same phase, so
//! related tasks keep aligned windows.

use tracing::{debug, info};

use crate::precedence::PrecedenceMap;
use crate::random::RandomSource;
use crate::task::TaskSet;

/// Largest phase, in periods.
pub const PHASE_MULTIPLIER_CAP: u64 = 20;

#[derive(Debug, Clone, Default)]
pub struct PhaseAssigner;

impl PhaseAssigner {
    pub fn new() -> Self {
        Self
    }

    /// Assign phases to the periodic originals of `tasks`.
    ///
    /// Tasks with a non-zero phase already, and tasks phased earlier in the
    /// same pass through a connected task, are left untouched.  Returns the
    /// number of phases drawn.
    pub fn assign(&self, tasks: &mut TaskSet, map: &PrecedenceMap, rng: &mut RandomSource) -> usize {
        let mut phased = vec![false; tasks.len()];
        for task in tasks.originals().filter(|t| t.phase != 0) {
            phased[task.id] = true;
        }

        let mut drawn = 0;
        for id in tasks.original_ids() {
            let task = tasks.get(id);
            if phased[id] || !task.periodic || task.period == 0 {
                continue;
            }
            let phase = rng.geometric_multiple(PHASE_MULTIPLIER_CAP) * task.period;
            drawn += 1;

            let members = if id < map.len() {
                map.members(id)
            } else {
                vec![id]
            };
            debug!(task = id, phase, subgraph = members.len(), "phase");
            for member in members {
                let other = tasks.get_mut(member);
                if other.is_instance() || phased[member] {
                    continue;
                }
                if other.periodic {
                    other.phase = phase;
                }
                phased[member] = true;
            }
        }

        info!(drawn, "Phase assignment done");
        drawn
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[test]
    fn phases_are_whole_periods_within_cap() {
        let mut tasks = TaskSet::new((0..6).map(|i| Task::periodic(i, 5)).collect());
        let map = PrecedenceMap::new(tasks.len());
        let mut rng = RandomSource::from_seed(17);
        let drawn = PhaseAssigner::new().assign(&mut tasks, &map, &mut rng);
        assert_eq!(drawn, 6);
        for task in tasks.iter() {
            assert_eq!(task.phase % 5, 0);
            assert!(task.phase <= 5 * PHASE_MULTIPLIER_CAP);
        }
    }

    #[test]
    fn connected_tasks_share_a_phase() {
        for seed in 0..20 {
            let mut tasks = TaskSet::new(vec![
                Task::periodic(0, 4),
                Task::periodic(1, 8),
                Task::periodic(2, 4),
                Task::periodic(3, 2),
                Task::periodic(4, 6),
            ]);
            tasks.add_edge(0, 1);
            tasks.add_edge(2, 1);
            tasks.add_edge(3, 4);
            let map = PrecedenceMap::from_tasks(&tasks);
            let mut rng = RandomSource::from_seed(seed);
            let drawn = PhaseAssigner::new().assign(&mut tasks, &map, &mut rng);

            assert_eq!(drawn, 2);
            assert_eq!(tasks.get(0).phase, tasks.get(1).phase);
            assert_eq!(tasks.get(1).phase, tasks.get(2).phase);
            assert_eq!(tasks.get(3).phase, tasks.get(4).phase);
        }
    }

    #[test]
    fn already_phased_tasks_are_kept() {
        let mut first = Task::periodic(0, 3);
        first.phase = 9;
        let mut tasks = TaskSet::new(vec![first, Task::periodic(1, 3)]);
        let map = PrecedenceMap::new(tasks.len());
        let mut rng = RandomSource::from_seed(0);
        PhaseAssigner::new().assign(&mut tasks, &map, &mut rng);
        assert_eq!(tasks.get(0).phase, 9);
    }

    #[test]
    fn aperiodic_tasks_stay_unphased() {
        let mut tasks = TaskSet::new(vec![Task::periodic(0, 4), Task::aperiodic(1)]);
        tasks.add_edge(0, 1);
        let map = PrecedenceMap::from_tasks(&tasks);
        for seed in 0..10 {
            let mut rng = RandomSource::from_seed(seed);
            PhaseAssigner::new().assign(&mut tasks, &map, &mut rng);
            assert_eq!(tasks.get(1).phase, 0);
        }
    }
}
