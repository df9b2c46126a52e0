/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Random construction of the original task set.

use tracing::info;

use crate::config::GenerationConfig;
use crate::random::RandomSource;
use crate::task::{Task, TaskSet};

/// Draw `config.task_count` original tasks.
///
/// With `periodic_only` / `aperiodic_only` every task gets that kind;
/// otherwise each task is periodic with probability `periodic_share`.
/// Periods are `base_period × m`, `m` drawn from `period_multipliers`.
pub fn build_tasks(config: &GenerationConfig, rng: &mut RandomSource) -> TaskSet {
    let tasks: Vec<Task> = (0..config.task_count)
        .map(|id| {
            let periodic = if config.periodic_only {
                true
            } else if config.aperiodic_only {
                false
            } else {
                rng.chance(config.periodic_share)
            };
            match rng.choose(&config.period_multipliers) {
                Some(&m) if periodic => Task::periodic(id, config.base_period * m),
                _ => Task::aperiodic(id),
            }
        })
        .collect();

    let set = TaskSet::new(tasks);
    info!(
        tasks = set.len(),
        periodic = set.iter().filter(|t| t.periodic).count(),
        "Built task set"
    );
    set
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periodic_only_uses_configured_periods() {
        let config = GenerationConfig {
            task_count: 12,
            periodic_only: true,
            base_period: 5,
            period_multipliers: vec![1, 3],
            ..Default::default()
        };
        let mut rng = RandomSource::from_seed(4);
        let set = build_tasks(&config, &mut rng);
        assert_eq!(set.len(), 12);
        for task in set.iter() {
            assert!(task.periodic);
            assert!([5, 15].contains(&task.period), "{}", task.period);
            assert_eq!(task.phase, 0);
        }
    }

    #[test]
    fn aperiodic_only_has_no_periods() {
        let config = GenerationConfig {
            task_count: 5,
            aperiodic_only: true,
            ..Default::default()
        };
        let mut rng = RandomSource::from_seed(4);
        let set = build_tasks(&config, &mut rng);
        assert!(set.iter().all(|t| !t.periodic && t.period == 0));
    }

    #[test]
    fn same_seed_builds_same_set() {
        let config = GenerationConfig {
            task_count: 20,
            ..Default::default()
        };
        let a = build_tasks(&config, &mut RandomSource::from_seed(9));
        let b = build_tasks(&config, &mut RandomSource::from_seed(9));
        assert_eq!(a, b);
    }

    #[test]
    fn share_extremes_decide_periodicity() {
        let mut config = GenerationConfig {
            task_count: 10,
            periodic_share: 1.0,
            ..Default::default()
        };
        let mut rng = RandomSource::from_seed(0);
        assert!(build_tasks(&config, &mut rng).iter().all(|t| t.periodic));
        config.periodic_share = 0.0;
        assert!(build_tasks(&config, &mut rng).iter().all(|t| !t.periodic));
    }
}
