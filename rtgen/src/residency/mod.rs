/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Residency restrictions: which resources a task may run on.
//!
//! * [`ResidencyAssigner`] – pre-solve, random restrictions.
//! * [`posthoc::PosthocResidencyAssigner`] – post-solve, restrictions taken
//!   from the resources tasks were actually scheduled on, followed by a dense
//!   renumbering of the surviving resources.
//!
//! Only original tasks are picked; unrolled instances always mirror their
//! original's final set (see [`TaskSet::set_residency`]).

pub mod posthoc;

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::{record, Warning};
use crate::random::{Distribution, RandomSource};
use crate::task::{ResourceId, TaskId, TaskSet};

pub use posthoc::PosthocResidencyAssigner;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidencyAssigner {
    resource_count: u32,
    /// `None` restricts each task to exactly one resource.  `Some` draws the
    /// size of each allowed set from the distribution.
    multi: Option<Distribution>,
}

impl ResidencyAssigner {
    pub fn single(resource_count: u32) -> Self {
        Self {
            resource_count,
            multi: None,
        }
    }

    pub fn multi(resource_count: u32, size_distribution: Distribution) -> Self {
        Self {
            resource_count,
            multi: Some(size_distribution),
        }
    }

    /// Restrict up to `target` randomly chosen unrestricted original tasks.
    ///
    /// Tasks are drawn without replacement; a shortfall (pool exhausted) is
    /// recorded as a warning.  Returns the number of tasks restricted.
    pub fn assign(
        &self,
        tasks: &mut TaskSet,
        target: usize,
        rng: &mut RandomSource,
        warnings: &mut Vec<Warning>,
    ) -> usize {
        let mut pool: Vec<TaskId> = tasks
            .originals()
            .filter(|t| t.residency.is_empty())
            .map(|t| t.id)
            .collect();
        rng.shuffle(&mut pool);

        let resources: Vec<ResourceId> = (0..self.resource_count).collect();
        let mut assigned = 0;
        for id in pool.into_iter().take(target) {
            let allowed = self.draw_set(&resources, rng);
            debug!(task = id, ?allowed, "residency");
            tasks.set_residency(id, allowed);
            assigned += 1;
        }

        if assigned < target {
            record(
                warnings,
                Warning::ResidencyShortfall {
                    requested: target,
                    generated: assigned,
                },
            );
        }
        info!(
            assigned,
            resources = self.resource_count,
            multi = self.multi.is_some(),
            "Residency assignment done"
        );
        assigned
    }

    fn draw_set(&self, resources: &[ResourceId], rng: &mut RandomSource) -> BTreeSet<ResourceId> {
        let size = match self.multi {
            None => 1,
            Some(dist) => rng.sample(dist, 1, resources.len() as i64) as usize,
        };
        rng.sample_distinct(resources, size).into_iter().collect()
    }
}

/// Up to `extra` further resources from `0..resource_count` that are not in
/// `current` yet, with the count drawn from `dist`.
pub(crate) fn widen(
    current: &BTreeSet<ResourceId>,
    resource_count: u32,
    dist: Distribution,
    rng: &mut RandomSource,
) -> BTreeSet<ResourceId> {
    let free: Vec<ResourceId> = (0..resource_count)
        .filter(|r| !current.contains(r))
        .collect();
    let extra = rng.sample(dist, 0, free.len() as i64) as usize;
    let mut widened = current.clone();
    widened.extend(rng.sample_distinct(&free, extra));
    widened
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn tasks(n: usize) -> TaskSet {
        TaskSet::new((0..n).map(Task::aperiodic).collect())
    }

    #[test]
    fn single_residency_restricts_to_one_resource() {
        let mut set = tasks(6);
        let mut rng = RandomSource::from_seed(2);
        let mut warnings = Vec::new();
        let n = ResidencyAssigner::single(4).assign(&mut set, 4, &mut rng, &mut warnings);
        assert_eq!(n, 4);
        assert_eq!(set.residency_count(), 4);
        for t in set.iter().filter(|t| !t.residency.is_empty()) {
            assert_eq!(t.residency.len(), 1);
            assert!(t.residency.iter().all(|r| *r < 4));
        }
        assert!(warnings.is_empty());
    }

    #[test]
    fn multi_residency_draws_distinct_resources() {
        let mut set = tasks(10);
        let mut rng = RandomSource::from_seed(5);
        let mut warnings = Vec::new();
        ResidencyAssigner::multi(5, Distribution::Uniform).assign(
            &mut set,
            10,
            &mut rng,
            &mut warnings,
        );
        for t in set.iter() {
            assert!((1..=5).contains(&t.residency.len()));
            assert!(t.residency.iter().all(|r| *r < 5));
        }
    }

    #[test]
    fn exhausted_pool_warns() {
        let mut set = tasks(2);
        let mut rng = RandomSource::from_seed(0);
        let mut warnings = Vec::new();
        let n = ResidencyAssigner::single(3).assign(&mut set, 5, &mut rng, &mut warnings);
        assert_eq!(n, 2);
        assert_eq!(
            warnings,
            vec![Warning::ResidencyShortfall {
                requested: 5,
                generated: 2
            }]
        );
    }

    #[test]
    fn instances_mirror_assigned_residency() {
        let mut set = TaskSet::new(vec![Task::periodic(0, 4)]);
        set.unroll(12, false);
        let mut rng = RandomSource::from_seed(0);
        let mut warnings = Vec::new();
        ResidencyAssigner::single(3).assign(&mut set, 1, &mut rng, &mut warnings);
        let original = set.get(0).residency.clone();
        assert_eq!(original.len(), 1);
        for &inst in &set.get(0).instances {
            assert_eq!(set.get(inst).residency, original);
        }
    }

    #[test]
    fn widen_only_adds_new_resources() {
        let mut rng = RandomSource::from_seed(11);
        let current = BTreeSet::from([2]);
        for _ in 0..20 {
            let widened = widen(&current, 4, Distribution::Uniform, &mut rng);
            assert!(widened.contains(&2));
            assert!(widened.iter().all(|r| *r < 4));
        }
    }
}
