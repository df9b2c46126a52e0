/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Post-solve residency derived from a solved schedule.
//!
//! Each picked task is pinned to the resource it actually ran on, so the
//! schedule that was found stays a witness of feasibility.  Afterwards the
//! resources that carried no task at all are dropped and the survivors are
//! renumbered densely into `0..k`.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use super::widen;
use crate::error::{record, Warning};
use crate::random::{Distribution, RandomSource};
use crate::task::{ResourceId, TaskId, TaskSet};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PosthocResidencyAssigner {
    resource_count: u32,
    multi: Option<Distribution>,
}

/// Outcome of a post-hoc residency pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosthocResidency {
    pub assigned: usize,
    /// Resource count after renumbering.
    pub resource_count: u32,
    /// Old id → new id for every surviving resource.
    pub renumbering: BTreeMap<ResourceId, ResourceId>,
}

impl PosthocResidencyAssigner {
    pub fn single(resource_count: u32) -> Self {
        Self {
            resource_count,
            multi: None,
        }
    }

    pub fn multi(resource_count: u32, extra_distribution: Distribution) -> Self {
        Self {
            resource_count,
            multi: Some(extra_distribution),
        }
    }

    /// Resource id → original tasks scheduled on it.
    pub fn occupancy(tasks: &TaskSet) -> BTreeMap<ResourceId, Vec<TaskId>> {
        let mut by_resource: BTreeMap<ResourceId, Vec<TaskId>> = BTreeMap::new();
        for task in tasks.originals() {
            if let Some(solved) = task.solved {
                by_resource.entry(solved.resource).or_default().push(task.id);
            }
        }
        by_resource
    }

    pub fn assign(
        &self,
        tasks: &mut TaskSet,
        target: usize,
        rng: &mut RandomSource,
        warnings: &mut Vec<Warning>,
    ) -> PosthocResidency {
        let occupancy = Self::occupancy(tasks);
        let mut pool: Vec<(TaskId, ResourceId)> = occupancy
            .iter()
            .flat_map(|(&r, ids)| ids.iter().map(move |&id| (id, r)))
            .filter(|&(id, _)| tasks.get(id).residency.is_empty())
            .collect();
        rng.shuffle(&mut pool);

        let mut picked = Vec::new();
        for (id, resource) in pool.into_iter().take(target) {
            debug!(task = id, resource, "pinning to scheduled resource");
            tasks.set_residency(id, BTreeSet::from([resource]));
            picked.push(id);
        }
        if picked.len() < target {
            record(
                warnings,
                Warning::ResidencyShortfall {
                    requested: target,
                    generated: picked.len(),
                },
            );
        }

        let renumbering = renumber(tasks);
        let resource_count = renumbering.len() as u32;

        if let Some(dist) = self.multi {
            for &id in &picked {
                let widened = widen(&tasks.get(id).residency, resource_count, dist, rng);
                tasks.set_residency(id, widened);
            }
        }

        info!(
            assigned = picked.len(),
            resources_before = self.resource_count,
            resources_after = resource_count,
            "Post-hoc residency done"
        );
        PosthocResidency {
            assigned: picked.len(),
            resource_count,
            renumbering,
        }
    }
}

/// Drop every resource no task was scheduled on and renumber the rest into
/// `0..k`, preserving order.  Applied to solved resources and residency sets
/// of every task, instances included.
fn renumber(tasks: &mut TaskSet) -> BTreeMap<ResourceId, ResourceId> {
    let used: BTreeSet<ResourceId> = tasks
        .iter()
        .filter_map(|t| t.solved.map(|s| s.resource))
        .collect();
    let mapping: BTreeMap<ResourceId, ResourceId> = used
        .into_iter()
        .enumerate()
        .map(|(new, old)| (old, new as ResourceId))
        .collect();

    for task in tasks.iter_mut() {
        if let Some(solved) = task.solved.as_mut() {
            solved.resource = mapping[&solved.resource];
        }
        task.residency = task
            .residency
            .iter()
            .filter_map(|r| mapping.get(r).copied())
            .collect();
    }
    mapping
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{SolvedTiming, Task};

    fn on_resource(resources: &[ResourceId]) -> TaskSet {
        let mut set = TaskSet::new(resources.iter().map(|_| Task::aperiodic(0)).collect());
        for (id, &resource) in resources.iter().enumerate() {
            let start = id as i64 * 2;
            set.get_mut(id).solved = Some(SolvedTiming {
                start,
                end: start + 1,
                wcet: 1,
                resource,
            });
        }
        set
    }

    #[test]
    fn three_used_of_ten_renumber_densely() {
        let mut set = on_resource(&[7, 2, 7, 9, 2, 9]);
        let mut rng = RandomSource::from_seed(1);
        let mut warnings = Vec::new();
        let out = PosthocResidencyAssigner::single(10).assign(&mut set, 6, &mut rng, &mut warnings);

        assert_eq!(out.resource_count, 3);
        assert_eq!(out.renumbering, BTreeMap::from([(2, 0), (7, 1), (9, 2)]));
        let used: BTreeSet<ResourceId> = set.iter().flat_map(|t| t.residency.clone()).collect();
        assert_eq!(used, BTreeSet::from([0, 1, 2]));
        assert!(warnings.is_empty());
    }

    #[test]
    fn residency_matches_scheduled_resource() {
        let mut set = on_resource(&[4, 1, 4, 3]);
        let mut rng = RandomSource::from_seed(6);
        let mut warnings = Vec::new();
        PosthocResidencyAssigner::single(5).assign(&mut set, 2, &mut rng, &mut warnings);

        assert_eq!(set.residency_count(), 2);
        for task in set.iter().filter(|t| !t.residency.is_empty()) {
            let solved = task.solved.map(|s| s.resource);
            assert_eq!(task.residency.iter().next().copied(), solved);
        }
    }

    #[test]
    fn exhausted_tasks_warn() {
        let mut set = on_resource(&[0, 1]);
        let mut rng = RandomSource::from_seed(0);
        let mut warnings = Vec::new();
        let out = PosthocResidencyAssigner::single(2).assign(&mut set, 3, &mut rng, &mut warnings);
        assert_eq!(out.assigned, 2);
        assert!(matches!(
            warnings.as_slice(),
            [Warning::ResidencyShortfall {
                requested: 3,
                generated: 2
            }]
        ));
    }

    #[test]
    fn instances_follow_their_original() {
        let mut set = TaskSet::new(vec![Task::periodic(0, 5)]);
        set.unroll(15, false);
        let ids: Vec<TaskId> = set.iter().map(|t| t.id).collect();
        for id in ids {
            let start = set.get(id).window_start(false);
            set.get_mut(id).solved = Some(SolvedTiming {
                start,
                end: start + 2,
                wcet: 2,
                resource: 6,
            });
        }
        let mut rng = RandomSource::from_seed(0);
        let mut warnings = Vec::new();
        PosthocResidencyAssigner::single(8).assign(&mut set, 1, &mut rng, &mut warnings);

        for task in set.iter() {
            assert_eq!(task.residency, BTreeSet::from([0]));
            assert_eq!(task.solved.map(|s| s.resource), Some(0));
        }
    }

    #[test]
    fn multi_residency_keeps_scheduled_resource() {
        let mut set = on_resource(&[0, 1, 2, 3, 0, 1]);
        let mut rng = RandomSource::from_seed(8);
        let mut warnings = Vec::new();
        PosthocResidencyAssigner::multi(4, Distribution::Uniform).assign(
            &mut set,
            6,
            &mut rng,
            &mut warnings,
        );
        for task in set.iter() {
            let scheduled = task.solved.map(|s| s.resource).unwrap();
            assert!(task.residency.contains(&scheduled));
            assert!(task.residency.iter().all(|r| *r < 4));
        }
    }
}
