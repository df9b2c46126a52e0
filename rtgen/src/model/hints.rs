/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Initial value guesses handed to the solver.
//!
//! Hints are independent draws and may contradict each other or the
//! constraints; repairing them is the solver's job.

use tracing::debug;

use super::domain::TaskDomain;
use super::{DynamicValues, SolverBackend, VariableBundle};
use crate::config::GenerationConfig;
use crate::precedence::graph::subgraph_heights;
use crate::precedence::PrecedenceMap;
use crate::random::RandomSource;
use crate::task::{ResourceId, TaskSet};

/// The values that were hinted, indexed by task id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hints {
    pub wcet: Vec<i64>,
    pub resource: Vec<ResourceId>,
    pub dynamic: DynamicValues,
}

#[derive(Debug, Clone)]
pub struct HintGenerator<'a> {
    config: &'a GenerationConfig,
    horizon: i64,
}

impl<'a> HintGenerator<'a> {
    pub fn new(config: &'a GenerationConfig, horizon: u64) -> Self {
        Self {
            config,
            horizon: horizon as i64,
        }
    }

    /// Draw and post hints for every task's wcet and resource and for the
    /// dynamic bounds.  Instances repeat their original's hints.
    pub fn generate<S: SolverBackend>(
        &self,
        tasks: &TaskSet,
        domains: &[TaskDomain],
        map: &PrecedenceMap,
        bundle: &VariableBundle,
        solver: &mut S,
        rng: &mut RandomSource,
    ) -> Hints {
        let mut map = map.clone();
        map.grow(tasks.len());
        let heights = subgraph_heights(tasks, &map);
        let originals = tasks.originals().count().max(1) as i64;

        let mut wcet = vec![1; tasks.len()];
        let mut resource = vec![0; tasks.len()];
        for task in tasks.originals() {
            let id = task.id;
            let upper = if task.periodic && task.period > 0 {
                let height = if map.is_trivial(id) { 1 } else { heights[id] };
                task.period as i64 / height.max(1) as i64
            } else {
                self.horizon / originals
            };
            let bounds = domains[id].wcet;
            let hi = bounds.clamp(upper);
            wcet[id] = rng.sample(self.config.wcet_distribution, bounds.lo, hi);

            let allowed: Vec<ResourceId> = if task.residency.is_empty() {
                (0..self.config.resource_count).collect()
            } else {
                task.residency.iter().copied().collect()
            };
            let pick = rng.sample(self.config.resource_distribution, 0, allowed.len() as i64 - 1);
            resource[id] = allowed[pick as usize];
        }
        for task in tasks.iter() {
            if let Some(inst) = task.instance_of {
                wcet[task.id] = wcet[inst.original];
                resource[task.id] = resource[inst.original];
            }
        }

        for (vars, (&w, &r)) in bundle.tasks.iter().zip(wcet.iter().zip(&resource)) {
            solver.add_hint(vars.wcet, w);
            solver.add_hint(vars.resource, r as i64);
        }

        let dynamic = self.dynamic(rng);
        let d = &bundle.dynamic;
        for (var, value) in [
            (d.min_release_time, dynamic.min_release_time),
            (d.max_release_time, dynamic.max_release_time),
            (d.min_deadline, dynamic.min_deadline),
            (d.max_deadline, dynamic.max_deadline),
            (d.min_exec_time, dynamic.min_exec_time),
            (d.max_exec_time, dynamic.max_exec_time),
        ] {
            solver.add_hint(var, value);
        }
        debug!(?dynamic, "hints posted");

        Hints {
            wcet,
            resource,
            dynamic,
        }
    }

    fn dynamic(&self, rng: &mut RandomSource) -> DynamicValues {
        let c = self.config;
        let h = self.horizon;
        let (min_release_time, max_release_time) =
            self.ordered_pair(c.min_release_time, c.max_release_time, 0, h - 1, rng);
        let (min_deadline, max_deadline) =
            self.ordered_pair(c.min_deadline, c.max_deadline, 1, h, rng);
        let (min_exec_time, max_exec_time) =
            self.ordered_pair(c.min_exec_time, c.max_exec_time, 1, h, rng);
        DynamicValues {
            min_release_time,
            max_release_time,
            min_deadline,
            max_deadline,
            min_exec_time,
            max_exec_time,
        }
    }

    /// `(min, max)` with `min ≤ max`; user-fixed values are kept.
    fn ordered_pair(
        &self,
        min: Option<i64>,
        max: Option<i64>,
        lo: i64,
        hi: i64,
        rng: &mut RandomSource,
    ) -> (i64, i64) {
        let dist = self.config.dynamic_distribution;
        match (min, max) {
            (Some(a), Some(b)) => (a, b),
            (Some(a), None) => (a, rng.sample(dist, a.max(lo), hi)),
            (None, Some(b)) => (rng.sample(dist, lo, b.min(hi)), b),
            (None, None) => {
                let x = rng.sample(dist, lo, hi);
                let y = rng.sample(dist, lo, hi);
                (x.min(y), x.max(y))
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
