/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Post-solve precedence generation.
//!
//! Given a solved schedule, a relation `a → b` is only added if the schedule
//! already satisfies it, so the schedule stays feasible:
//!
//! | a | b | condition |
//! |---|---|---|
//! | aperiodic | aperiodic | `a` ends before `b` starts |
//! | aperiodic | periodic | `a` overlaps no occurrence of `b`; order taken from `b`'s first occurrence |
//! | periodic | periodic | every occurrence of `a` ends before each occurrence of `b` whose window intersects its own |
//!
//! Every accepted relation points forward in time (its source starts first),
//! so the result is acyclic without an explicit cycle check.

use tracing::{debug, info};

use super::{PrecedenceMap, PrecedenceTarget};
use crate::error::{record, Warning};
use crate::random::RandomSource;
use crate::task::{SolvedTiming, Task, TaskId, TaskSet};

#[derive(Debug, Clone, Copy, Default)]
pub struct PosthocPrecedenceGenerator;

impl PosthocPrecedenceGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Relations between original tasks that the solved schedule satisfies
    /// and that are not present yet.  Tasks without a solution are skipped.
    pub fn orderable_pairs(
        &self,
        tasks: &TaskSet,
        warnings: &mut Vec<Warning>,
    ) -> Vec<(TaskId, TaskId)> {
        let originals: Vec<(&Task, SolvedTiming)> = tasks
            .originals()
            .filter_map(|t| t.solved.map(|s| (t, s)))
            .collect();
        let mut pairs = Vec::new();

        for (i, &(a, sa)) in originals.iter().enumerate() {
            for &(b, sb) in &originals[i + 1..] {
                if tasks.has_edge(a.id, b.id) || tasks.has_edge(b.id, a.id) {
                    continue;
                }
                let order = match (a.periodic, b.periodic) {
                    (false, false) => order_aperiodic((a.id, sa), (b.id, sb)),
                    (false, true) => order_mixed(tasks, (a.id, sa), b, sb),
                    (true, false) => order_mixed(tasks, (b.id, sb), a, sa),
                    (true, true) => order_periodic(tasks, a, b, warnings),
                };
                if let Some(pair) = order {
                    pairs.push(pair);
                }
            }
        }
        debug!(count = pairs.len(), "orderable pairs");
        pairs
    }

    /// Add relations taken from the solved schedule.
    ///
    /// Without a subgraph target, relations are added in random order until
    /// `target.relations` is reached.  With one, each added relation merges
    /// two subgraphs (singletons included) until the number of subgraphs
    /// among the original tasks drops to the target.
    ///
    /// Returns the number of relations added.
    pub fn generate(
        &self,
        tasks: &mut TaskSet,
        map: &mut PrecedenceMap,
        target: PrecedenceTarget,
        rng: &mut RandomSource,
        warnings: &mut Vec<Warning>,
    ) -> usize {
        map.grow(tasks.len());
        let mut pairs = self.orderable_pairs(tasks, warnings);
        rng.shuffle(&mut pairs);

        let originals = tasks.original_ids();
        let mut added = 0;

        match target.subgraphs {
            None => {
                for &(from, to) in pairs.iter().take(target.relations) {
                    tasks.add_edge(from, to);
                    map.union(from, to);
                    added += 1;
                }
                if added < target.relations {
                    record(
                        warnings,
                        Warning::PrecedenceShortfall {
                            requested: target.relations,
                            generated: added,
                        },
                    );
                }
            }
            Some(requested) => {
                let mut count = map.component_count(&originals);
                for &(from, to) in &pairs {
                    if count <= requested {
                        break;
                    }
                    if map.same_set(from, to) {
                        continue;
                    }
                    tasks.add_edge(from, to);
                    map.union(from, to);
                    added += 1;
                    count -= 1;
                }
                if count != requested {
                    record(
                        warnings,
                        Warning::SubgraphShortfall {
                            requested,
                            generated: count,
                        },
                    );
                }
            }
        }

        info!(
            added,
            candidates = pairs.len(),
            "Post-hoc precedence generation done"
        );
        added
    }
}

/// All occurrences of a periodic task: the original first, then its
/// instances.  Unsolved instances are skipped.
fn occurrences(tasks: &TaskSet, task: &Task) -> Vec<SolvedTiming> {
    std::iter::once(task.solved)
        .chain(task.instances.iter().map(|&id| tasks.get(id).solved))
        .flatten()
        .collect()
}

fn order_aperiodic(
    (a, sa): (TaskId, SolvedTiming),
    (b, sb): (TaskId, SolvedTiming),
) -> Option<(TaskId, TaskId)> {
    if sa.precedes(&sb) {
        Some((a, b))
    } else if sb.precedes(&sa) {
        Some((b, a))
    } else {
        None
    }
}

fn order_mixed(
    tasks: &TaskSet,
    (aperiodic, sa): (TaskId, SolvedTiming),
    periodic: &Task,
    first: SolvedTiming,
) -> Option<(TaskId, TaskId)> {
    if occurrences(tasks, periodic).iter().any(|o| o.overlaps(&sa)) {
        return None;
    }
    if sa.precedes(&first) {
        Some((aperiodic, periodic.id))
    } else {
        Some((periodic.id, aperiodic))
    }
}

fn order_periodic(
    tasks: &TaskSet,
    a: &Task,
    b: &Task,
    warnings: &mut Vec<Warning>,
) -> Option<(TaskId, TaskId)> {
    if a.phase == b.phase && a.instances.len() != b.instances.len() {
        record(
            warnings,
            Warning::InstanceMismatch {
                first: a.id,
                second: b.id,
                first_instances: a.instances.len(),
                second_instances: b.instances.len(),
            },
        );
        return None;
    }

    // exactly the occurrence pairs the relation would link
    let holds = |from: TaskId, to: TaskId| {
        tasks
            .linked_occurrences(from, to)
            .into_iter()
            .all(|(x, y)| match (tasks.get(x).solved, tasks.get(y).solved) {
                (Some(sx), Some(sy)) => sx.precedes(&sy),
                _ => true,
            })
    };
    if holds(a.id, b.id) {
        Some((a.id, b.id))
    } else if holds(b.id, a.id) {
        Some((b.id, a.id))
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
