/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pre-solve precedence generation.
//!
//! Edges are added one at a time.  Each round recomputes the candidate set:
//!
//! 1. ordered pairs `(i, j)` of original tasks with no relation yet;
//! 2. pairs in different subgraphs are always acyclic; pairs in the same
//!    subgraph are kept only if a DFS with the edge added finds no cycle;
//! 3. pairs whose new longest chain would exceed the depth limit (the
//!    shortest period: every task needs at least one time unit) are dropped;
//! 4. in subgraph mode, pairs must touch a seed subgraph and may not merge
//!    two distinct seeds or two distinct non-trivial subgraphs.
//!
//! One surviving candidate is drawn uniformly and committed.

use std::collections::BTreeSet;

use tracing::{debug, info};

use super::graph::{chain_lengths, would_create_cycle};
use super::{PrecedenceMap, PrecedenceTarget};
use crate::error::{record, Warning};
use crate::random::RandomSource;
use crate::task::{TaskId, TaskSet};

#[derive(Debug, Clone, Default)]
pub struct PrecedenceGenerator {
    /// Maximum chain length, in tasks.  `None` means unbounded.
    depth_limit: Option<usize>,
}

impl PrecedenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound chain length by the shortest period among the periodic tasks.
    /// Sets without periodic tasks stay unbounded.
    pub fn for_tasks(tasks: &TaskSet) -> Self {
        let depth_limit = tasks
            .originals()
            .filter(|t| t.periodic && t.period > 0)
            .map(|t| t.period as usize)
            .min();
        Self { depth_limit }
    }

    pub fn depth_limit(&self) -> Option<usize> {
        self.depth_limit
    }

    /// Add relations to `tasks` until `target` is met or no candidate is left.
    ///
    /// Returns the number of relations added.  Shortfalls are recorded in
    /// `warnings`.
    pub fn generate(
        &self,
        tasks: &mut TaskSet,
        map: &mut PrecedenceMap,
        target: PrecedenceTarget,
        rng: &mut RandomSource,
        warnings: &mut Vec<Warning>,
    ) -> usize {
        map.grow(tasks.len());
        let originals = tasks.original_ids();

        let seeds: Option<Vec<TaskId>> = target.subgraphs.map(|k| {
            let pool: Vec<TaskId> = originals
                .iter()
                .copied()
                .filter(|&id| map.is_trivial(id))
                .collect();
            rng.sample_distinct(&pool, k)
        });
        let wanted = match &seeds {
            Some(seeds) => target.relations.max(seeds.len()),
            None => target.relations,
        };

        info!(
            relations = target.relations,
            subgraphs = ?target.subgraphs,
            depth_limit = ?self.depth_limit,
            "Generating precedence relations"
        );

        let mut added = 0;
        while added < wanted {
            let candidates = self.candidates(tasks, map, &originals, seeds.as_deref());
            let Some(&(from, to)) = rng.choose(&candidates) else {
                break;
            };
            debug!(from, to, candidates = candidates.len(), "adding relation");
            tasks.add_edge(from, to);
            map.union(from, to);
            added += 1;
        }

        if added < wanted {
            record(
                warnings,
                Warning::PrecedenceShortfall {
                    requested: wanted,
                    generated: added,
                },
            );
        }
        if let Some(requested) = target.subgraphs {
            let generated = map.subgraph_count(&originals);
            if generated != requested {
                record(
                    warnings,
                    Warning::SubgraphShortfall {
                        requested,
                        generated,
                    },
                );
            }
        }

        info!(added, total = tasks.relation_count(), "Precedence generation done");
        added
    }

    /// Every edge that can be added right now.
    pub fn candidates(
        &self,
        tasks: &TaskSet,
        map: &PrecedenceMap,
        originals: &[TaskId],
        seeds: Option<&[TaskId]>,
    ) -> Vec<(TaskId, TaskId)> {
        let depth_in = chain_lengths(tasks, false);
        let height_out = chain_lengths(tasks, true);

        let seed_roots: Option<BTreeSet<TaskId>> =
            seeds.map(|s| s.iter().map(|&id| map.root(id)).collect());
        // while some seed is still alone, only grow those seeds
        let lonely_seed_roots: Option<BTreeSet<TaskId>> = seeds.and_then(|s| {
            let lonely: BTreeSet<TaskId> = s
                .iter()
                .filter(|&&id| map.is_trivial(id))
                .map(|&id| map.root(id))
                .collect();
            (!lonely.is_empty()).then_some(lonely)
        });

        let mut out = Vec::new();
        for &from in originals {
            for &to in originals {
                if from == to || tasks.has_edge(from, to) || tasks.has_edge(to, from) {
                    continue;
                }
                let (root_from, root_to) = (map.root(from), map.root(to));

                if let Some(seed_roots) = &seed_roots {
                    let focus = lonely_seed_roots.as_ref().unwrap_or(seed_roots);
                    if !focus.contains(&root_from) && !focus.contains(&root_to) {
                        continue;
                    }
                    let merges_seeds =
                        seed_roots.contains(&root_from) && seed_roots.contains(&root_to);
                    let merges_subgraphs = !map.is_trivial(from) && !map.is_trivial(to);
                    if root_from != root_to && (merges_seeds || merges_subgraphs) {
                        continue;
                    }
                }

                if let Some(limit) = self.depth_limit {
                    if depth_in[from] + height_out[to] > limit {
                        continue;
                    }
                }

                if root_from == root_to && would_create_cycle(tasks, from, to) {
                    continue;
                }
                out.push((from, to));
            }
        }
        out
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precedence::graph::has_cycle;
    use crate::task::Task;

    fn free_tasks(n: usize) -> TaskSet {
        TaskSet::new((0..n).map(Task::aperiodic).collect())
    }

    fn run(
        tasks: &mut TaskSet,
        generator: &PrecedenceGenerator,
        target: PrecedenceTarget,
        seed: u64,
    ) -> (usize, Vec<Warning>, PrecedenceMap) {
        let mut map = PrecedenceMap::new(tasks.len());
        let mut rng = RandomSource::from_seed(seed);
        let mut warnings = Vec::new();
        let added = generator.generate(tasks, &mut map, target, &mut rng, &mut warnings);
        (added, warnings, map)
    }

    #[test]
    fn five_relations_among_four_free_tasks() {
        for seed in 0..20 {
            let mut tasks = free_tasks(4);
            let target = PrecedenceTarget {
                relations: 5,
                subgraphs: None,
            };
            let (added, warnings, _) = run(&mut tasks, &PrecedenceGenerator::new(), target, seed);
            assert_eq!(added, 5);
            assert!(warnings.is_empty(), "{warnings:?}");
            assert_eq!(tasks.relation_count(), 5);
            assert!(tasks.topological_order().is_some());
            assert!(tasks.relations_are_symmetric());
        }
    }

    #[test]
    fn asking_for_too_many_relations_warns_with_shortfall() {
        let mut tasks = free_tasks(3);
        let target = PrecedenceTarget {
            relations: 5,
            subgraphs: None,
        };
        let (added, warnings, _) = run(&mut tasks, &PrecedenceGenerator::new(), target, 1);
        // 3 tasks admit at most 3 acyclic relations
        assert_eq!(added, 3);
        assert_eq!(
            warnings,
            vec![Warning::PrecedenceShortfall {
                requested: 5,
                generated: 3
            }]
        );
        assert!(!has_cycle(&tasks));
    }

    #[test]
    fn generated_graphs_are_acyclic_and_connected_sets_agree() {
        for seed in 0..10 {
            let mut tasks = free_tasks(10);
            let target = PrecedenceTarget {
                relations: 15,
                subgraphs: None,
            };
            let (_, _, map) = run(&mut tasks, &PrecedenceGenerator::new(), target, seed);
            assert!(tasks.topological_order().is_some());
            for task in tasks.iter() {
                for &succ in &task.successors {
                    assert!(map.same_set(task.id, succ));
                }
            }
        }
    }

    #[test]
    fn depth_limit_bounds_chain_length() {
        let mut tasks = TaskSet::new((0..8).map(|i| Task::periodic(i, 3)).collect());
        let generator = PrecedenceGenerator::for_tasks(&tasks);
        assert_eq!(generator.depth_limit(), Some(3));
        let target = PrecedenceTarget {
            relations: 12,
            subgraphs: None,
        };
        run(&mut tasks, &generator, target, 4);
        let longest = chain_lengths(&tasks, true).into_iter().max().unwrap();
        assert!(longest <= 3, "chain of {longest} tasks");
    }

    #[test]
    fn subgraph_mode_builds_requested_number_of_subgraphs() {
        for seed in 0..10 {
            let mut tasks = free_tasks(12);
            let target = PrecedenceTarget {
                relations: 6,
                subgraphs: Some(3),
            };
            let (_, warnings, map) = run(&mut tasks, &PrecedenceGenerator::new(), target, seed);
            let originals = tasks.original_ids();
            assert_eq!(map.subgraph_count(&originals), 3, "seed {seed}: {warnings:?}");
            assert!(warnings.is_empty());
            assert!(!has_cycle(&tasks));
        }
    }

    #[test]
    fn existing_relations_are_kept_and_respected() {
        let mut tasks = free_tasks(3);
        tasks.add_edge(0, 1);
        tasks.add_edge(1, 2);
        let mut map = PrecedenceMap::from_tasks(&tasks);
        let generator = PrecedenceGenerator::new();
        let cands = generator.candidates(&tasks, &map, &[0, 1, 2], None);
        assert_eq!(cands, vec![(0, 2)]);

        let mut rng = RandomSource::from_seed(0);
        let mut warnings = Vec::new();
        let target = PrecedenceTarget {
            relations: 1,
            subgraphs: None,
        };
        generator.generate(&mut tasks, &mut map, target, &mut rng, &mut warnings);
        assert!(tasks.has_edge(0, 2));
        assert!(warnings.is_empty());
    }
}
