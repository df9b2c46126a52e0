/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Precedence graph generation.
//!
//! * [`PrecedenceMap`] – disjoint sets over task ids; two tasks share a set iff
//!   they are connected (in either direction) through precedence relations.
//! * [`graph`] – explicit-stack DFS helpers: cycle checks and chain lengths.
//! * [`generator`] – pre-solve generation, edge by edge.
//! * [`posthoc`] – post-solve generation from a known feasible schedule.

pub mod generator;
pub mod graph;
pub mod posthoc;

use std::collections::BTreeSet;

use crate::task::{TaskId, TaskSet};

pub use generator::PrecedenceGenerator;
pub use posthoc::PosthocPrecedenceGenerator;

// ── Targets ───────────────────────────────────────────────────────────────────

/// What a generator should aim for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrecedenceTarget {
    /// Number of relations to add.
    pub relations: usize,
    /// Number of subgraphs to aim for instead of (pre-solve: in addition to)
    /// a plain relation count.
    pub subgraphs: Option<usize>,
}

// ── PrecedenceMap ─────────────────────────────────────────────────────────────

/// Union-find over task ids with path compression and union by size.
///
/// Each set is one precedence-connected subgraph.  A task with no relations is
/// alone in its set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecedenceMap {
    parent: Vec<TaskId>,
    size: Vec<usize>,
}

impl PrecedenceMap {
    /// `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
        }
    }

    /// Build the sets induced by the relations already present in `tasks`.
    pub fn from_tasks(tasks: &TaskSet) -> Self {
        let mut map = Self::new(tasks.len());
        for task in tasks.iter() {
            for &succ in &task.successors {
                map.union(task.id, succ);
            }
        }
        map
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Add singleton sets until the map covers `n` ids.
    pub fn grow(&mut self, n: usize) {
        for id in self.parent.len()..n {
            self.parent.push(id);
            self.size.push(1);
        }
    }

    /// Representative of `id`'s set, compressing the path on the way.
    pub fn find(&mut self, id: TaskId) -> TaskId {
        let mut root = id;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = id;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    /// Representative without compression, for shared borrows.
    pub fn root(&self, id: TaskId) -> TaskId {
        let mut root = id;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        root
    }

    /// Merge the sets of `a` and `b`.  Returns `false` if they were already
    /// one set.
    pub fn union(&mut self, a: TaskId, b: TaskId) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        let (big, small) = if self.size[ra] >= self.size[rb] {
            (ra, rb)
        } else {
            (rb, ra)
        };
        self.parent[small] = big;
        self.size[big] += self.size[small];
        true
    }

    pub fn same_set(&self, a: TaskId, b: TaskId) -> bool {
        self.root(a) == self.root(b)
    }

    /// Number of tasks connected to `id`, itself included.
    pub fn set_size(&self, id: TaskId) -> usize {
        self.size[self.root(id)]
    }

    /// `true` if `id` has no precedence-connected partner.
    pub fn is_trivial(&self, id: TaskId) -> bool {
        self.set_size(id) == 1
    }

    /// Every task in `id`'s set, in id order.
    pub fn members(&self, id: TaskId) -> Vec<TaskId> {
        let root = self.root(id);
        (0..self.parent.len())
            .filter(|&x| self.root(x) == root)
            .collect()
    }

    /// Number of distinct sets among `ids`.
    pub fn component_count(&self, ids: &[TaskId]) -> usize {
        ids.iter()
            .map(|&id| self.root(id))
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Number of distinct sets among `ids` with more than one member.
    pub fn subgraph_count(&self, ids: &[TaskId]) -> usize {
        ids.iter()
            .filter(|&&id| !self.is_trivial(id))
            .map(|&id| self.root(id))
            .collect::<BTreeSet<_>>()
            .len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
