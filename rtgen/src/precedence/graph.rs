/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Depth-first traversals over the precedence graph.
//!
//! All traversals keep their own stack, so graph size is bounded by memory
//! rather than by the call stack.

use crate::task::{TaskId, TaskSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// Three-colour DFS from `start`.  Returns `true` on reaching a task that is
/// still on the stack (a back edge, i.e. a cycle).
fn finds_back_edge(
    len: usize,
    start: TaskId,
    marks: &mut [Mark],
    successors: &impl Fn(TaskId) -> Vec<TaskId>,
) -> bool {
    debug_assert_eq!(marks.len(), len);
    if marks[start] != Mark::Unvisited {
        return false;
    }

    let mut stack: Vec<(TaskId, Vec<TaskId>, usize)> = vec![(start, successors(start), 0)];
    marks[start] = Mark::OnStack;

    while let Some((node, children, next)) = stack.last_mut() {
        if let Some(&child) = children.get(*next) {
            *next += 1;
            match marks[child] {
                Mark::OnStack => return true,
                Mark::Done => {}
                Mark::Unvisited => {
                    marks[child] = Mark::OnStack;
                    stack.push((child, successors(child), 0));
                }
            }
        } else {
            marks[*node] = Mark::Done;
            stack.pop();
        }
    }
    false
}

/// `true` if adding `from → to` would close a directed cycle.
///
/// Runs the three-colour DFS from `from` over the graph with the edge
/// temporarily added.
pub fn would_create_cycle(tasks: &TaskSet, from: TaskId, to: TaskId) -> bool {
    if from == to {
        return true;
    }
    let successors = |id: TaskId| -> Vec<TaskId> {
        let mut next: Vec<TaskId> = tasks.get(id).successors.iter().copied().collect();
        if id == from {
            next.push(to);
        }
        next
    };
    let mut marks = vec![Mark::Unvisited; tasks.len()];
    finds_back_edge(tasks.len(), from, &mut marks, &successors)
}

/// `true` if the precedence graph contains a directed cycle.
pub fn has_cycle(tasks: &TaskSet) -> bool {
    let successors =
        |id: TaskId| -> Vec<TaskId> { tasks.get(id).successors.iter().copied().collect() };
    let mut marks = vec![Mark::Unvisited; tasks.len()];
    (0..tasks.len()).any(|id| finds_back_edge(tasks.len(), id, &mut marks, &successors))
}

/// Longest chain, counted in tasks, that starts at each task (`forward`) or
/// ends at each task (`!forward`).  An isolated task has length 1.
///
/// The graph must be acyclic.
pub fn chain_lengths(tasks: &TaskSet, forward: bool) -> Vec<usize> {
    let next = |id: TaskId| -> Vec<TaskId> {
        let task = tasks.get(id);
        if forward {
            task.successors.iter().copied().collect()
        } else {
            task.predecessors.iter().copied().collect()
        }
    };

    let mut length = vec![0usize; tasks.len()];
    for start in 0..tasks.len() {
        if length[start] != 0 {
            continue;
        }
        // post-order: a task's length is known once all of its children are
        let mut stack: Vec<(TaskId, Vec<TaskId>, usize)> = vec![(start, next(start), 0)];
        while let Some((node, children, i)) = stack.last_mut() {
            if let Some(&child) = children.get(*i) {
                *i += 1;
                if length[child] == 0 {
                    stack.push((child, next(child), 0));
                }
            } else {
                let best = children.iter().map(|&c| length[c]).max().unwrap_or(0);
                length[*node] = best + 1;
                stack.pop();
            }
        }
    }
    length
}

/// Number of tasks on the longest chain inside the subgraph containing each
/// task.  Isolated tasks have height 1.
pub fn subgraph_heights(tasks: &TaskSet, map: &super::PrecedenceMap) -> Vec<usize> {
    let height = chain_lengths(tasks, true);
    let mut best = vec![0usize; tasks.len()];
    for id in 0..tasks.len() {
        let root = map.root(id);
        best[root] = best[root].max(height[id]);
    }
    (0..tasks.len()).map(|id| best[map.root(id)]).collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precedence::PrecedenceMap;
    use crate::task::Task;

    fn chain(n: usize) -> TaskSet {
        let mut tasks = TaskSet::new((0..n).map(Task::aperiodic).collect());
        for i in 1..n {
            tasks.add_edge(i - 1, i);
        }
        tasks
    }

    #[test]
    fn closing_a_chain_is_a_cycle() {
        let tasks = chain(4);
        assert!(would_create_cycle(&tasks, 3, 0));
        assert!(would_create_cycle(&tasks, 2, 1));
        assert!(!would_create_cycle(&tasks, 0, 3));
        assert!(would_create_cycle(&tasks, 1, 1));
    }

    #[test]
    fn unrelated_tasks_never_cycle() {
        let tasks = TaskSet::new((0..3).map(Task::aperiodic).collect());
        assert!(!would_create_cycle(&tasks, 0, 1));
        assert!(!would_create_cycle(&tasks, 1, 0));
    }

    #[test]
    fn has_cycle_detects_back_edge() {
        let mut tasks = chain(3);
        assert!(!has_cycle(&tasks));
        tasks.add_edge(2, 0);
        assert!(has_cycle(&tasks));
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let mut tasks = TaskSet::new((0..4).map(Task::aperiodic).collect());
        tasks.add_edge(0, 1);
        tasks.add_edge(0, 2);
        tasks.add_edge(1, 3);
        tasks.add_edge(2, 3);
        assert!(!has_cycle(&tasks));
        assert!(!would_create_cycle(&tasks, 1, 2));
        assert!(would_create_cycle(&tasks, 3, 0));
    }

    #[test]
    fn chain_lengths_both_directions() {
        // 0 → 1 → 2, plus isolated 3
        let mut tasks = TaskSet::new((0..4).map(Task::aperiodic).collect());
        tasks.add_edge(0, 1);
        tasks.add_edge(1, 2);
        assert_eq!(chain_lengths(&tasks, true), vec![3, 2, 1, 1]);
        assert_eq!(chain_lengths(&tasks, false), vec![1, 2, 3, 1]);
    }

    #[test]
    fn subgraph_height_is_shared_by_members() {
        let mut tasks = TaskSet::new((0..5).map(Task::aperiodic).collect());
        tasks.add_edge(0, 1);
        tasks.add_edge(1, 2);
        tasks.add_edge(3, 2);
        let map = PrecedenceMap::from_tasks(&tasks);
        let heights = subgraph_heights(&tasks, &map);
        assert_eq!(&heights[0..4], &[3, 3, 3, 3]);
        assert_eq!(heights[4], 1);
    }
}
