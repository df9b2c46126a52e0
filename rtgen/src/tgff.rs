/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Ingestion of TGFF task-graph text.
//!
//! Only `@TASK_GRAPH` blocks are read; every other `@` block (processor
//! tables, `@HYPERPERIOD` lines, …) is skipped.
//!
//! ```text
//! @TASK_GRAPH 0 {
//!     PERIOD 300
//!     TASK t0_0  TYPE 2
//!     TASK t0_1  TYPE 1
//!     ARC a0_0   FROM t0_0  TO t0_1  TYPE 0
//!     HARD_DEADLINE d0_0 ON t0_1 AT 300
//! }
//! ```
//!
//! Task names are scoped to their graph.  Text that cannot be read safely
//! is a [`TgffError`]; text that is well formed but holds no task graph
//! produces a [`Warning::MissingGraphOutput`].

use thiserror::Error;
use tracing::{debug, info};

use crate::error::{record, Warning};
use crate::task::{Task, TaskSet};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TgffError {
    #[error("line {line}: @{block} block is never closed")]
    Unterminated { block: String, line: usize },

    #[error("line {line}: unexpected '}}'")]
    UnbalancedBrace { line: usize },

    #[error("line {line}: {keyword} expects `{expected}`")]
    Malformed {
        line: usize,
        keyword: String,
        expected: &'static str,
    },

    #[error("line {line}: {value:?} is not a valid number")]
    BadNumber { line: usize, value: String },

    #[error("line {line}: task {name} defined twice in graph {graph}")]
    DuplicateTask {
        line: usize,
        graph: String,
        name: String,
    },

    #[error("line {line}: {name} refers to unknown task {task}")]
    UnknownTask {
        line: usize,
        name: String,
        task: String,
    },

    #[error("task graph {graph} contains a cycle")]
    Cyclic { graph: String },
}

/// One `@TASK_GRAPH` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskGraph {
    pub name: String,
    pub period: Option<u64>,
    /// Task names, in declaration order.  Index = position in the graph.
    pub tasks: Vec<String>,
    /// `(from, to)` by task index.
    pub arcs: Vec<(usize, usize)>,
    /// `(task, deadline)` from `HARD_DEADLINE` lines.
    pub deadlines: Vec<(usize, u64)>,
}

impl TaskGraph {
    fn index_of(&self, line: usize, referrer: &str, task: &str) -> Result<usize, TgffError> {
        self.tasks
            .iter()
            .position(|t| t == task)
            .ok_or_else(|| TgffError::UnknownTask {
                line,
                name: referrer.to_string(),
                task: task.to_string(),
            })
    }
}

enum Block {
    TaskGraph(TaskGraph),
    Other(String),
}

/// Parse every `@TASK_GRAPH` block in `text`.
pub fn parse(text: &str) -> Result<Vec<TaskGraph>, TgffError> {
    let mut graphs = Vec::new();
    let mut open: Option<(Block, usize)> = None;

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }

        if let Some(header) = content.strip_prefix('@') {
            if !content.ends_with('{') {
                // single-line statement such as `@HYPERPERIOD 300`
                continue;
            }
            if let Some((block, start)) = &open {
                return Err(TgffError::Unterminated {
                    block: block_name(block),
                    line: *start,
                });
            }
            let mut words = header.trim_end_matches('{').split_whitespace();
            let kind = words.next().unwrap_or_default();
            let block = if kind == "TASK_GRAPH" {
                Block::TaskGraph(TaskGraph {
                    name: words.next().unwrap_or_default().to_string(),
                    ..Default::default()
                })
            } else {
                Block::Other(kind.to_string())
            };
            open = Some((block, line));
            continue;
        }

        if content == "}" {
            match open.take() {
                Some((Block::TaskGraph(graph), _)) => {
                    debug!(graph = %graph.name, tasks = graph.tasks.len(), "task graph read");
                    graphs.push(graph);
                }
                Some((Block::Other(_), _)) => {}
                None => return Err(TgffError::UnbalancedBrace { line }),
            }
            continue;
        }

        if let Some((Block::TaskGraph(graph), _)) = open.as_mut() {
            statement(graph, line, content)?;
        }
    }

    if let Some((block, start)) = open {
        return Err(TgffError::Unterminated {
            block: block_name(&block),
            line: start,
        });
    }
    info!(graphs = graphs.len(), "Parsed task-graph text");
    Ok(graphs)
}

fn block_name(block: &Block) -> String {
    match block {
        Block::TaskGraph(_) => "TASK_GRAPH".to_string(),
        Block::Other(kind) => kind.clone(),
    }
}

/// One line inside a `@TASK_GRAPH` block.
fn statement(graph: &mut TaskGraph, line: usize, content: &str) -> Result<(), TgffError> {
    let words: Vec<&str> = content.split_whitespace().collect();
    let malformed = |expected: &'static str| TgffError::Malformed {
        line,
        keyword: words[0].to_string(),
        expected,
    };

    match words[0] {
        "PERIOD" => {
            let value = words.get(1).ok_or_else(|| malformed("PERIOD <number>"))?;
            graph.period = Some(number(line, value)?);
        }
        "TASK" => {
            let name = words.get(1).ok_or_else(|| malformed("TASK <name> TYPE <n>"))?;
            if graph.tasks.iter().any(|t| t == name) {
                return Err(TgffError::DuplicateTask {
                    line,
                    graph: graph.name.clone(),
                    name: name.to_string(),
                });
            }
            graph.tasks.push(name.to_string());
        }
        "ARC" => {
            let [_, name, "FROM", from, "TO", to, ..] = words.as_slice() else {
                return Err(malformed("ARC <name> FROM <task> TO <task>"));
            };
            let from = graph.index_of(line, name, from)?;
            let to = graph.index_of(line, name, to)?;
            graph.arcs.push((from, to));
        }
        "HARD_DEADLINE" => {
            let [_, name, "ON", task, "AT", at, ..] = words.as_slice() else {
                return Err(malformed("HARD_DEADLINE <name> ON <task> AT <time>"));
            };
            let task = graph.index_of(line, name, task)?;
            graph.deadlines.push((task, number(line, at)?));
        }
        // SOFT_DEADLINE and tool-specific attributes carry nothing we model
        _ => {}
    }
    Ok(())
}

/// Non-negative number, rounded up when fractional.
fn number(line: usize, value: &str) -> Result<u64, TgffError> {
    let bad = || TgffError::BadNumber {
        line,
        value: value.to_string(),
    };
    if let Ok(n) = value.parse::<u64>() {
        return Ok(n);
    }
    let f: f64 = value.parse().map_err(|_| bad())?;
    if !f.is_finite() || f < 0.0 {
        return Err(bad());
    }
    Ok(f.ceil() as u64)
}

/// Turn parsed graphs into a task set: one original task per TGFF task,
/// periodic with the graph's period when it has one, and one precedence
/// relation per arc.
pub fn apply(graphs: &[TaskGraph], warnings: &mut Vec<Warning>) -> Result<TaskSet, TgffError> {
    if graphs.is_empty() {
        record(
            warnings,
            Warning::MissingGraphOutput {
                detail: "no @TASK_GRAPH block found".to_string(),
            },
        );
    }

    let mut tasks = Vec::new();
    let mut offsets = Vec::with_capacity(graphs.len());
    for graph in graphs {
        if graph.tasks.is_empty() {
            record(
                warnings,
                Warning::MissingGraphOutput {
                    detail: format!("task graph {} has no tasks", graph.name),
                },
            );
            offsets.push(None);
            continue;
        }
        offsets.push(Some(tasks.len()));
        for _ in &graph.tasks {
            tasks.push(match graph.period.filter(|p| *p > 0) {
                Some(period) => Task::periodic(0, period),
                None => Task::aperiodic(0),
            });
        }
    }

    let mut set = TaskSet::new(tasks);
    for (graph, offset) in graphs.iter().zip(offsets) {
        let Some(offset) = offset else {
            continue;
        };
        for &(from, to) in &graph.arcs {
            if from == to {
                return Err(TgffError::Cyclic {
                    graph: graph.name.clone(),
                });
            }
            set.add_edge(offset + from, offset + to);
        }
    }
    if set.topological_order().is_none() {
        let graph = graphs
            .iter()
            .map(|g| g.name.clone())
            .collect::<Vec<_>>()
            .join(",");
        return Err(TgffError::Cyclic { graph });
    }

    info!(
        tasks = set.len(),
        relations = set.relation_count(),
        "Task set built from task graphs"
    );
    Ok(set)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
@HYPERPERIOD 300

@TASK_GRAPH 0 {
    PERIOD 300

    TASK t0_0   TYPE 2
    TASK t0_1   TYPE 1
    TASK t0_2   TYPE 0
    ARC a0_0    FROM t0_0  TO  t0_1 TYPE 0
    ARC a0_1    FROM t0_0  TO  t0_2 TYPE 1
    HARD_DEADLINE d0_0 ON t0_1 AT 250
}

# processor table
@PE 0 {
# type version price
    0 0 1.5
}

@TASK_GRAPH 1 {
    TASK t1_0   TYPE 0
    TASK t1_1   TYPE 0
    ARC a1_0    FROM t1_1  TO  t1_0 TYPE 0
}
";

    #[test]
    fn parses_task_graph_blocks_only() {
        let graphs = parse(SAMPLE).unwrap();
        assert_eq!(graphs.len(), 2);
        assert_eq!(graphs[0].name, "0");
        assert_eq!(graphs[0].period, Some(300));
        assert_eq!(graphs[0].tasks, vec!["t0_0", "t0_1", "t0_2"]);
        assert_eq!(graphs[0].arcs, vec![(0, 1), (0, 2)]);
        assert_eq!(graphs[0].deadlines, vec![(1, 250)]);
        assert_eq!(graphs[1].period, None);
        assert_eq!(graphs[1].arcs, vec![(1, 0)]);
    }

    #[test]
    fn apply_builds_tasks_and_relations() {
        let graphs = parse(SAMPLE).unwrap();
        let mut warnings = Vec::new();
        let set = apply(&graphs, &mut warnings).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(set.len(), 5);
        assert!(set.get(0).periodic);
        assert_eq!(set.get(2).period, 300);
        assert!(!set.get(3).periodic);
        assert!(set.has_edge(0, 1));
        assert!(set.has_edge(0, 2));
        assert!(set.has_edge(4, 3));
        assert_eq!(set.relation_count(), 3);
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let err = parse("@TASK_GRAPH 0 {\n TASK a TYPE 0\n").unwrap_err();
        assert_eq!(
            err,
            TgffError::Unterminated {
                block: "TASK_GRAPH".to_string(),
                line: 1
            }
        );
    }

    #[test]
    fn arc_to_unknown_task_is_an_error() {
        let text = "@TASK_GRAPH 0 {\n TASK a TYPE 0\n ARC x FROM a TO b TYPE 0\n}\n";
        assert!(matches!(
            parse(text),
            Err(TgffError::UnknownTask { line: 3, .. })
        ));
    }

    #[test]
    fn duplicate_task_and_bad_period_are_errors() {
        let dup = "@TASK_GRAPH 0 {\n TASK a TYPE 0\n TASK a TYPE 1\n}\n";
        assert!(matches!(parse(dup), Err(TgffError::DuplicateTask { .. })));

        let bad = "@TASK_GRAPH 0 {\n PERIOD soon\n}\n";
        assert!(matches!(parse(bad), Err(TgffError::BadNumber { line: 2, .. })));
    }

    #[test]
    fn fractional_period_rounds_up() {
        let graphs = parse("@TASK_GRAPH 0 {\n PERIOD 12.5\n TASK a TYPE 0\n}\n").unwrap();
        assert_eq!(graphs[0].period, Some(13));
    }

    #[test]
    fn missing_output_is_a_warning() {
        let mut warnings = Vec::new();
        let graphs = parse("@HYPERPERIOD 10\n").unwrap();
        let set = apply(&graphs, &mut warnings).unwrap();
        assert!(set.is_empty());
        assert!(matches!(
            warnings.as_slice(),
            [Warning::MissingGraphOutput { .. }]
        ));

        let mut warnings = Vec::new();
        let graphs = parse("@TASK_GRAPH 3 {\n PERIOD 5\n}\n").unwrap();
        apply(&graphs, &mut warnings).unwrap();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn cyclic_graph_is_rejected() {
        let text = "@TASK_GRAPH 0 {\n TASK a TYPE 0\n TASK b TYPE 0\n \
                    ARC x FROM a TO b TYPE 0\n ARC y FROM b TO a TYPE 0\n}\n";
        let graphs = parse(text).unwrap();
        let mut warnings = Vec::new();
        assert!(matches!(
            apply(&graphs, &mut warnings),
            Err(TgffError::Cyclic { .. })
        ));
    }
}
