/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Reads a solved schedule back into the task set.

use tracing::{debug, warn};

use super::{DynamicValues, SolverBackend, VariableBundle};
use crate::task::{ResourceId, SolvedTiming, TaskSet};

#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleReader;

impl ScheduleReader {
    /// Copy solution `solution` into `task.solved` for every task and return
    /// the dynamic bounds chosen by the solver.
    ///
    /// Returns `None`, leaving `tasks` untouched, if any value is missing.
    pub fn read<S: SolverBackend>(
        solver: &S,
        bundle: &VariableBundle,
        tasks: &mut TaskSet,
        solution: usize,
    ) -> Option<DynamicValues> {
        let value = |var| solver.value(var, solution);

        let mut timings = Vec::with_capacity(bundle.tasks.len());
        for (id, vars) in bundle.tasks.iter().enumerate() {
            let resource = value(vars.resource).and_then(|r| ResourceId::try_from(r).ok());
            let timing = match (value(vars.start), value(vars.end), value(vars.wcet), resource) {
                (Some(start), Some(end), Some(wcet), Some(resource)) => SolvedTiming {
                    start,
                    end,
                    wcet,
                    resource,
                },
                _ => {
                    warn!(task = id, solution, "solution has no value for task");
                    return None;
                }
            };
            timings.push(timing);
        }

        let d = &bundle.dynamic;
        let dynamic = DynamicValues {
            min_release_time: value(d.min_release_time)?,
            max_release_time: value(d.max_release_time)?,
            min_deadline: value(d.min_deadline)?,
            max_deadline: value(d.max_deadline)?,
            min_exec_time: value(d.min_exec_time)?,
            max_exec_time: value(d.max_exec_time)?,
        };

        for (task, timing) in tasks.iter_mut().zip(timings) {
            task.solved = Some(timing);
        }
        debug!(solution, ?dynamic, "schedule read");
        Some(dynamic)
    }

    /// Smallest and largest release time, deadline and execution time over
    /// the solved originals.  `None` if no original has been solved.
    pub fn observed_bounds(tasks: &TaskSet, phased: bool) -> Option<DynamicValues> {
        let mut solved = tasks
            .originals()
            .filter_map(|t| {
                let s = t.solved?;
                let w0 = t.window_start(phased);
                Some((s.start - w0, s.end - w0, s.wcet))
            })
            .peekable();
        let &(rel, dl, exec) = solved.peek()?;
        let mut out = DynamicValues {
            min_release_time: rel,
            max_release_time: rel,
            min_deadline: dl,
            max_deadline: dl,
            min_exec_time: exec,
            max_exec_time: exec,
        };
        for (rel, dl, exec) in solved {
            out.min_release_time = out.min_release_time.min(rel);
            out.max_release_time = out.max_release_time.max(rel);
            out.min_deadline = out.min_deadline.min(dl);
            out.max_deadline = out.max_deadline.max(dl);
            out.min_exec_time = out.min_exec_time.min(exec);
            out.max_exec_time = out.max_exec_time.max(exec);
        }
        Some(out)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
