/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Per-task variable domains.
//!
//! | Task | wcet | start | end |
//! |---|---|---|---|
//! | aperiodic | `[1, H]` | `[0, H-1]` | `[1, H]` |
//! | periodic, window `[w, w+p)` | `[1, p]` | `[w, w+p-1]` | `[w+1, w+p]` |
//!
//! `w` is `k × p` for occurrence `k`, plus the phase when phased release
//! times are on.  The user-fixed bounds (release time, deadline, execution
//! time) then narrow these ranges, relative to `w`.  A final repair pass
//! keeps `end_lo ≥ start_lo + 1` and `start_hi ≤ end_hi − 1`.

use thiserror::Error;
use tracing::debug;

use crate::config::GenerationConfig;
use crate::task::{Task, TaskId, TaskSet};

/// A domain stayed empty after repair.  The task can never be scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("task {task}: empty {variable} domain [{lo}, {hi}]")]
pub struct DomainError {
    pub task: TaskId,
    pub variable: &'static str,
    pub lo: i64,
    pub hi: i64,
}

/// Inclusive integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub lo: i64,
    pub hi: i64,
}

impl Bounds {
    pub fn new(lo: i64, hi: i64) -> Self {
        Self { lo, hi }
    }

    pub fn is_empty(&self) -> bool {
        self.lo > self.hi
    }

    pub fn contains(&self, value: i64) -> bool {
        self.lo <= value && value <= self.hi
    }

    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.lo, self.hi.max(self.lo))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDomain {
    pub start: Bounds,
    pub end: Bounds,
    pub wcet: Bounds,
    /// Start of the task's window; release time and deadline are relative
    /// to it.
    pub window_start: i64,
}

impl TaskDomain {
    /// `false` if the two tasks can never execute at the same time.
    pub fn may_overlap(&self, other: &TaskDomain) -> bool {
        self.start.lo < other.end.hi && other.start.lo < self.end.hi
    }

    /// `true` if `self` always finishes before `other` can start.
    pub fn always_before(&self, other: &TaskDomain) -> bool {
        self.end.hi <= other.start.lo
    }

    /// `false` if `self` can never finish before `other` starts.
    pub fn can_precede(&self, other: &TaskDomain) -> bool {
        self.end.lo <= other.start.hi
    }
}

// ── DomainBuilder ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainBuilder {
    horizon: i64,
    phased: bool,
    deadline_equals_period: bool,
    min_release_time: Option<i64>,
    max_release_time: Option<i64>,
    min_deadline: Option<i64>,
    max_deadline: Option<i64>,
    min_exec_time: Option<i64>,
    max_exec_time: Option<i64>,
}

impl DomainBuilder {
    pub fn new(horizon: u64, config: &GenerationConfig) -> Self {
        Self {
            horizon: horizon as i64,
            phased: config.phased_release_times,
            deadline_equals_period: config.deadline_equals_period,
            min_release_time: config.min_release_time,
            max_release_time: config.max_release_time,
            min_deadline: config.min_deadline,
            max_deadline: config.max_deadline,
            min_exec_time: config.min_exec_time,
            max_exec_time: config.max_exec_time,
        }
    }

    pub fn horizon(&self) -> i64 {
        self.horizon
    }

    /// Domains for every task in `tasks`, indexed by id.
    pub fn build(&self, tasks: &TaskSet) -> Result<Vec<TaskDomain>, DomainError> {
        let domains = tasks
            .iter()
            .map(|t| self.task_domain(t))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(tasks = domains.len(), horizon = self.horizon, "domains built");
        Ok(domains)
    }

    pub fn task_domain(&self, task: &Task) -> Result<TaskDomain, DomainError> {
        let raw = if task.periodic && task.period > 0 {
            self.periodic(task)
        } else {
            self.aperiodic()
        };
        let domain = repair(raw);

        for (variable, bounds) in [
            ("start", domain.start),
            ("end", domain.end),
            ("wcet", domain.wcet),
        ] {
            if bounds.is_empty() {
                return Err(DomainError {
                    task: task.id,
                    variable,
                    lo: bounds.lo,
                    hi: bounds.hi,
                });
            }
        }
        Ok(domain)
    }

    fn aperiodic(&self) -> TaskDomain {
        let h = self.horizon;
        TaskDomain {
            wcet: self.exec_bounds(h),
            start: Bounds::new(
                self.min_release_time.unwrap_or(0).max(0),
                self.max_release_time.map_or(h - 1, |m| m.min(h - 1)),
            ),
            end: Bounds::new(
                self.min_deadline.unwrap_or(1).max(1),
                self.max_deadline.map_or(h, |m| m.min(h)),
            ),
            window_start: 0,
        }
    }

    fn periodic(&self, task: &Task) -> TaskDomain {
        let period = task.period as i64;
        let w0 = task.window_start(self.phased);
        let w1 = w0 + period;

        let mut wcet = self.exec_bounds(period);
        if let (Some(max_dl), Some(min_rel)) = (self.max_deadline, self.min_release_time) {
            wcet.hi = wcet.hi.min(max_dl - min_rel);
        }

        let start = Bounds::new(
            w0 + self.min_release_time.unwrap_or(0).max(0),
            self.max_release_time.map_or(w1 - 1, |m| (w0 + m).min(w1 - 1)),
        );
        let end = if self.deadline_equals_period {
            Bounds::new(w0 + 1, w1)
        } else {
            Bounds::new(
                w0 + self.min_deadline.unwrap_or(1).max(1),
                self.max_deadline.map_or(w1, |m| (w0 + m).min(w1)),
            )
        };

        TaskDomain {
            start,
            end,
            wcet,
            window_start: w0,
        }
    }

    /// `[1, upper]` narrowed by the user execution-time bounds.
    fn exec_bounds(&self, upper: i64) -> Bounds {
        Bounds::new(
            self.min_exec_time.unwrap_or(1).max(1),
            self.max_exec_time.map_or(upper, |m| m.min(upper)),
        )
    }
}

/// Every task runs for at least one time unit.
fn repair(mut d: TaskDomain) -> TaskDomain {
    d.end.lo = d.end.lo.max(d.start.lo + 1);
    d.start.hi = d.start.hi.min(d.end.hi - 1);
    d
}

// ── Tests ─────────────────────────────────────────────────────────────────────
