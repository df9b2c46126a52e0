/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Scheduling horizon calculation.
//!
//! | Task set | Horizon |
//! |---|---|
//! | purely periodic | LCM of all periods (the hyperperiod) |
//! | purely aperiodic | `task_count × N`, `N = 1 + heads` before the first tail, `N ≤ 20` |
//! | mixed | `hyperperiod × M`, `M` drawn the same way, `M ≤ mixed cap` (default 3) |
//!
//! With phased release times the horizon is then extended so that at least one
//! full horizon remains after the last task has been released (see
//! [`HyperperiodCalculator::extend_for_phases`]).
//!
//! The mixed heuristic can produce a horizon too short for the aperiodic load,
//! which makes the model infeasible.  There is no automatic retry: the caller
//! may raise `mixed_horizon_cap` and run again.

pub mod math;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::random::RandomSource;
use crate::task::TaskSet;
use math::{lcm_of_slice, round_up_to_multiple};

// ── Constants ─────────────────────────────────────────────────────────────────

/// Upper limit on the horizon.  Every time unit becomes part of a solver
/// variable domain, so anything bigger is rejected rather than modelled.
pub const DEFAULT_HORIZON_LIMIT: u64 = 10_000_000;

/// Cap on the multiplier of a purely aperiodic horizon.
pub const APERIODIC_MULTIPLIER_CAP: u64 = 20;

/// Default cap on the multiplier of a mixed horizon.
pub const DEFAULT_MIXED_MULTIPLIER_CAP: u64 = 3;

// ── Error type ────────────────────────────────────────────────────────────────

/// Errors that can occur during horizon calculation.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum HyperperiodError {
    /// Both the periodic-only and aperiodic-only flags were set.
    #[error("task set flagged as both purely periodic and purely aperiodic")]
    ConflictingFlags,

    /// A periodic horizon was requested but no task has a non-zero period.
    #[error("no tasks with a valid (non-zero) period")]
    NoValidPeriods,

    #[error("task set is empty")]
    NoTasks,

    /// LCM (or horizon) arithmetic overflowed `u64`.
    #[error("overflow computing horizon from {a} and {b}")]
    Overflow { a: u64, b: u64 },

    #[error("horizon {value} exceeds limit {limit}")]
    TooLarge { value: u64, limit: u64 },
}

// ── Periodicity ───────────────────────────────────────────────────────────────

/// Shape of the task set as far as the horizon is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Periodicity {
    Periodic,
    Aperiodic,
    Mixed,
}

impl Periodicity {
    /// Resolve the configuration flags against the actual task set.
    ///
    /// The flags win when set.  With neither flag set the tasks decide: a
    /// "mixed" configuration that happened to draw only periodic (or only
    /// aperiodic) tasks is treated as such.
    pub fn classify(
        periodic_only: bool,
        aperiodic_only: bool,
        tasks: &TaskSet,
    ) -> Result<Self, HyperperiodError> {
        match (periodic_only, aperiodic_only) {
            (true, true) => Err(HyperperiodError::ConflictingFlags),
            (true, false) => Ok(Periodicity::Periodic),
            (false, true) => Ok(Periodicity::Aperiodic),
            (false, false) => {
                let periodic = tasks.originals().filter(|t| t.periodic).count();
                let total = tasks.originals().count();
                Ok(match periodic {
                    0 => Periodicity::Aperiodic,
                    p if p == total => Periodicity::Periodic,
                    _ => Periodicity::Mixed,
                })
            }
        }
    }
}

// ── HorizonInfo ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HorizonInfo {
    pub periodicity: Periodicity,

    /// LCM of all periods.  `0` when there are no periodic tasks.
    pub hyperperiod: u64,

    /// Multiplier applied to the hyperperiod (mixed) or task count
    /// (aperiodic).  `1` for purely periodic sets.
    pub multiplier: u64,

    /// Length of the scheduling window.
    pub horizon: u64,

    /// Unique periods present (sorted, deduplicated).
    pub unique_periods: Vec<u64>,
}

// ── HyperperiodCalculator ─────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct HyperperiodCalculator {
    limit: u64,
    mixed_cap: u64,
}

impl HyperperiodCalculator {
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_HORIZON_LIMIT,
            mixed_cap: DEFAULT_MIXED_MULTIPLIER_CAP,
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Raise (or lower) the cap on the mixed-horizon multiplier.  Values
    /// below 1 are treated as 1.
    pub fn with_mixed_cap(mut self, cap: u64) -> Self {
        self.mixed_cap = cap.max(1);
        self
    }

    /// Compute the unphased horizon for the original tasks of `tasks`.
    ///
    /// # Errors
    /// * [`HyperperiodError::ConflictingFlags`] – both flags set.
    /// * [`HyperperiodError::NoTasks`] / [`HyperperiodError::NoValidPeriods`]
    ///   – nothing to build a horizon from.
    /// * [`HyperperiodError::Overflow`] / [`HyperperiodError::TooLarge`].
    pub fn calculate(
        &self,
        tasks: &TaskSet,
        periodic_only: bool,
        aperiodic_only: bool,
        rng: &mut RandomSource,
    ) -> Result<HorizonInfo, HyperperiodError> {
        let periodicity = Periodicity::classify(periodic_only, aperiodic_only, tasks)?;
        let task_count = tasks.originals().count() as u64;
        if task_count == 0 {
            return Err(HyperperiodError::NoTasks);
        }

        let unique_periods: Vec<u64> = {
            let mut v: Vec<u64> = tasks
                .originals()
                .filter(|t| t.periodic && t.period > 0)
                .map(|t| t.period)
                .collect();
            v.sort_unstable();
            v.dedup();
            v
        };
        let hyperperiod = lcm_of_slice(&unique_periods)?;

        let (multiplier, base) = match periodicity {
            Periodicity::Periodic => {
                if hyperperiod == 0 {
                    return Err(HyperperiodError::NoValidPeriods);
                }
                (1, hyperperiod)
            }
            Periodicity::Aperiodic => {
                let m = 1 + rng.geometric_multiple(APERIODIC_MULTIPLIER_CAP - 1);
                (m, task_count)
            }
            Periodicity::Mixed => {
                if hyperperiod == 0 {
                    return Err(HyperperiodError::NoValidPeriods);
                }
                let m = 1 + rng.geometric_multiple(self.mixed_cap - 1);
                (m, hyperperiod)
            }
        };
        let horizon = base
            .checked_mul(multiplier)
            .ok_or(HyperperiodError::Overflow {
                a: base,
                b: multiplier,
            })?;
        self.check_limit(horizon)?;

        info!(
            ?periodicity,
            task_count,
            hyperperiod,
            multiplier,
            horizon,
            "Calculated horizon"
        );
        if periodicity == Periodicity::Mixed {
            debug!(
                multiplier,
                cap = self.mixed_cap,
                "mixed horizon may be too short for the aperiodic load"
            );
        }

        Ok(HorizonInfo {
            periodicity,
            hyperperiod,
            multiplier,
            horizon,
            unique_periods,
        })
    }

    /// Extend `info` so that at least one full unphased horizon lies after the
    /// largest phase: the new horizon is the first hyperperiod boundary at or
    /// after the maximum phase, plus the unphased horizon.
    ///
    /// Returns `info` unchanged when no task is phased.
    pub fn extend_for_phases(
        &self,
        info: &HorizonInfo,
        tasks: &TaskSet,
    ) -> Result<HorizonInfo, HyperperiodError> {
        let max_phase = tasks.originals().map(|t| t.phase).max().unwrap_or(0);
        if max_phase == 0 || info.hyperperiod == 0 {
            return Ok(info.clone());
        }

        let offset = round_up_to_multiple(max_phase, info.hyperperiod)?;
        let horizon = offset
            .checked_add(info.horizon)
            .ok_or(HyperperiodError::Overflow {
                a: offset,
                b: info.horizon,
            })?;
        self.check_limit(horizon)?;

        info!(
            max_phase,
            previous = info.horizon,
            horizon,
            "Extended horizon for phased release times"
        );
        Ok(HorizonInfo {
            horizon,
            ..info.clone()
        })
    }

    fn check_limit(&self, horizon: u64) -> Result<(), HyperperiodError> {
        if horizon > self.limit {
            warn!(horizon, limit = self.limit, "Horizon exceeds configured limit");
            return Err(HyperperiodError::TooLarge {
                value: horizon,
                limit: self.limit,
            });
        }
        Ok(())
    }
}

impl Default for HyperperiodCalculator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
