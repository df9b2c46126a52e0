/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Generation configuration loading and validation.
//!
//! The expected YAML structure is (every key optional):
//! ```yaml
//! seed: 42
//! task_count: 8
//! resource_count: 2
//! periodic_only: true
//! base_period: 10
//! period_multipliers: [1, 2, 4]
//! phased_release_times: true
//! min_exec_time: 2
//! max_exec_time: 5
//! precedence_relations: 4
//! residency_constraints: 3
//! multi_residency: true
//! wcet_distribution: { kind: poisson, lambda: 3.0 }
//! solver:
//!   workers: 4
//!   solution_pool_size: 2
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::random::Distribution;

// ── Contract violations ───────────────────────────────────────────────────────

/// A configuration that can never produce a valid run.  Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("task set cannot be both purely periodic and purely aperiodic")]
    ConflictingPeriodicity,

    #[error("period multiplier list is empty but periodic tasks are requested")]
    EmptyPeriodMultipliers,

    #[error("base period and period multipliers must be non-zero")]
    ZeroPeriod,

    #[error("at least one resource is required")]
    NoResources,

    #[error("{name} minimum {min} exceeds maximum {max}")]
    InvertedBounds { name: &'static str, min: i64, max: i64 },

    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: i64 },

    #[error("invalid parameters for {name} distribution")]
    InvalidDistribution { name: &'static str },

    #[error("periodic share {0} is outside [0, 1]")]
    InvalidShare(String),
}

// ── Solver parameters ─────────────────────────────────────────────────────────

/// Parameters forwarded verbatim to the solver backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Worker threads the solver may use internally.
    pub workers: usize,
    /// Maximum number of solutions to enumerate.
    pub solution_pool_size: usize,
    /// Wall-clock limit.  `None` lets the solver run to completion.
    pub time_limit_secs: Option<f64>,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            workers: 1,
            solution_pool_size: 1,
            time_limit_secs: None,
        }
    }
}

// ── GenerationConfig ──────────────────────────────────────────────────────────

/// Everything a generation run needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// RNG seed.  A random seed is drawn (and logged) when absent.
    pub seed: Option<u64>,

    pub task_count: usize,
    pub resource_count: u32,

    // ── Periodicity ───────────────────────────────────────────────────────────
    pub periodic_only: bool,
    pub aperiodic_only: bool,
    /// Probability that a task is periodic when neither flag is set.
    pub periodic_share: f64,
    pub base_period: u64,
    pub period_multipliers: Vec<u64>,
    pub phased_release_times: bool,
    pub deadline_equals_period: bool,
    /// Upper bound on the multiplier of a mixed periodic/aperiodic horizon.
    pub mixed_horizon_cap: u64,

    // ── User-fixed dynamic bounds ─────────────────────────────────────────────
    pub min_release_time: Option<i64>,
    pub max_release_time: Option<i64>,
    pub min_deadline: Option<i64>,
    pub max_deadline: Option<i64>,
    pub min_exec_time: Option<i64>,
    pub max_exec_time: Option<i64>,

    // ── Precedence ────────────────────────────────────────────────────────────
    pub precedence_relations: usize,
    pub precedence_subgraphs: Option<usize>,
    pub posthoc_precedence: bool,

    // ── Residency ─────────────────────────────────────────────────────────────
    pub residency_constraints: usize,
    pub multi_residency: bool,
    pub posthoc_residency: bool,

    // ── Distributions ─────────────────────────────────────────────────────────
    pub wcet_distribution: Distribution,
    pub resource_distribution: Distribution,
    pub residency_size_distribution: Distribution,
    pub dynamic_distribution: Distribution,

    pub solver: SolverParams,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            task_count: 8,
            resource_count: 2,
            periodic_only: false,
            aperiodic_only: false,
            periodic_share: 0.5,
            base_period: 10,
            period_multipliers: vec![1, 2, 4],
            phased_release_times: false,
            deadline_equals_period: false,
            mixed_horizon_cap: 3,
            min_release_time: None,
            max_release_time: None,
            min_deadline: None,
            max_deadline: None,
            min_exec_time: None,
            max_exec_time: None,
            precedence_relations: 0,
            precedence_subgraphs: None,
            posthoc_precedence: false,
            residency_constraints: 0,
            multi_residency: false,
            posthoc_residency: false,
            wcet_distribution: Distribution::Uniform,
            resource_distribution: Distribution::Uniform,
            residency_size_distribution: Distribution::Uniform,
            dynamic_distribution: Distribution::Uniform,
            solver: SolverParams::default(),
        }
    }
}

impl GenerationConfig {
    /// Parse `path` as YAML and validate the result.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the YAML is structurally
    /// invalid, or the configuration violates a contract.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading generation configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        let config: GenerationConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        debug!(?config, "configuration loaded");
        Ok(config)
    }

    /// Check every contract the pipeline relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.periodic_only && self.aperiodic_only {
            return Err(ConfigError::ConflictingPeriodicity);
        }
        if !(0.0..=1.0).contains(&self.periodic_share) {
            return Err(ConfigError::InvalidShare(self.periodic_share.to_string()));
        }
        if self.may_have_periodic_tasks() {
            if self.period_multipliers.is_empty() {
                return Err(ConfigError::EmptyPeriodMultipliers);
            }
            if self.base_period == 0 || self.period_multipliers.contains(&0) {
                return Err(ConfigError::ZeroPeriod);
            }
        }
        if self.resource_count == 0 {
            return Err(ConfigError::NoResources);
        }

        for (name, min, max) in [
            ("release time", self.min_release_time, self.max_release_time),
            ("deadline", self.min_deadline, self.max_deadline),
            ("execution time", self.min_exec_time, self.max_exec_time),
        ] {
            if let (Some(min), Some(max)) = (min, max) {
                if min > max {
                    return Err(ConfigError::InvertedBounds { name, min, max });
                }
            }
        }
        for (name, value) in [
            ("min_exec_time", self.min_exec_time),
            ("max_exec_time", self.max_exec_time),
            ("min_deadline", self.min_deadline),
            ("max_deadline", self.max_deadline),
        ] {
            if let Some(value) = value.filter(|v| *v < 1) {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if let Some(value) = self.min_release_time.filter(|v| *v < 0) {
            return Err(ConfigError::NonPositive {
                name: "min_release_time",
                value,
            });
        }

        for (name, dist) in [
            ("wcet", self.wcet_distribution),
            ("resource", self.resource_distribution),
            ("residency size", self.residency_size_distribution),
            ("dynamic bound", self.dynamic_distribution),
        ] {
            if !dist.is_valid() {
                return Err(ConfigError::InvalidDistribution { name });
            }
        }
        Ok(())
    }

    /// `true` unless the set is declared purely aperiodic.
    pub fn may_have_periodic_tasks(&self) -> bool {
        !self.aperiodic_only
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
