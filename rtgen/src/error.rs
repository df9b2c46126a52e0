/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Error and warning types shared by the generation pipeline.
//!
//! Two layers, matching the two ways a generation run can go wrong:
//!
//! * [`GenError`] – fatal.  Contract violations in the configuration, a
//!   hyperperiod that cannot be computed, malformed TGFF text or a task whose
//!   variable domain is empty.  Returned as `Err` and never recovered.
//! * [`Warning`] – a requested target (relation count, subgraph count,
//!   residency count, tool output) was not reached.  Pushed onto the
//!   session's warning list; processing continues with the best-effort
//!   result.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::hyperperiod::HyperperiodError;
use crate::model::domain::DomainError;
use crate::task::TaskId;
use crate::tgff::TgffError;

// ── Fatal errors ──────────────────────────────────────────────────────────────

/// Top-level error returned by [`GenerationSession`](crate::session::GenerationSession).
#[derive(Debug, Error)]
pub enum GenError {
    /// The configuration violates a contract (see [`ConfigError`]).
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The scheduling horizon could not be computed.
    #[error("hyperperiod: {0}")]
    Hyperperiod(#[from] HyperperiodError),

    /// TGFF task-graph text could not be parsed.
    #[error("malformed task-graph text: {0}")]
    MalformedGraph(#[from] TgffError),

    /// A task's variable domain is empty even after repair.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A stage was invoked before the stage it depends on.
    #[error("{stage} called before {requires}")]
    OutOfOrder {
        stage: &'static str,
        requires: &'static str,
    },
}

// ── Non-fatal warnings ────────────────────────────────────────────────────────

/// A target that could not be reached.  Carries the requested and achieved
/// values so the shortfall can be reported without further parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Fewer precedence relations than requested were generated.
    PrecedenceShortfall { requested: usize, generated: usize },

    /// Fewer (or more) precedence subgraphs than requested exist.
    SubgraphShortfall { requested: usize, generated: usize },

    /// Fewer residency constraints than requested were generated.
    ResidencyShortfall { requested: usize, generated: usize },

    /// Two periodic tasks with the same phase have instance lists of
    /// different length, so their instances cannot be paired.
    InstanceMismatch {
        first: TaskId,
        second: TaskId,
        first_instances: usize,
        second_instances: usize,
    },

    /// The task-graph text did not contain the expected tool output.
    MissingGraphOutput { detail: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::PrecedenceShortfall {
                requested,
                generated,
            } => write!(
                f,
                "could only generate {generated} of {requested} precedence relations ({} missing)",
                requested - generated
            ),
            Warning::SubgraphShortfall {
                requested,
                generated,
            } => write!(
                f,
                "requested {requested} precedence subgraphs but {generated} were generated"
            ),
            Warning::ResidencyShortfall {
                requested,
                generated,
            } => write!(
                f,
                "could only generate {generated} of {requested} residency constraints ({} missing)",
                requested - generated
            ),
            Warning::InstanceMismatch {
                first,
                second,
                first_instances,
                second_instances,
            } => write!(
                f,
                "tasks {first} and {second} share a phase but have {first_instances} and \
                 {second_instances} instances; pair skipped"
            ),
            Warning::MissingGraphOutput { detail } => {
                write!(f, "task-graph output incomplete: {detail}")
            }
        }
    }
}

/// Push `warning` onto `warnings` and emit it as a `tracing` warning.
pub(crate) fn record(warnings: &mut Vec<Warning>, warning: Warning) {
    tracing::warn!("{warning}");
    warnings.push(warning);
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_shortfall_reports_missing_count() {
        let w = Warning::PrecedenceShortfall {
            requested: 7,
            generated: 4,
        };
        assert_eq!(
            w.to_string(),
            "could only generate 4 of 7 precedence relations (3 missing)"
        );
    }

    #[test]
    fn record_appends_to_list() {
        let mut list = Vec::new();
        record(
            &mut list,
            Warning::ResidencyShortfall {
                requested: 2,
                generated: 1,
            },
        );
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn config_error_converts_into_gen_error() {
        let err: GenError = ConfigError::ConflictingPeriodicity.into();
        assert!(matches!(err, GenError::Config(_)));
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
