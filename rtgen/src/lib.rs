/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! rtgen – random real-time task-set instance generator
//!
//! Draws a task set, decides its horizon, adds precedence and residency
//! constraints, and hands a constraint model to a solver whose solution
//! becomes the release times, deadlines, execution times and resource
//! bindings of every task.
//!
//! ```text
//! lib.rs
//! ├── config/       – YAML generation configuration
//! ├── error         – fatal errors and recorded warnings
//! ├── random        – seeded random source and distributions
//! ├── task          – tasks, instances and the task set
//! ├── taskset       – random task-set construction
//! ├── tgff          – task graphs read from TGFF text
//! ├── hyperperiod/  – LCM / GCD helpers and horizon selection
//! ├── precedence/   – subgraph map, DAG helpers, pre-solve and post-hoc edges
//! ├── phase         – phase offsets shared within subgraphs
//! ├── residency/    – pre-solve and post-hoc resource restrictions
//! ├── model/        – domains, solver interface, assembly, hints, read-back
//! └── session       – one generation run, stage by stage
//! ```

pub mod config;
pub mod error;
pub mod hyperperiod;
pub mod model;
pub mod phase;
pub mod precedence;
pub mod random;
pub mod residency;
pub mod session;
pub mod task;
pub mod taskset;
pub mod tgff;

pub use error::{GenError, Warning};
pub use session::{GeneratedTaskSet, GenerationSession};
