/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! One generation run, start to finish.
//!
//! ```text
//! new ──► prepare ──────────────────────► build_model ──► solve ──► result
//!         task set, horizon, precedence,  domains,        read back,
//!         phases, unroll, residency       model, hints    post-hoc stages
//! ```
//!
//! Each stage checks that the previous one ran and returns
//! [`GenError::OutOfOrder`] otherwise.  The session owns the task set, the
//! precedence map and the random source; the solver owns the model.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::GenerationConfig;
use crate::error::{GenError, Warning};
use crate::hyperperiod::{HorizonInfo, HyperperiodCalculator};
use crate::model::hints::Hints;
use crate::model::{
    DomainBuilder, DynamicValues, HintGenerator, ModelAssembler, ScheduleReader, SolveStatus,
    SolverBackend, TaskDomain, VariableBundle,
};
use crate::phase::PhaseAssigner;
use crate::precedence::{
    PosthocPrecedenceGenerator, PrecedenceGenerator, PrecedenceMap, PrecedenceTarget,
};
use crate::random::RandomSource;
use crate::residency::{PosthocResidencyAssigner, ResidencyAssigner};
use crate::task::{ResourceId, SolvedTiming, TaskId, TaskSet};
use crate::{taskset, tgff};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    New,
    Prepared,
    Modelled,
    Solved,
}

/// One solution read back from the solver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// Indexed by task id.
    pub timings: Vec<SolvedTiming>,
    pub dynamic: DynamicValues,
}

// ── Produced interface ────────────────────────────────────────────────────────

/// One original task as handed to a formatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub periodic: bool,
    pub period: u64,
    pub phase: u64,
    pub instances: usize,
    pub release_time: Option<i64>,
    pub deadline: Option<i64>,
    pub wcet: Option<i64>,
    pub resource: Option<ResourceId>,
    pub predecessors: Vec<TaskId>,
    pub successors: Vec<TaskId>,
    pub residency: Vec<ResourceId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedTaskSet {
    pub seed: u64,
    pub horizon: u64,
    pub hyperperiod: u64,
    pub resource_count: u32,
    pub status: Option<SolveStatus>,
    pub relation_count: usize,
    pub subgraph_count: usize,
    pub residency_count: usize,
    pub dynamic: Option<DynamicValues>,
    pub tasks: Vec<TaskRecord>,
    pub warnings: Vec<Warning>,
}

// ── GenerationSession ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct GenerationSession {
    config: GenerationConfig,
    rng: RandomSource,
    stage: Stage,
    tasks: Option<TaskSet>,
    map: PrecedenceMap,
    horizon: Option<HorizonInfo>,
    resource_count: u32,
    domains: Vec<TaskDomain>,
    bundle: Option<VariableBundle>,
    hints: Option<Hints>,
    status: Option<SolveStatus>,
    solutions: Vec<Solution>,
    warnings: Vec<Warning>,
}

impl GenerationSession {
    /// Validate `config` and seed the random source.
    pub fn new(config: GenerationConfig) -> Result<Self, GenError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => RandomSource::from_seed(seed),
            None => RandomSource::from_entropy(),
        };
        info!(seed = rng.seed(), "Generation session created");
        Ok(Self {
            resource_count: config.resource_count,
            config,
            rng,
            stage: Stage::New,
            tasks: None,
            map: PrecedenceMap::new(0),
            horizon: None,
            domains: Vec::new(),
            bundle: None,
            hints: None,
            status: None,
            solutions: Vec::new(),
            warnings: Vec::new(),
        })
    }

    /// Use `tasks` instead of drawing a random task set.
    pub fn with_tasks(mut self, tasks: TaskSet) -> Self {
        self.tasks = Some(tasks);
        self
    }

    /// Use the task graphs in TGFF `text` as the task set.
    pub fn ingest_tgff(&mut self, text: &str) -> Result<(), GenError> {
        self.require(Stage::New, "ingest_tgff", "new")?;
        let graphs = tgff::parse(text)?;
        let tasks = tgff::apply(&graphs, &mut self.warnings)?;
        self.tasks = Some(tasks);
        Ok(())
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn tasks(&self) -> Option<&TaskSet> {
        self.tasks.as_ref()
    }

    pub fn horizon(&self) -> Option<&HorizonInfo> {
        self.horizon.as_ref()
    }

    pub fn precedence_map(&self) -> &PrecedenceMap {
        &self.map
    }

    pub fn domains(&self) -> &[TaskDomain] {
        &self.domains
    }

    pub fn bundle(&self) -> Option<&VariableBundle> {
        self.bundle.as_ref()
    }

    pub fn hints(&self) -> Option<&Hints> {
        self.hints.as_ref()
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn resource_count(&self) -> u32 {
        self.resource_count
    }

    fn require(
        &self,
        stage: Stage,
        name: &'static str,
        requires: &'static str,
    ) -> Result<(), GenError> {
        if self.stage != stage {
            return Err(GenError::OutOfOrder {
                stage: name,
                requires,
            });
        }
        Ok(())
    }

    /// Everything that happens before the model is built.
    pub fn prepare(&mut self) -> Result<&HorizonInfo, GenError> {
        self.require(Stage::New, "prepare", "new")?;
        let config = &self.config;
        let rng = &mut self.rng;

        let mut tasks = match self.tasks.take() {
            Some(tasks) => tasks,
            None => taskset::build_tasks(config, rng),
        };
        let mut map = PrecedenceMap::from_tasks(&tasks);

        let calculator = HyperperiodCalculator::new().with_mixed_cap(config.mixed_horizon_cap);
        let mut horizon =
            calculator.calculate(&tasks, config.periodic_only, config.aperiodic_only, rng)?;

        let target = PrecedenceTarget {
            relations: config.precedence_relations,
            subgraphs: config.precedence_subgraphs,
        };
        let wants_precedence = target.relations > 0 || target.subgraphs.is_some();
        if wants_precedence && !config.posthoc_precedence {
            PrecedenceGenerator::for_tasks(&tasks).generate(
                &mut tasks,
                &mut map,
                target,
                rng,
                &mut self.warnings,
            );
        }

        if config.phased_release_times {
            PhaseAssigner::new().assign(&mut tasks, &map, rng);
            horizon = calculator.extend_for_phases(&horizon, &tasks)?;
        }

        tasks.unroll(horizon.horizon, config.phased_release_times);
        map.grow(tasks.len());

        if config.residency_constraints > 0 && !config.posthoc_residency {
            let assigner = if config.multi_residency {
                ResidencyAssigner::multi(config.resource_count, config.residency_size_distribution)
            } else {
                ResidencyAssigner::single(config.resource_count)
            };
            assigner.assign(&mut tasks, config.residency_constraints, rng, &mut self.warnings);
        }

        info!(
            tasks = tasks.len(),
            originals = tasks.originals().count(),
            horizon = horizon.horizon,
            relations = tasks.relation_count(),
            residency = tasks.residency_count(),
            "Task set prepared"
        );
        self.tasks = Some(tasks);
        self.map = map;
        self.stage = Stage::Prepared;
        Ok(self.horizon.insert(horizon))
    }

    /// Domains, constraints and hints, posted onto `solver`.
    pub fn build_model<S: SolverBackend>(
        &mut self,
        solver: &mut S,
    ) -> Result<&VariableBundle, GenError> {
        self.require(Stage::Prepared, "build_model", "prepare")?;
        let (Some(tasks), Some(horizon)) = (&self.tasks, &self.horizon) else {
            return Err(GenError::OutOfOrder {
                stage: "build_model",
                requires: "prepare",
            });
        };
        let h = horizon.horizon;

        let domains = DomainBuilder::new(h, &self.config).build(tasks)?;
        let (bundle, _) = ModelAssembler::new(&self.config, h)
            .with_resource_count(self.resource_count)
            .assemble(tasks, &domains, solver);
        let hints = HintGenerator::new(&self.config, h).generate(
            tasks,
            &domains,
            &self.map,
            &bundle,
            solver,
            &mut self.rng,
        );

        self.domains = domains;
        self.hints = Some(hints);
        self.stage = Stage::Modelled;
        Ok(self.bundle.insert(bundle))
    }

    /// Run the solver, read every solution back and run the post-hoc
    /// stages on the first one.
    ///
    /// An infeasible model is not an error: the status is returned and the
    /// result carries no timings.
    pub fn solve<S: SolverBackend>(&mut self, solver: &mut S) -> Result<SolveStatus, GenError> {
        self.require(Stage::Modelled, "solve", "build_model")?;
        let (Some(tasks), Some(bundle)) = (self.tasks.as_mut(), self.bundle.as_ref()) else {
            return Err(GenError::OutOfOrder {
                stage: "solve",
                requires: "build_model",
            });
        };

        let outcome = solver.solve(&self.config.solver);
        self.stage = Stage::Solved;
        self.status = Some(outcome.status);
        if !outcome.status.has_solution() {
            warn!(status = ?outcome.status, "No schedule found");
            return Ok(outcome.status);
        }

        // last to first, so that solution 0 is the one left in `tasks`
        let mut solutions = Vec::with_capacity(outcome.solutions);
        for index in (0..outcome.solutions).rev() {
            if let Some(dynamic) = ScheduleReader::read(solver, bundle, tasks, index) {
                let timings = tasks.iter().filter_map(|t| t.solved).collect();
                solutions.push(Solution { timings, dynamic });
            }
        }
        solutions.reverse();
        info!(
            status = ?outcome.status,
            solutions = solutions.len(),
            "Schedule read back"
        );
        self.solutions = solutions;

        if self.solutions.is_empty() {
            warn!("Solver reported a solution but no values could be read");
            return Ok(outcome.status);
        }
        self.run_posthoc();
        Ok(outcome.status)
    }

    fn run_posthoc(&mut self) {
        let config = &self.config;
        let Some(tasks) = self.tasks.as_mut() else {
            return;
        };

        if config.posthoc_precedence {
            let target = PrecedenceTarget {
                relations: config.precedence_relations,
                subgraphs: config.precedence_subgraphs,
            };
            PosthocPrecedenceGenerator::new().generate(
                tasks,
                &mut self.map,
                target,
                &mut self.rng,
                &mut self.warnings,
            );
        }

        if config.posthoc_residency {
            let assigner = if config.multi_residency {
                PosthocResidencyAssigner::multi(
                    self.resource_count,
                    config.residency_size_distribution,
                )
            } else {
                PosthocResidencyAssigner::single(self.resource_count)
            };
            let outcome = assigner.assign(
                tasks,
                config.residency_constraints,
                &mut self.rng,
                &mut self.warnings,
            );
            self.resource_count = outcome.resource_count;
            for solution in &mut self.solutions {
                for timing in &mut solution.timings {
                    if let Some(&renumbered) = outcome.renumbering.get(&timing.resource) {
                        timing.resource = renumbered;
                    }
                }
            }
        }
    }

    /// The task set in its current state.  Timings are present once a
    /// solution has been read.
    pub fn result(&self) -> GeneratedTaskSet {
        let phased = self.config.phased_release_times;
        let records = self
            .tasks
            .iter()
            .flat_map(|set| set.originals())
            .map(|t| TaskRecord {
                id: t.id,
                periodic: t.periodic,
                period: t.period,
                phase: t.phase,
                instances: t.instances.len(),
                release_time: t.release_time(phased),
                deadline: t.deadline(phased),
                wcet: t.solved.map(|s| s.wcet),
                resource: t.solved.map(|s| s.resource),
                predecessors: t.predecessors.iter().copied().collect(),
                successors: t.successors.iter().copied().collect(),
                residency: t.residency.iter().copied().collect(),
            })
            .collect();

        let (relation_count, subgraph_count, residency_count) = match &self.tasks {
            Some(set) => (
                set.relation_count(),
                self.map.subgraph_count(&set.original_ids()),
                set.residency_count(),
            ),
            None => (0, 0, 0),
        };

        GeneratedTaskSet {
            seed: self.rng.seed(),
            horizon: self.horizon.as_ref().map_or(0, |h| h.horizon),
            hyperperiod: self.horizon.as_ref().map_or(0, |h| h.hyperperiod),
            resource_count: self.resource_count,
            status: self.status,
            relation_count,
            subgraph_count,
            residency_count,
            dynamic: self.solutions.first().map(|s| s.dynamic),
            tasks: records,
            warnings: self.warnings.clone(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
