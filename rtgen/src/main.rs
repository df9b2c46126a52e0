/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

use rtgen::config::GenerationConfig;
use rtgen::model::ModelRecorder;
use rtgen::GenerationSession;

// ── CLI argument definition ───────────────────────────────────────────────────

/// Random real-time task-set instance generator.
///
/// Example:
///   rtgen --config generation.yaml --seed 42 --output taskset.yaml
#[derive(Debug, Parser)]
#[command(
    name = "rtgen",
    about = "Random real-time task-set instance generator",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML generation configuration file.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// RNG seed; overrides the seed in the configuration file.
    #[arg(short = 's', long = "seed")]
    seed: Option<u64>,

    /// Where to write the generated task set (stdout when absent).
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// TGFF text to take the task graphs from instead of drawing tasks.
    #[arg(short = 't', long = "tgff")]
    tgff: Option<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!(
        config = ?cli.config,
        seed   = ?cli.seed,
        output = ?cli.output,
        tgff   = ?cli.tgff,
        "rtgen starting"
    );

    if let Err(e) = run(&cli) {
        error!("Generation failed: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    // ── Load generation configuration ─────────────────────────────────────────
    let mut config = match &cli.config {
        Some(path) => GenerationConfig::load_from_file(path)?,
        None => {
            warn!("No configuration file provided, using default generation settings");
            GenerationConfig::default()
        }
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }

    let mut session = GenerationSession::new(config)?;

    if let Some(path) = &cli.tgff {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open TGFF file: {}", path.display()))?;
        session
            .ingest_tgff(&text)
            .with_context(|| format!("Invalid task graphs in {}", path.display()))?;
    }

    // ── Prepare and build the model ───────────────────────────────────────────
    session.prepare()?;
    let mut recorder = ModelRecorder::new();
    session.build_model(&mut recorder)?;

    let stats = recorder.stats();
    info!(
        int_vars           = stats.int_vars,
        bool_vars          = stats.bool_vars,
        linear_constraints = stats.linear_constraints,
        intervals          = stats.intervals,
        no_overlap_groups  = stats.no_overlap_groups,
        hints              = stats.hints,
        "Model built"
    );
    if !session.warnings().is_empty() {
        warn!(count = session.warnings().len(), "Targets not fully reached");
    }

    // ── Write the task set ────────────────────────────────────────────────────
    let yaml = serde_yaml::to_string(&session.result()).context("Cannot serialise task set")?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, yaml)
                .with_context(|| format!("Cannot write output file: {}", path.display()))?;
            info!("Task set written to {}", path.display());
        }
        None => print!("{yaml}"),
    }
    Ok(())
}
