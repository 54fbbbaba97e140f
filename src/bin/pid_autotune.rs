// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! PID Auto-Tuner Binary
//!
//! Tunes the Kp/Ki/Kd gains of the flight controller simulator with a
//! Twiddle coordinate descent, or scores a single gain vector with
//! `--evaluate`. Results are printed to the console and optionally written
//! as a JSON report.

use anyhow::{anyhow, Result};
use clap::Parser;
use log::info;
use rust_pid_autotune::config::{utils::output_config_schema, AutotuneConfig};
use rust_pid_autotune::gateway::ProcessGateway;
use rust_pid_autotune::optimizer::LogProgress;
use rust_pid_autotune::tuner::{AutoTuner, TuningSettings};
use rust_pid_autotune::{CostStrategy, GainVector};
use std::path::PathBuf;

mod pid_autotune_helper;
use crate::pid_autotune_helper::console::{display_evaluation, display_tuning_results};
use crate::pid_autotune_helper::json_report::write_json_report;

/// PID auto-tuner CLI arguments
#[derive(Parser, Debug)]
#[command(name = "pid_autotune")]
#[command(about = "Automatic PID gain tuning against an external flight simulator")]
#[command(version)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "autotune.yaml")]
    pub config: PathBuf,

    /// Cost strategy (overrides the configuration)
    #[arg(short = 'm', long, value_enum)]
    pub strategy: Option<CostStrategy>,

    /// Simulation steps per run (overrides the configuration)
    #[arg(short, long)]
    pub steps: Option<usize>,

    /// Output JSON report file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Only score these gains, formatted as kp,ki,kd
    #[arg(short, long, value_name = "KP,KI,KD")]
    pub evaluate: Option<GainVector>,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    pub show_config_schema: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging, RUST_LOG wins over --verbose
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    if args.show_config_schema {
        return output_config_schema();
    }

    info!("Starting PID auto-tuner v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {:?}", args.config);

    let mut config = AutotuneConfig::from_file(&args.config)?;
    config.apply_args(args.steps, args.strategy);
    config.validate()?;

    info!("Scenario: {}", config.scenario);
    info!("Strategy: {}", config.cost.strategy);

    let gateway = ProcessGateway::new(config.simulator.clone())?;
    let tuner = AutoTuner::new(gateway, TuningSettings::from(&config))?;

    if let Some(gains) = args.evaluate {
        let gains = config.gain_limits.clamp(&gains);
        let evaluation =
            tuner.evaluate_gains(&gains, &config.scenario, config.steps, config.cost.strategy);
        display_evaluation(&gains, &evaluation, config.cost.strategy);
        if evaluation.metrics.is_none() {
            return Err(anyhow!("Simulation failed for {}", gains));
        }
        return Ok(());
    }

    let report = tuner.tune(
        &config.scenario,
        config.steps,
        config.cost.strategy,
        &mut LogProgress::new(10.0),
    );

    display_tuning_results(&report);

    if let Some(output_path) = args.output {
        info!("Writing JSON report: {:?}", output_path);
        write_json_report(&report, &output_path)?;
    }

    info!("PID tuning completed");
    Ok(())
}
