// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulation gateway
//!
//! The simulator is a black box: it takes a gain vector, a scenario and a
//! step count and returns a [`TelemetrySeries`] or a [`SimulationFailure`].
//! Two implementations are provided:
//! - [`process::ProcessGateway`] runs an external simulator executable and
//!   reads the telemetry CSV it writes
//! - [`function::FnGateway`] wraps an in-process closure

pub mod function;
pub mod process;

pub use function::FnGateway;
pub use process::{ProcessGateway, SimulatorConfig};

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::gains::GainVector;
use crate::scenario::Scenario;
use crate::telemetry::{TelemetryError, TelemetrySeries};

/// A simulation run that produced no usable telemetry
#[derive(Error, Debug)]
pub enum SimulationFailure {
    #[error("Failed to launch simulator '{program}': {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Simulator exited with {status}: {stderr}")]
    ExitStatus { status: String, stderr: String },
    #[error("Simulator did not finish within {0:?}")]
    Timeout(Duration),
    #[error("Failed to clear stale telemetry file {path:?}: {source}")]
    StaleTelemetry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Simulator produced no telemetry file at {0:?}")]
    MissingTelemetry(PathBuf),
    #[error("Simulator produced invalid telemetry: {0}")]
    InvalidTelemetry(#[from] TelemetryError),
    #[error("Simulation failed: {0}")]
    Other(String),
}

/// Runs one simulation per call
///
/// Implementations should return the same telemetry for identical inputs;
/// the optimizer's opposite-direction probing relies on it unless repeated
/// evaluations are configured.
pub trait SimulationGateway {
    fn run(
        &self,
        gains: &GainVector,
        scenario: &Scenario,
        steps: usize,
    ) -> Result<TelemetrySeries, SimulationFailure>;
}

impl<G: SimulationGateway + ?Sized> SimulationGateway for &G {
    fn run(
        &self,
        gains: &GainVector,
        scenario: &Scenario,
        steps: usize,
    ) -> Result<TelemetrySeries, SimulationFailure> {
        (**self).run(gains, scenario, steps)
    }
}

impl<G: SimulationGateway + ?Sized> SimulationGateway for Box<G> {
    fn run(
        &self,
        gains: &GainVector,
        scenario: &Scenario,
        steps: usize,
    ) -> Result<TelemetrySeries, SimulationFailure> {
        (**self).run(gains, scenario, steps)
    }
}
