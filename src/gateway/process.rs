// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! External simulator gateway
//!
//! Launches the flight controller simulator once per evaluation:
//!
//! ```text
//! <executable> <kp> <ki> <kd> <steps> <target1> <target2> <switch_step>
//! ```
//!
//! The simulator writes `Time,Target,Actual,Output` rows to a telemetry file
//! inside its working directory; that file is parsed after a successful exit.
//! Any stale telemetry file is removed before launching so that a crashed run
//! can never be scored with the previous run's data.

use anyhow::{Context, Result};
use log::{debug, trace};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::runtime::{Handle, Runtime};

use super::{SimulationFailure, SimulationGateway};
use crate::gains::GainVector;
use crate::scenario::Scenario;
use crate::telemetry::TelemetrySeries;

/// External simulator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Simulator executable. Paths with a directory part are relative to
    /// `working_dir`, bare names are looked up in `PATH`.
    pub executable: PathBuf,
    /// Directory the simulator runs in
    pub working_dir: PathBuf,
    /// Telemetry file written by the simulator, relative to `working_dir`
    pub telemetry_file: PathBuf,
    /// Per-run timeout in milliseconds, no limit when absent
    pub timeout_ms: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("./flight_controller"),
            working_dir: PathBuf::from("../build"),
            telemetry_file: PathBuf::from("telemetry.csv"),
            timeout_ms: Some(60_000),
        }
    }
}

impl SimulatorConfig {
    /// Executable path as handed to the OS
    ///
    /// Relative paths are made absolute, how a relative program path combines
    /// with a child working directory differs between platforms.
    pub fn resolved_executable(&self) -> PathBuf {
        if self.executable.is_relative() && self.executable.components().count() > 1 {
            let base = std::env::current_dir().unwrap_or_default();
            base.join(&self.working_dir).join(&self.executable)
        } else {
            self.executable.clone()
        }
    }

    pub fn telemetry_path(&self) -> PathBuf {
        self.working_dir.join(&self.telemetry_file)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Gateway running the simulator as a child process
pub struct ProcessGateway {
    config: SimulatorConfig,
    runtime: Runtime,
}

impl ProcessGateway {
    pub fn new(config: SimulatorConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create runtime for the simulator gateway")?;

        debug!(
            "Simulator gateway: {:?} in {:?}, timeout {:?}",
            config.resolved_executable(),
            config.working_dir,
            config.timeout()
        );

        Ok(Self { config, runtime })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Command line arguments for one run
    pub fn arguments(gains: &GainVector, scenario: &Scenario, steps: usize) -> Vec<String> {
        let (target1, target2, switch_step) = scenario.simulator_targets();
        vec![
            gains.kp.to_string(),
            gains.ki.to_string(),
            gains.kd.to_string(),
            steps.to_string(),
            target1.to_string(),
            target2.to_string(),
            switch_step.to_string(),
        ]
    }

    /// Run `command` to completion on the gateway runtime, bounded by the
    /// configured timeout
    fn wait_for(
        &self,
        mut command: Command,
    ) -> Result<std::io::Result<Output>, SimulationFailure> {
        let timeout = self.config.timeout();
        self.runtime.block_on(async {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, command.output())
                    .await
                    .map_err(|_| SimulationFailure::Timeout(limit)),
                None => Ok(command.output().await),
            }
        })
    }

    fn clear_stale_telemetry(path: &Path) -> Result<(), SimulationFailure> {
        match std::fs::remove_file(path) {
            Ok(()) => {
                trace!("Removed stale telemetry file {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SimulationFailure::StaleTelemetry {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl SimulationGateway for ProcessGateway {
    fn run(
        &self,
        gains: &GainVector,
        scenario: &Scenario,
        steps: usize,
    ) -> Result<TelemetrySeries, SimulationFailure> {
        let telemetry_path = self.config.telemetry_path();
        Self::clear_stale_telemetry(&telemetry_path)?;

        let program = self.config.resolved_executable();
        let args = Self::arguments(gains, scenario, steps);
        debug!("Launching simulator {:?} {}", program, args.join(" "));

        let mut command = Command::new(&program);
        command
            .args(&args)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        // The private runtime cannot be entered from a thread that already
        // drives one, so async callers wait on a scoped thread instead
        let finished = if Handle::try_current().is_ok() {
            std::thread::scope(|scope| {
                scope
                    .spawn(|| self.wait_for(command))
                    .join()
                    .unwrap_or_else(|_| {
                        Err(SimulationFailure::Other(
                            "simulator wait thread panicked".to_string(),
                        ))
                    })
            })
        } else {
            self.wait_for(command)
        }?;

        let output = finished.map_err(|source| SimulationFailure::Launch {
            program: program.display().to_string(),
            source,
        })?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            trace!("simulator: {}", line);
        }

        if !output.status.success() {
            return Err(SimulationFailure::ExitStatus {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !telemetry_path.exists() {
            return Err(SimulationFailure::MissingTelemetry(telemetry_path));
        }

        let series = TelemetrySeries::from_csv_path(&telemetry_path)?;
        debug!("Simulator produced {} samples", series.len());
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arguments_for_takeoff() {
        let args = ProcessGateway::arguments(
            &GainVector::new(0.6, 0.01, 0.05),
            &Scenario::Takeoff { target: 100.0 },
            200,
        );
        assert_eq!(args, vec!["0.6", "0.01", "0.05", "200", "100", "100", "0"]);
    }

    #[test]
    fn test_arguments_for_step_response() {
        let args = ProcessGateway::arguments(
            &GainVector::new(1.5, 0.0, 0.2),
            &Scenario::StepResponse {
                start_target: 50.0,
                final_target: 100.0,
                switch_step: 500,
            },
            1000,
        );
        assert_eq!(args, vec!["1.5", "0", "0.2", "1000", "50", "100", "500"]);
    }

    #[test]
    fn test_executable_resolution() {
        let config = SimulatorConfig::default();
        let resolved = config.resolved_executable();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("build/flight_controller"));
        assert_eq!(
            config.telemetry_path(),
            PathBuf::from("../build/telemetry.csv")
        );

        let on_path = SimulatorConfig {
            executable: PathBuf::from("flight_controller"),
            ..Default::default()
        };
        assert_eq!(on_path.resolved_executable(), PathBuf::from("flight_controller"));
    }
}
