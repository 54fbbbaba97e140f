// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration
//!
//! A single YAML document drives a tuning run. Every section has defaults so
//! an empty file is a valid configuration:
//!
//! ```yaml
//! simulator:
//!   executable: ./flight_controller
//!   working_dir: ../build
//!   telemetry_file: telemetry.csv
//!   timeout_ms: 60000
//! scenario:
//!   type: step_response
//!   start_target: 50.0
//!   final_target: 100.0
//!   switch_step: 500
//! steps: 1000
//! optimizer:
//!   initial_gains: { kp: 0.5, ki: 0.0, kd: 0.0 }
//!   initial_steps: { kp: 0.1, ki: 0.01, kd: 0.01 }
//!   convergence_threshold: 0.005
//!   max_iterations: 30
//! cost:
//!   strategy: balanced
//!   settling_time_weight: 0.5
//!   non_settling_penalty: 100.0
//! metrics:
//!   tolerance: 0.02
//!   overshoot_reference: segment_target
//! gain_limits:
//!   kp: { min: 0.0, max: 5.0 }
//!   ki: { min: 0.0, max: 1.0 }
//!   kd: { min: 0.0, max: 1.0 }
//! ```
//!
//! Loading validates the document against the JSON schema generated from
//! these types, then applies the rules the schema cannot express, see
//! [`utils::validate_specific_rules`].

pub mod utils;

use anyhow::{Context, Result};
use log::{debug, error};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::cost::{CostConfig, CostStrategy};
use crate::gains::GainLimits;
use crate::gateway::SimulatorConfig;
use crate::metrics::MetricsSettings;
use crate::optimizer::TwiddleConfig;
use crate::scenario::Scenario;

/// Root configuration of a tuning run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AutotuneConfig {
    /// External simulator
    pub simulator: SimulatorConfig,
    /// Target trajectory to tune against
    pub scenario: Scenario,
    /// Simulation steps per run
    pub steps: usize,
    /// Twiddle search parameters
    pub optimizer: TwiddleConfig,
    /// Cost strategy and weights
    pub cost: CostConfig,
    /// Metrics engine settings
    pub metrics: MetricsSettings,
    /// Valid ranges of the tuned gains
    pub gain_limits: GainLimits,
}

fn default_steps() -> usize {
    1000
}

impl Default for AutotuneConfig {
    fn default() -> Self {
        Self {
            simulator: SimulatorConfig::default(),
            scenario: Scenario::default(),
            steps: default_steps(),
            optimizer: TwiddleConfig::default(),
            cost: CostConfig::default(),
            metrics: MetricsSettings::default(),
            gain_limits: GainLimits::default(),
        }
    }
}

impl AutotuneConfig {
    /// Load configuration from a YAML file
    ///
    /// A missing file is created with the default configuration. When the
    /// file fails validation a `<name>.sample.yaml` with the defaults is
    /// written next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        match Self::from_yaml_str(&contents) {
            Ok(config) => Ok(config),
            Err(err) => {
                error!("Configuration error in {}: {:#}", path.display(), err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                Err(err.context(format!(
                    "Invalid configuration file {}",
                    path.display()
                )))
            }
        }
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        // An empty document means "all defaults"
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;

        let json_value = serde_json::to_value(&yaml_value)
            .context("Failed to convert YAML to JSON for validation")?;

        let schema = utils::config_schema()?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating configuration against schema");
        if let Err(error) = validator.validate(&json_value) {
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        let config: AutotuneConfig = serde_yml::from_str(contents)
            .context("Failed to deserialize configuration")?;

        utils::validate_specific_rules(&config)?;
        Ok(config)
    }

    /// Save the configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    fn create_sample_config(path: &Path) -> Result<()> {
        let sample_path = path.with_extension("sample.yaml");
        debug!("Creating sample configuration file at {:?}", sample_path);
        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;
        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Override configuration values from the command line
    pub fn apply_args(&mut self, steps: Option<usize>, strategy: Option<CostStrategy>) {
        if let Some(steps) = steps {
            self.steps = steps;
        }
        if let Some(strategy) = strategy {
            self.cost.strategy = strategy;
        }
    }

    /// Check the semantic rules on an in-memory configuration
    pub fn validate(&self) -> Result<()> {
        utils::validate_specific_rules(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gains::{GainRange, GainVector};
    use crate::metrics::OvershootReference;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_reference_values() {
        let config = AutotuneConfig::default();
        assert_eq!(config.optimizer.initial_gains, GainVector::new(0.5, 0.0, 0.0));
        assert_eq!(config.optimizer.max_iterations, 30);
        assert_eq!(config.optimizer.convergence_threshold, 0.005);
        assert_eq!(config.cost.strategy, CostStrategy::Balanced);
        assert_eq!(config.metrics.tolerance, 0.02);
        assert_eq!(config.gain_limits.kp, GainRange::new(0.0, 5.0));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(
            AutotuneConfig::from_yaml_str("").unwrap(),
            AutotuneConfig::default()
        );
        assert_eq!(
            AutotuneConfig::from_yaml_str("{}\n").unwrap(),
            AutotuneConfig::default()
        );
    }

    #[test]
    fn test_partial_document() {
        let yaml = r#"
scenario:
  type: step_response
  start_target: 20
  final_target: 80
  switch_step: 100
steps: 400
cost:
  strategy: accuracy
metrics:
  overshoot_reference: peak_target
optimizer:
  max_iterations: 60
  evaluations_per_candidate: 3
"#;
        let config = AutotuneConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(
            config.scenario,
            Scenario::StepResponse {
                start_target: 20.0,
                final_target: 80.0,
                switch_step: 100
            }
        );
        assert_eq!(config.steps, 400);
        assert_eq!(config.cost.strategy, CostStrategy::Accuracy);
        assert_eq!(config.cost.non_settling_penalty, 100.0);
        assert_eq!(
            config.metrics.overshoot_reference,
            OvershootReference::PeakTarget
        );
        assert_eq!(config.optimizer.max_iterations, 60);
        assert_eq!(config.optimizer.evaluations_per_candidate, 3);
        assert_eq!(config.optimizer.step_growth, 1.1);
    }

    #[test]
    fn test_schema_rejects_wrong_types() {
        let err = AutotuneConfig::from_yaml_str("steps: many\n").unwrap_err();
        assert!(err.to_string().contains("validation failed"));

        assert!(AutotuneConfig::from_yaml_str("cost:\n  strategy: fastest\n").is_err());
        assert!(AutotuneConfig::from_yaml_str("scenario:\n  type: hover\n").is_err());
    }

    #[test]
    fn test_specific_rules_are_applied() {
        let err = AutotuneConfig::from_yaml_str("steps: 0\n").unwrap_err();
        assert!(format!("{:#}", err).contains("steps"));

        assert!(AutotuneConfig::from_yaml_str("metrics:\n  tolerance: 1.5\n").is_err());
        assert!(AutotuneConfig::from_yaml_str(
            "gain_limits:\n  kp: { min: 2.0, max: 1.0 }\n"
        )
        .is_err());
    }

    #[test]
    fn test_missing_file_creates_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("autotune.yaml");

        let config = AutotuneConfig::from_file(&path).unwrap();
        assert_eq!(config, AutotuneConfig::default());
        assert!(path.exists());

        // The written file loads back to the same configuration
        assert_eq!(AutotuneConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_file_writes_sample() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("autotune.yaml");
        fs::write(&path, "optimizer:\n  step_shrink: 2.0\n").unwrap();

        assert!(AutotuneConfig::from_file(&path).is_err());
        assert!(dir.path().join("autotune.sample.yaml").exists());
    }

    #[test]
    fn test_apply_args() {
        let mut config = AutotuneConfig::default();
        config.apply_args(Some(250), Some(CostStrategy::Accuracy));
        assert_eq!(config.steps, 250);
        assert_eq!(config.cost.strategy, CostStrategy::Accuracy);

        config.apply_args(None, None);
        assert_eq!(config.steps, 250);
    }
}
