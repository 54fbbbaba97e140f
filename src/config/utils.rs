// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! Schema generation and the validation rules that the JSON schema cannot
//! express.

use anyhow::{Context, Result};
use log::debug;

use super::AutotuneConfig;
use crate::scenario::Scenario;

/// JSON schema of [`AutotuneConfig`]
pub fn config_schema() -> Result<serde_json::Value> {
    let schema = schemars::schema_for!(AutotuneConfig);
    serde_json::to_value(&schema).context("Failed to serialize configuration schema")
}

/// Output the configuration JSON schema to stdout.
///
/// Called for the `--show-config-schema` flag:
///
/// ```bash
/// ./pid_autotune --show-config-schema > autotune.schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema = config_schema()?;
    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;
    println!("{}", formatted_schema);
    Ok(())
}

/// Validates the configuration against rules not covered by the JSON schema.
///
/// ### Validation Rules
///
/// - **Run length**: `steps` is positive
/// - **Scenario**: targets are finite numbers
/// - **Simulator**: a configured timeout is not zero
/// - **Metrics**: the settling tolerance lies in `(0, 1)`
/// - **Cost**: weights and penalty are finite and non-negative
/// - **Optimizer**: see [`crate::optimizer::TwiddleConfig::validate`]
/// - **Gain limits**: see [`crate::gains::GainLimits::validate`]
pub fn validate_specific_rules(config: &AutotuneConfig) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.steps == 0 {
        anyhow::bail!("steps must be greater than 0");
    }

    let targets: Vec<f64> = match config.scenario {
        Scenario::Takeoff { target } => vec![target],
        Scenario::StepResponse {
            start_target,
            final_target,
            ..
        } => vec![start_target, final_target],
    };
    if targets.iter().any(|t| !t.is_finite()) {
        anyhow::bail!("Scenario targets must be finite: {}", config.scenario);
    }

    if config.simulator.timeout_ms == Some(0) {
        anyhow::bail!("simulator.timeout_ms must be greater than 0 when set");
    }

    let tolerance = config.metrics.tolerance;
    if !(tolerance > 0.0 && tolerance < 1.0) {
        anyhow::bail!("metrics.tolerance must be in (0, 1), got {}", tolerance);
    }

    for (name, value) in [
        ("settling_time_weight", config.cost.settling_time_weight),
        ("non_settling_penalty", config.cost.non_settling_penalty),
    ] {
        if !(value.is_finite() && value >= 0.0) {
            anyhow::bail!("cost.{} must be finite and non-negative, got {}", name, value);
        }
    }

    config
        .optimizer
        .validate()
        .map_err(|e| anyhow::anyhow!("optimizer: {}", e))?;

    config
        .gain_limits
        .validate()
        .map_err(|e| anyhow::anyhow!("gain_limits: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_describes_sections() {
        let schema = config_schema().unwrap();
        let properties = schema["properties"].as_object().unwrap();
        for section in [
            "simulator",
            "scenario",
            "steps",
            "optimizer",
            "cost",
            "metrics",
            "gain_limits",
        ] {
            assert!(properties.contains_key(section), "missing {}", section);
        }
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let mut config = AutotuneConfig::default();
        config.simulator.timeout_ms = Some(0);
        assert!(validate_specific_rules(&config).is_err());

        config.simulator.timeout_ms = None;
        assert!(validate_specific_rules(&config).is_ok());
    }

    #[test]
    fn test_non_finite_target_is_rejected() {
        let config = AutotuneConfig {
            scenario: Scenario::Takeoff {
                target: f64::INFINITY,
            },
            ..Default::default()
        };
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn test_negative_penalty_is_rejected() {
        let mut config = AutotuneConfig::default();
        config.cost.non_settling_penalty = -1.0;
        assert!(validate_specific_rules(&config).is_err());
    }
}
