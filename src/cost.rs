// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Cost strategies
//!
//! Collapse a [`MetricsTriple`] into the single value the optimizer ranks
//! candidates by. Lower is better.

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::metrics::MetricsTriple;

/// Named cost strategy
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema, ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum CostStrategy {
    /// Tracking accuracy only (RMSE)
    Accuracy,
    /// RMSE plus a settling time penalty
    #[default]
    Balanced,
}

impl fmt::Display for CostStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostStrategy::Accuracy => write!(f, "accuracy"),
            CostStrategy::Balanced => write!(f, "balanced"),
        }
    }
}

/// Cost configuration: strategy and the weights of the balanced strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CostConfig {
    /// Strategy used to rank candidate gains
    pub strategy: CostStrategy,
    /// Seconds of settling time are multiplied by this weight
    pub settling_time_weight: f64,
    /// Penalty added when the response never settles
    pub non_settling_penalty: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            strategy: CostStrategy::default(),
            settling_time_weight: 0.5,
            non_settling_penalty: 100.0,
        }
    }
}

impl CostConfig {
    /// Same weights, different strategy
    pub fn with_strategy(&self, strategy: CostStrategy) -> Self {
        Self {
            strategy,
            ..self.clone()
        }
    }

    /// Cost of `metrics` under the configured strategy
    pub fn cost(&self, metrics: &MetricsTriple) -> f64 {
        match self.strategy {
            CostStrategy::Accuracy => metrics.rmse,
            CostStrategy::Balanced => {
                let time_penalty = if metrics.settling_time.is_finite() {
                    metrics.settling_time * self.settling_time_weight
                } else {
                    self.non_settling_penalty
                };
                metrics.rmse + time_penalty
            }
        }
    }
}

/// Cost of `metrics` under `strategy` with the default weights
pub fn cost(metrics: &MetricsTriple, strategy: CostStrategy) -> f64 {
    CostConfig::default().with_strategy(strategy).cost(metrics)
}
