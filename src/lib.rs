// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust PID auto-tuning library
//!
//! Tunes the gains of a PID controller against an external simulator:
//! a metrics engine scores each simulated response (RMSE, overshoot,
//! settling time), a cost strategy turns the metrics into one number, and a
//! Twiddle coordinate descent searches gain space for the lowest cost.

pub mod config;
pub mod cost;
pub mod gains;
pub mod gateway;
pub mod metrics;
pub mod optimizer;
pub mod scenario;
pub mod telemetry;
pub mod tuner;

pub use config::AutotuneConfig;
pub use cost::{CostConfig, CostStrategy};
pub use gains::{GainLimits, GainVector, StepVector};
pub use gateway::{SimulationFailure, SimulationGateway};
pub use metrics::{MetricsSettings, MetricsTriple};
pub use optimizer::{ProgressSink, Twiddle, TwiddleConfig, TwiddleOutcome};
pub use scenario::Scenario;
pub use telemetry::{TelemetrySample, TelemetrySeries};
pub use tuner::{AutoTuner, Evaluation, TuningReport, TuningSettings};
