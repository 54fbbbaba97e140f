// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Scenario descriptors
//!
//! A scenario describes the target trajectory the plant must follow and
//! decides which part of a telemetry series gets scored:
//! - `takeoff`: a single target for the whole run, scored from the start
//! - `step_response`: the target jumps from `start_target` to `final_target`
//!   at `switch_step`, only the post-switch part is scored

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::telemetry::{TelemetrySample, TelemetrySeries};

/// Target trajectory shape handed unchanged to the simulator on every evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Scenario {
    /// Single-segment scenario: climb from rest to one target
    Takeoff {
        /// Altitude setpoint
        #[serde(default = "default_takeoff_target")]
        target: f64,
    },
    /// Two-segment scenario: hold `start_target`, then switch to `final_target`
    StepResponse {
        /// Setpoint before the switch
        #[serde(default = "default_start_target")]
        start_target: f64,
        /// Setpoint after the switch
        #[serde(default = "default_final_target")]
        final_target: f64,
        /// Simulation step (sample index) at which the setpoint switches
        #[serde(default = "default_switch_step")]
        switch_step: usize,
    },
}

fn default_takeoff_target() -> f64 {
    100.0
}
fn default_start_target() -> f64 {
    50.0
}
fn default_final_target() -> f64 {
    100.0
}
fn default_switch_step() -> usize {
    500
}

impl Default for Scenario {
    fn default() -> Self {
        Scenario::Takeoff {
            target: default_takeoff_target(),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scenario::Takeoff { target } => write!(f, "takeoff to {}", target),
            Scenario::StepResponse {
                start_target,
                final_target,
                switch_step,
            } => write!(
                f,
                "step response {} -> {} at step {}",
                start_target, final_target, switch_step
            ),
        }
    }
}

/// The scored part of a telemetry series
#[derive(Debug, Clone, Copy)]
pub struct Segment<'a> {
    /// Samples to score, never empty
    pub samples: &'a [TelemetrySample],
    /// Setpoint the segment is expected to settle on
    pub target: f64,
    /// Level the plant starts the segment from, used to tell the direction
    /// of the transition
    pub start_value: f64,
    /// Highest setpoint seen anywhere in the series
    pub peak_target: f64,
}

impl Scenario {
    /// Simulator arguments `(target1, target2, switch_step)` for this scenario
    ///
    /// A takeoff is expressed as a step whose two levels are equal.
    pub fn simulator_targets(&self) -> (f64, f64, usize) {
        match *self {
            Scenario::Takeoff { target } => (target, target, 0),
            Scenario::StepResponse {
                start_target,
                final_target,
                switch_step,
            } => (start_target, final_target, switch_step),
        }
    }

    /// Select the segment of `series` this scenario scores
    pub fn segment<'a>(&self, series: &'a TelemetrySeries) -> Segment<'a> {
        let samples = series.samples();
        let peak_target = samples
            .iter()
            .map(|s| s.target)
            .fold(f64::NEG_INFINITY, f64::max);

        match *self {
            Scenario::Takeoff { .. } => Segment {
                samples,
                target: series.last().target,
                start_value: 0.0,
                peak_target,
            },
            Scenario::StepResponse { switch_step, .. } => {
                // Out of range switch points fall back to scoring the whole run
                let switch = if switch_step < samples.len() {
                    switch_step
                } else {
                    0
                };
                let scored = &samples[switch..];
                Segment {
                    samples: scored,
                    target: scored[0].target,
                    start_value: series.first().target,
                    peak_target,
                }
            }
        }
    }
}
