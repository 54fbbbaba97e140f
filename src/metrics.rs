// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Metrics engine
//!
//! Extracts control quality measures from one telemetry series:
//! - RMSE of the tracking error over the scored segment
//! - Direction-aware overshoot, as a percentage of the target
//! - Settling time using the last excursion out of the tolerance band
//!
//! The scored segment is chosen by the [`Scenario`], see
//! [`Scenario::segment`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::scenario::{Scenario, Segment};
use crate::telemetry::TelemetrySeries;

/// Quality measures of one simulation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsTriple {
    /// Root-mean-square tracking error
    pub rmse: f64,
    /// Peak excursion beyond the target, in percent of the target
    pub overshoot_percent: f64,
    /// Time from segment start until the response stays in the tolerance
    /// band, `+inf` when it never settles
    pub settling_time: f64,
}

impl MetricsTriple {
    pub fn is_settled(&self) -> bool {
        self.settling_time.is_finite()
    }
}

/// Which setpoint overshoot is measured against in two-segment scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum OvershootReference {
    /// The setpoint of the scored segment (post-switch target)
    #[default]
    SegmentTarget,
    /// The highest setpoint of the whole scenario
    PeakTarget,
}

/// Metrics engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MetricsSettings {
    /// Half-width of the settling band as a fraction of the target
    pub tolerance: f64,
    /// Overshoot reference for ascending transitions
    pub overshoot_reference: OvershootReference,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            tolerance: 0.02,
            overshoot_reference: OvershootReference::default(),
        }
    }
}

/// Score `series` under `scenario`
pub fn evaluate(
    series: &TelemetrySeries,
    scenario: &Scenario,
    settings: &MetricsSettings,
) -> MetricsTriple {
    let segment = scenario.segment(series);

    MetricsTriple {
        rmse: rmse(&segment),
        overshoot_percent: overshoot_percent(&segment, settings.overshoot_reference),
        settling_time: settling_time(&segment, settings.tolerance),
    }
}

/// Root-mean-square of `target - actual` over the segment
pub fn rmse(segment: &Segment<'_>) -> f64 {
    let sum_sq: f64 = segment.samples.iter().map(|s| s.error().powi(2)).sum();
    (sum_sq / segment.samples.len() as f64).sqrt()
}

/// Overshoot percentage, always non-negative
///
/// An ascending transition (`target > start_value`) overshoots above the
/// reference, a descending or level one overshoots below the target.
pub fn overshoot_percent(segment: &Segment<'_>, reference: OvershootReference) -> f64 {
    let target = segment.target;

    let (overshoot, base) = if target > segment.start_value {
        let base = match reference {
            OvershootReference::SegmentTarget => target,
            OvershootReference::PeakTarget => segment.peak_target.max(target),
        };
        let peak = segment
            .samples
            .iter()
            .map(|s| s.actual)
            .fold(f64::NEG_INFINITY, f64::max);
        ((peak - base).max(0.0), base)
    } else {
        let trough = segment
            .samples
            .iter()
            .map(|s| s.actual)
            .fold(f64::INFINITY, f64::min);
        ((target - trough).max(0.0), target)
    };

    if base == 0.0 {
        return 0.0;
    }
    overshoot / base.abs() * 100.0
}

/// Settling time with a `[target*(1-tol), target*(1+tol)]` band
///
/// Measured up to the last sample outside the band. Zero when the segment
/// never leaves the band, `+inf` when the final sample is still outside.
pub fn settling_time(segment: &Segment<'_>, tolerance: f64) -> f64 {
    let a = segment.target * (1.0 - tolerance);
    let b = segment.target * (1.0 + tolerance);
    let (low, high) = (a.min(b), a.max(b));

    let last_excursion = segment
        .samples
        .iter()
        .rposition(|s| s.actual < low || s.actual > high);

    match last_excursion {
        None => 0.0,
        Some(index) if index == segment.samples.len() - 1 => f64::INFINITY,
        Some(index) => segment.samples[index].time - segment.samples[0].time,
    }
}
