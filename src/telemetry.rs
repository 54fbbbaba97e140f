// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Telemetry data model
//!
//! A simulation run produces one [`TelemetrySeries`]: an ordered sequence of
//! `(time, target, actual)` samples. Series are validated on construction so
//! that the metrics engine can rely on a non-empty, time-ascending input.

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Errors raised while building or reading a telemetry series
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Telemetry series is empty")]
    Empty,
    #[error("Sample {index} has an invalid time {time}")]
    InvalidTime { index: usize, time: f64 },
    #[error("Sample {index} goes back in time ({time} < {previous})")]
    NonMonotonicTime {
        index: usize,
        time: f64,
        previous: f64,
    },
    #[error("Failed to decode telemetry CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// One telemetry sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Simulation time in seconds
    pub time: f64,
    /// Setpoint the controller was tracking at this instant
    pub target: f64,
    /// Measured plant output
    pub actual: f64,
}

impl TelemetrySample {
    pub fn new(time: f64, target: f64, actual: f64) -> Self {
        Self {
            time,
            target,
            actual,
        }
    }

    /// Tracking error `target - actual`
    pub fn error(&self) -> f64 {
        self.target - self.actual
    }
}

/// Row layout of the simulator's telemetry file (`Time,Target,Actual,Output`)
///
/// Extra columns such as the controller output are ignored.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Time", alias = "time")]
    time: f64,
    #[serde(rename = "Target", alias = "target")]
    target: f64,
    #[serde(rename = "Actual", alias = "actual")]
    actual: f64,
}

/// Immutable, validated telemetry of one simulation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySeries {
    samples: Vec<TelemetrySample>,
}

impl TelemetrySeries {
    /// Build a series, checking that it is non-empty and that time is
    /// finite, non-negative and non-decreasing.
    pub fn new(samples: Vec<TelemetrySample>) -> Result<Self, TelemetryError> {
        if samples.is_empty() {
            return Err(TelemetryError::Empty);
        }

        let mut previous = 0.0_f64;
        for (index, sample) in samples.iter().enumerate() {
            if !sample.time.is_finite() || sample.time < 0.0 {
                return Err(TelemetryError::InvalidTime {
                    index,
                    time: sample.time,
                });
            }
            if index > 0 && sample.time < previous {
                return Err(TelemetryError::NonMonotonicTime {
                    index,
                    time: sample.time,
                    previous,
                });
            }
            previous = sample.time;
        }

        Ok(Self { samples })
    }

    /// Build a series from `(time, target, actual)` tuples
    pub fn from_tuples<I>(tuples: I) -> Result<Self, TelemetryError>
    where
        I: IntoIterator<Item = (f64, f64, f64)>,
    {
        Self::new(
            tuples
                .into_iter()
                .map(|(time, target, actual)| TelemetrySample::new(time, target, actual))
                .collect(),
        )
    }

    /// Parse a telemetry CSV stream with a `Time,Target,Actual` header
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, TelemetryError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let samples = csv_reader
            .deserialize::<CsvRow>()
            .map(|row| row.map(|r| TelemetrySample::new(r.time, r.target, r.actual)))
            .collect::<Result<Vec<_>, csv::Error>>()?;

        Self::new(samples)
    }

    /// Parse the telemetry file written by the simulator
    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> Result<Self, TelemetryError> {
        let file = std::fs::File::open(path.as_ref()).map_err(csv::Error::from)?;
        Self::from_csv_reader(file)
    }

    pub fn samples(&self) -> &[TelemetrySample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false, a series holds at least one sample
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> &TelemetrySample {
        &self.samples[0]
    }

    pub fn last(&self) -> &TelemetrySample {
        &self.samples[self.samples.len() - 1]
    }
}
