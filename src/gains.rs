// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Gain and step vectors
//!
//! The optimizer walks the three PID gains one [`Dimension`] at a time; both
//! vectors are addressed through it.

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One axis of gain space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Kp,
    Ki,
    Kd,
}

impl Dimension {
    /// Fixed visiting order of the coordinate descent
    pub const ALL: [Dimension; 3] = [Dimension::Kp, Dimension::Ki, Dimension::Kd];
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Kp => write!(f, "Kp"),
            Dimension::Ki => write!(f, "Ki"),
            Dimension::Kd => write!(f, "Kd"),
        }
    }
}

/// Proportional, integral and derivative gains
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct GainVector {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl GainVector {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Kp => self.kp,
            Dimension::Ki => self.ki,
            Dimension::Kd => self.kd,
        }
    }

    pub fn set(&mut self, dimension: Dimension, value: f64) {
        match dimension {
            Dimension::Kp => self.kp = value,
            Dimension::Ki => self.ki = value,
            Dimension::Kd => self.kd = value,
        }
    }

    pub fn is_non_negative(&self) -> bool {
        Dimension::ALL.iter().all(|&d| self.get(d) >= 0.0)
    }
}

impl fmt::Display for GainVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kp={:.6} Ki={:.6} Kd={:.6}", self.kp, self.ki, self.kd)
    }
}

/// Parses `kp,ki,kd`
impl FromStr for GainVector {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split(',')
            .map(|v| {
                v.trim()
                    .parse::<f64>()
                    .map_err(|e| anyhow::anyhow!("Invalid gain '{}': {}", v.trim(), e))
            })
            .collect::<Result<Vec<_>>>()?;

        match values.as_slice() {
            [kp, ki, kd] => Ok(Self::new(*kp, *ki, *kd)),
            _ => anyhow::bail!("Expected three comma separated gains (kp,ki,kd), got '{}'", s),
        }
    }
}

/// Per-dimension perturbation magnitudes, strictly positive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepVector {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl StepVector {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self { kp, ki, kd }
    }

    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Kp => self.kp,
            Dimension::Ki => self.ki,
            Dimension::Kd => self.kd,
        }
    }

    /// Multiply one component by `factor`
    pub fn scale(&mut self, dimension: Dimension, factor: f64) {
        match dimension {
            Dimension::Kp => self.kp *= factor,
            Dimension::Ki => self.ki *= factor,
            Dimension::Kd => self.kd *= factor,
        }
    }

    pub fn sum(&self) -> f64 {
        self.kp + self.ki + self.kd
    }
}

/// Inclusive valid range of one gain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GainRange {
    pub min: f64,
    pub max: f64,
}

impl GainRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Valid ranges applied to tuned gains before they are used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct GainLimits {
    pub kp: GainRange,
    pub ki: GainRange,
    pub kd: GainRange,
}

impl Default for GainLimits {
    fn default() -> Self {
        Self {
            kp: GainRange::new(0.0, 5.0),
            ki: GainRange::new(0.0, 1.0),
            kd: GainRange::new(0.0, 1.0),
        }
    }
}

impl GainLimits {
    pub fn range(&self, dimension: Dimension) -> GainRange {
        match dimension {
            Dimension::Kp => self.kp,
            Dimension::Ki => self.ki,
            Dimension::Kd => self.kd,
        }
    }

    /// Check that every range is non-negative with `min <= max`
    pub fn validate(&self) -> Result<(), String> {
        for dimension in Dimension::ALL {
            let range = self.range(dimension);
            if !(range.min >= 0.0 && range.min <= range.max) {
                return Err(format!(
                    "{} range must satisfy 0 <= min <= max, got [{}, {}]",
                    dimension, range.min, range.max
                ));
            }
        }
        Ok(())
    }

    /// Clamp every component of `gains` into its range
    ///
    /// The ranges must pass [`GainLimits::validate`].
    pub fn clamp(&self, gains: &GainVector) -> GainVector {
        let mut clamped = *gains;
        for dimension in Dimension::ALL {
            let range = self.range(dimension);
            clamped.set(dimension, gains.get(dimension).clamp(range.min, range.max));
        }
        clamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gain_triplet() {
        let gains: GainVector = "0.6, 0.01,0.05".parse().unwrap();
        assert_eq!(gains, GainVector::new(0.6, 0.01, 0.05));

        assert!("0.6,0.01".parse::<GainVector>().is_err());
        assert!("0.6,abc,0.05".parse::<GainVector>().is_err());
    }

    #[test]
    fn test_default_limits_clamp() {
        let limits = GainLimits::default();
        let clamped = limits.clamp(&GainVector::new(7.2, -0.3, 0.4));
        assert_eq!(clamped, GainVector::new(5.0, 0.0, 0.4));
    }

    #[test]
    fn test_validate_rejects_inverted_or_nan_ranges() {
        assert!(GainLimits::default().validate().is_ok());

        let inverted = GainLimits {
            kp: GainRange::new(2.0, 1.0),
            ..Default::default()
        };
        assert!(inverted.validate().unwrap_err().contains("Kp"));

        let nan = GainLimits {
            kd: GainRange::new(0.0, f64::NAN),
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_step_scaling() {
        let mut steps = StepVector::new(0.1, 0.01, 0.01);
        steps.scale(Dimension::Kp, 1.1);
        steps.scale(Dimension::Kd, 0.9);
        assert!((steps.kp - 0.11).abs() < 1e-12);
        assert!((steps.kd - 0.009).abs() < 1e-12);
        assert!((steps.sum() - 0.129).abs() < 1e-12);
    }
}
