// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Twiddle coordinate descent
//!
//! Derivative-free local search over the three PID gains. Each pass visits
//! Kp, Ki and Kd in that order; for every dimension the gain is nudged up by
//! its step, then down, and the step is widened on success or narrowed when
//! both directions fail. The search stops when the steps have shrunk below
//! the convergence threshold or the iteration budget is spent, one iteration
//! being one visited dimension.
//!
//! The optimizer only enforces non-negative gains. Upper limits are applied
//! by the caller, see [`crate::tuner`].

use log::{debug, info};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::gains::{Dimension, GainVector, StepVector};

/// Receives the search progress, a fraction in `[0, 1]`, after every
/// dimension update
pub trait ProgressSink {
    fn report(&mut self, fraction: f64);
}

impl<F: FnMut(f64)> ProgressSink for F {
    fn report(&mut self, fraction: f64) {
        self(fraction)
    }
}

/// Progress sink writing to the log every `step` percent
pub struct LogProgress {
    step: f64,
    next: f64,
}

impl LogProgress {
    pub fn new(step_percent: f64) -> Self {
        let step = (step_percent / 100.0).clamp(0.01, 1.0);
        Self { step, next: step }
    }
}

impl ProgressSink for LogProgress {
    fn report(&mut self, fraction: f64) {
        if fraction + f64::EPSILON >= self.next {
            info!("Tuning progress: {:.0}%", fraction * 100.0);
            while self.next <= fraction + f64::EPSILON {
                self.next += self.step;
            }
        }
    }
}

/// Twiddle search parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TwiddleConfig {
    /// Seed gains
    pub initial_gains: GainVector,
    /// Seed perturbation per dimension
    pub initial_steps: StepVector,
    /// Search stops once the sum of the steps falls to this value
    pub convergence_threshold: f64,
    /// Iteration budget, one iteration per visited dimension
    pub max_iterations: usize,
    /// Step multiplier after an accepted move
    pub step_growth: f64,
    /// Step multiplier after both directions failed
    pub step_shrink: f64,
    /// Simulations averaged per candidate, above 1 for noisy simulators
    pub evaluations_per_candidate: usize,
}

impl Default for TwiddleConfig {
    fn default() -> Self {
        Self {
            initial_gains: GainVector::new(0.5, 0.0, 0.0),
            initial_steps: StepVector::new(0.1, 0.01, 0.01),
            convergence_threshold: 0.005,
            max_iterations: 30,
            step_growth: 1.1,
            step_shrink: 0.9,
            evaluations_per_candidate: 1,
        }
    }
}

impl TwiddleConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.initial_gains.is_non_negative() {
            return Err(format!(
                "initial_gains must be non-negative, got {}",
                self.initial_gains
            ));
        }
        for dimension in Dimension::ALL {
            let step = self.initial_steps.get(dimension);
            if !(step > 0.0 && step.is_finite()) {
                return Err(format!(
                    "initial_steps.{} must be strictly positive, got {}",
                    dimension.to_string().to_lowercase(),
                    step
                ));
            }
        }
        if !(self.convergence_threshold >= 0.0) {
            return Err("convergence_threshold must be non-negative".to_string());
        }
        if self.max_iterations == 0 {
            return Err("max_iterations must be greater than 0".to_string());
        }
        if !(self.step_growth > 1.0) {
            return Err(format!("step_growth must be above 1, got {}", self.step_growth));
        }
        if !(self.step_shrink > 0.0 && self.step_shrink < 1.0) {
            return Err(format!(
                "step_shrink must be in (0, 1), got {}",
                self.step_shrink
            ));
        }
        if self.evaluations_per_candidate == 0 {
            return Err("evaluations_per_candidate must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Result of one Twiddle run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TwiddleOutcome {
    /// Best gains found, all components non-negative
    pub gains: GainVector,
    /// Cost of `gains`
    pub cost: f64,
    /// Cost of the seed gains
    pub seed_cost: f64,
    /// Step vector when the search stopped
    pub steps: StepVector,
    /// Iterations used (visited dimensions)
    pub iterations: usize,
    /// Cost function calls, seed included
    pub evaluations: usize,
    /// True when the steps fell below the threshold before the budget ran out
    pub converged: bool,
}

/// Twiddle optimizer
#[derive(Debug, Clone)]
pub struct Twiddle {
    config: TwiddleConfig,
}

impl Twiddle {
    pub fn new(config: TwiddleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TwiddleConfig {
        &self.config
    }

    /// Minimize `cost` starting from the configured seed
    ///
    /// `cost` may return `f64::INFINITY` for candidates that cannot be
    /// scored, they are simply never accepted. The returned cost is never
    /// above the seed cost.
    pub fn optimize<C, P>(&self, mut cost: C, progress: &mut P) -> TwiddleOutcome
    where
        C: FnMut(&GainVector) -> f64,
        P: ProgressSink + ?Sized,
    {
        let config = &self.config;
        let mut gains = config.initial_gains;
        for dimension in Dimension::ALL {
            gains.set(dimension, gains.get(dimension).max(0.0));
        }
        let mut steps = config.initial_steps;

        let seed_cost = cost(&gains);
        let mut best_cost = seed_cost;
        let mut evaluations = 1;
        let mut iteration = 0;

        debug!("Twiddle seed {} -> cost {:.6}", gains, seed_cost);

        while steps.sum() > config.convergence_threshold && iteration < config.max_iterations {
            for dimension in Dimension::ALL {
                let original = gains.get(dimension);
                let step = steps.get(dimension);

                gains.set(dimension, (original + step).max(0.0));
                let up = cost(&gains);
                evaluations += 1;

                if up < best_cost {
                    best_cost = up;
                    steps.scale(dimension, config.step_growth);
                    debug!("{} up: {} -> cost {:.6}", dimension, gains, best_cost);
                } else {
                    gains.set(dimension, (original - step).max(0.0));
                    let down = cost(&gains);
                    evaluations += 1;

                    if down < best_cost {
                        best_cost = down;
                        steps.scale(dimension, config.step_growth);
                        debug!("{} down: {} -> cost {:.6}", dimension, gains, best_cost);
                    } else {
                        gains.set(dimension, original);
                        steps.scale(dimension, config.step_shrink);
                    }
                }

                iteration += 1;
                progress.report((iteration as f64 / config.max_iterations as f64).min(1.0));
            }
        }

        let converged = steps.sum() <= config.convergence_threshold;
        info!(
            "Twiddle finished after {} iterations ({} evaluations): {} cost {:.6}{}",
            iteration,
            evaluations,
            gains,
            best_cost,
            if converged { "" } else { " (budget exhausted)" }
        );

        TwiddleOutcome {
            gains,
            cost: best_cost,
            seed_cost,
            steps,
            iterations: iteration,
            evaluations,
            converged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bowl(center: GainVector) -> impl Fn(&GainVector) -> f64 {
        move |g: &GainVector| {
            (g.kp - center.kp).powi(2) + (g.ki - center.ki).powi(2) + (g.kd - center.kd).powi(2)
        }
    }

    fn long_run() -> TwiddleConfig {
        TwiddleConfig {
            convergence_threshold: 1e-4,
            max_iterations: 3000,
            ..Default::default()
        }
    }

    #[test]
    fn test_finds_bowl_minimum() {
        let outcome = Twiddle::new(long_run())
            .optimize(bowl(GainVector::new(1.2, 0.3, 0.05)), &mut |_: f64| {});

        assert!(outcome.converged);
        assert!((outcome.gains.kp - 1.2).abs() < 1e-3);
        assert!((outcome.gains.ki - 0.3).abs() < 1e-3);
        assert!((outcome.gains.kd - 0.05).abs() < 1e-3);
        assert!(outcome.cost < 1e-6);
        assert!(outcome.iterations < 3000);
        assert_eq!(outcome.iterations % 3, 0);
    }

    #[test]
    fn test_gains_never_negative() {
        let outcome = Twiddle::new(long_run())
            .optimize(bowl(GainVector::new(-1.0, 0.2, -0.5)), &mut |_: f64| {});

        assert!(outcome.gains.is_non_negative());
        assert_eq!(outcome.gains.kp, 0.0);
        assert_eq!(outcome.gains.kd, 0.0);
        assert!((outcome.gains.ki - 0.2).abs() < 1e-3);
    }

    #[test]
    fn test_cost_never_worse_than_seed() {
        let outcome = Twiddle::new(TwiddleConfig::default())
            .optimize(bowl(GainVector::new(3.0, 0.7, 0.4)), &mut |_: f64| {});
        assert!(outcome.cost <= outcome.seed_cost);
    }

    #[test]
    fn test_budget_counts_dimensions() {
        // Flat landscape: every probe fails, steps only shrink
        let outcome = Twiddle::new(TwiddleConfig::default())
            .optimize(|_: &GainVector| 1.0, &mut |_: f64| {});

        assert!(!outcome.converged);
        assert_eq!(outcome.iterations, 30);
        assert_eq!(outcome.evaluations, 1 + 2 * 30);
        assert_eq!(outcome.gains, GainVector::new(0.5, 0.0, 0.0));
        let expected_kp_step = 0.1 * 0.9_f64.powi(10);
        assert!((outcome.steps.kp - expected_kp_step).abs() < 1e-12);
    }

    #[test]
    fn test_failed_probes_restore_gain_at_zero_boundary() {
        // Any positive Ki costs more; the downward probe clamps to zero and
        // ties, so Ki has to come back to exactly zero
        let outcome = Twiddle::new(TwiddleConfig::default())
            .optimize(|g: &GainVector| (g.kp - 0.5).abs() + g.ki + g.kd, &mut |_: f64| {});

        assert_eq!(outcome.gains.ki, 0.0);
        assert_eq!(outcome.gains.kd, 0.0);
    }

    #[test]
    fn test_unscorable_candidates_keep_seed() {
        let outcome = Twiddle::new(TwiddleConfig::default())
            .optimize(|_: &GainVector| f64::INFINITY, &mut |_: f64| {});

        assert!(outcome.cost.is_infinite());
        assert_eq!(outcome.gains, TwiddleConfig::default().initial_gains);
    }

    #[test]
    fn test_progress_reports_every_dimension() {
        let mut reports = Vec::new();
        let outcome = Twiddle::new(TwiddleConfig::default())
            .optimize(bowl(GainVector::new(2.0, 0.1, 0.1)), &mut |f: f64| reports.push(f));

        assert_eq!(reports.len(), outcome.iterations);
        assert!(reports.iter().all(|f| (0.0..=1.0).contains(f)));
        assert!(reports.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*reports.last().unwrap(), 1.0);
    }

    #[test]
    fn test_reproducible() {
        let twiddle = Twiddle::new(TwiddleConfig::default());
        let a = twiddle.optimize(bowl(GainVector::new(1.0, 0.2, 0.1)), &mut |_: f64| {});
        let b = twiddle.optimize(bowl(GainVector::new(1.0, 0.2, 0.1)), &mut |_: f64| {});
        assert_eq!(a, b);
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        assert!(TwiddleConfig::default().validate().is_ok());

        let mut config = TwiddleConfig::default();
        config.initial_steps.ki = 0.0;
        assert!(config.validate().is_err());

        let config = TwiddleConfig {
            step_shrink: 1.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = TwiddleConfig {
            initial_gains: GainVector::new(-0.1, 0.0, 0.0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
