// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Auto-tuning entry point
//!
//! Wires the pieces together for one tuning run:
//!
//! ```text
//! Twiddle -> SimulationGateway -> metrics::evaluate -> CostConfig::cost -> Twiddle
//! ```
//!
//! A failed simulation never aborts the search: the candidate is logged and
//! scored `+inf`. Tuned gains are clamped into the configured [`GainLimits`]
//! before they are reported, the optimizer itself only keeps them
//! non-negative.

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use crate::config::AutotuneConfig;
use crate::cost::{CostConfig, CostStrategy};
use crate::gains::{GainLimits, GainVector, StepVector};
use crate::gateway::SimulationGateway;
use crate::metrics::{self, MetricsSettings, MetricsTriple};
use crate::optimizer::{ProgressSink, Twiddle, TwiddleConfig};
use crate::scenario::Scenario;

/// Score of one candidate gain vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    /// Cost under the active strategy, `+inf` when a simulation failed
    pub cost: f64,
    /// Metrics (averaged over repeats), absent when a simulation failed
    pub metrics: Option<MetricsTriple>,
}

impl Evaluation {
    pub fn failed() -> Self {
        Self {
            cost: f64::INFINITY,
            metrics: None,
        }
    }
}

/// Scores gain vectors against one scenario
pub struct Evaluator<'a, G: SimulationGateway + ?Sized> {
    gateway: &'a G,
    scenario: &'a Scenario,
    steps: usize,
    metrics: &'a MetricsSettings,
    cost: CostConfig,
    repeats: usize,
    simulations: usize,
    failures: usize,
}

impl<'a, G: SimulationGateway + ?Sized> Evaluator<'a, G> {
    pub fn new(
        gateway: &'a G,
        scenario: &'a Scenario,
        steps: usize,
        metrics: &'a MetricsSettings,
        cost: CostConfig,
    ) -> Self {
        Self {
            gateway,
            scenario,
            steps,
            metrics,
            cost,
            repeats: 1,
            simulations: 0,
            failures: 0,
        }
    }

    /// Average `repeats` simulations per candidate
    pub fn with_repeats(mut self, repeats: usize) -> Self {
        self.repeats = repeats.max(1);
        self
    }

    /// Number of simulator runs so far
    pub fn simulations(&self) -> usize {
        self.simulations
    }

    /// Number of failed simulations so far
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Simulate and score `gains`
    ///
    /// With repeats, costs and metrics are averaged; any failed repeat makes
    /// the whole candidate a failure.
    pub fn evaluate(&mut self, gains: &GainVector) -> Evaluation {
        let mut cost_sum = 0.0;
        let mut rmse_sum = 0.0;
        let mut overshoot_sum = 0.0;
        let mut settling_sum = 0.0;

        for _ in 0..self.repeats {
            self.simulations += 1;
            let series = match self.gateway.run(gains, self.scenario, self.steps) {
                Ok(series) => series,
                Err(e) => {
                    self.failures += 1;
                    warn!("Simulation failed for {}: {}", gains, e);
                    return Evaluation::failed();
                }
            };

            let m = metrics::evaluate(&series, self.scenario, self.metrics);
            cost_sum += self.cost.cost(&m);
            rmse_sum += m.rmse;
            overshoot_sum += m.overshoot_percent;
            settling_sum += m.settling_time;
        }

        let n = self.repeats as f64;
        let mut cost = cost_sum / n;
        if cost.is_nan() {
            cost = f64::INFINITY;
        }
        let metrics = MetricsTriple {
            rmse: rmse_sum / n,
            overshoot_percent: overshoot_sum / n,
            settling_time: settling_sum / n,
        };

        debug!(
            "{} -> cost {:.6} (rmse {:.4}, overshoot {:.2}%, settling {:.2}s)",
            gains, cost, metrics.rmse, metrics.overshoot_percent, metrics.settling_time
        );

        Evaluation {
            cost,
            metrics: Some(metrics),
        }
    }
}

/// Everything a tuning run needs besides the gateway and the scenario
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TuningSettings {
    pub optimizer: TwiddleConfig,
    pub cost: CostConfig,
    pub metrics: MetricsSettings,
    pub limits: GainLimits,
}

impl TuningSettings {
    /// Check the settings the search and the final clamp rely on
    pub fn validate(&self) -> Result<()> {
        self.optimizer
            .validate()
            .map_err(|e| anyhow::anyhow!("optimizer: {}", e))?;
        self.limits
            .validate()
            .map_err(|e| anyhow::anyhow!("gain limits: {}", e))?;
        Ok(())
    }
}

impl From<&AutotuneConfig> for TuningSettings {
    fn from(config: &AutotuneConfig) -> Self {
        Self {
            optimizer: config.optimizer.clone(),
            cost: config.cost.clone(),
            metrics: config.metrics.clone(),
            limits: config.gain_limits.clone(),
        }
    }
}

/// Summary of one tuning run
#[derive(Debug, Clone, Serialize)]
pub struct TuningReport {
    pub generated_at: DateTime<Utc>,
    pub scenario: Scenario,
    pub strategy: CostStrategy,
    pub steps: usize,
    /// Gains returned by the optimizer
    pub raw_gains: GainVector,
    /// Gains clamped into the valid ranges, the ones to use
    pub gains: GainVector,
    /// Optimizer cost of `raw_gains`
    pub cost: f64,
    /// Cost of the seed gains
    pub seed_cost: f64,
    /// Score of `gains`
    pub final_evaluation: Evaluation,
    pub iterations: usize,
    /// Candidate scorings requested by the optimizer, seed included
    pub evaluations: usize,
    /// Simulator runs, repeats and the final evaluation included
    pub simulations: usize,
    /// Simulator runs that failed, counted like `simulations`
    pub failed_simulations: usize,
    pub converged: bool,
    pub final_steps: StepVector,
}

/// Tunes PID gains through a simulation gateway
pub struct AutoTuner<G> {
    gateway: G,
    settings: TuningSettings,
}

impl<G: SimulationGateway> AutoTuner<G> {
    /// Create a tuner, rejecting settings the search cannot run with
    pub fn new(gateway: G, settings: TuningSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { gateway, settings })
    }

    pub fn settings(&self) -> &TuningSettings {
        &self.settings
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    fn evaluator<'a>(
        &'a self,
        scenario: &'a Scenario,
        steps: usize,
        strategy: CostStrategy,
    ) -> Evaluator<'a, G> {
        Evaluator::new(
            &self.gateway,
            scenario,
            steps,
            &self.settings.metrics,
            self.settings.cost.with_strategy(strategy),
        )
        .with_repeats(self.settings.optimizer.evaluations_per_candidate)
    }

    /// Score a single gain vector without searching
    pub fn evaluate_gains(
        &self,
        gains: &GainVector,
        scenario: &Scenario,
        steps: usize,
        strategy: CostStrategy,
    ) -> Evaluation {
        self.evaluator(scenario, steps, strategy).evaluate(gains)
    }

    /// Run the Twiddle search and return the tuned, range-limited gains
    pub fn tune<P>(
        &self,
        scenario: &Scenario,
        steps: usize,
        strategy: CostStrategy,
        progress: &mut P,
    ) -> TuningReport
    where
        P: ProgressSink + ?Sized,
    {
        info!(
            "Tuning {} over {} steps with the {} strategy",
            scenario, steps, strategy
        );

        let mut evaluator = self.evaluator(scenario, steps, strategy);
        let twiddle = Twiddle::new(self.settings.optimizer.clone());
        let outcome = twiddle.optimize(|gains: &GainVector| evaluator.evaluate(gains).cost, progress);

        let gains = self.settings.limits.clamp(&outcome.gains);
        if gains != outcome.gains {
            info!("Tuned gains {} clamped to {}", outcome.gains, gains);
        }
        let final_evaluation = evaluator.evaluate(&gains);

        TuningReport {
            generated_at: Utc::now(),
            scenario: scenario.clone(),
            strategy,
            steps,
            raw_gains: outcome.gains,
            gains,
            cost: outcome.cost,
            seed_cost: outcome.seed_cost,
            final_evaluation,
            iterations: outcome.iterations,
            evaluations: outcome.evaluations,
            simulations: evaluator.simulations(),
            failed_simulations: evaluator.failures(),
            converged: outcome.converged,
            final_steps: outcome.steps,
        }
    }
}

/// Run the search with default metrics and cost weights
///
/// Returns the optimizer's gains, not clamped into any limits, and their cost.
pub fn optimize<G, P>(
    gateway: &G,
    scenario: &Scenario,
    steps: usize,
    strategy: CostStrategy,
    config: &TwiddleConfig,
    progress: &mut P,
) -> (GainVector, f64)
where
    G: SimulationGateway + ?Sized,
    P: ProgressSink + ?Sized,
{
    let metrics = MetricsSettings::default();
    let mut evaluator = Evaluator::new(
        gateway,
        scenario,
        steps,
        &metrics,
        CostConfig::default().with_strategy(strategy),
    )
    .with_repeats(config.evaluations_per_candidate);

    let outcome = Twiddle::new(config.clone())
        .optimize(|gains: &GainVector| evaluator.evaluate(gains).cost, progress);
    (outcome.gains, outcome.cost)
}
