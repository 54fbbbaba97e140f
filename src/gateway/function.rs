// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! In-process gateway backed by a closure

use super::{SimulationFailure, SimulationGateway};
use crate::gains::GainVector;
use crate::scenario::Scenario;
use crate::telemetry::TelemetrySeries;

/// Gateway that calls a simulation function directly
///
/// ```
/// use rust_pid_autotune::gateway::{FnGateway, SimulationGateway};
/// use rust_pid_autotune::gains::GainVector;
/// use rust_pid_autotune::scenario::Scenario;
/// use rust_pid_autotune::telemetry::TelemetrySeries;
///
/// let gateway = FnGateway::new(|gains: &GainVector, _scenario: &Scenario, steps: usize| {
///     let samples = (0..steps).map(|i| (i as f64 * 0.1, 1.0, gains.kp.min(1.0)));
///     Ok(TelemetrySeries::from_tuples(samples)?)
/// });
///
/// let series = gateway
///     .run(&GainVector::new(1.0, 0.0, 0.0), &Scenario::default(), 5)
///     .unwrap();
/// assert_eq!(series.len(), 5);
/// ```
pub struct FnGateway<F> {
    simulate: F,
}

impl<F> FnGateway<F>
where
    F: Fn(&GainVector, &Scenario, usize) -> Result<TelemetrySeries, SimulationFailure>,
{
    pub fn new(simulate: F) -> Self {
        Self { simulate }
    }
}

impl<F> SimulationGateway for FnGateway<F>
where
    F: Fn(&GainVector, &Scenario, usize) -> Result<TelemetrySeries, SimulationFailure>,
{
    fn run(
        &self,
        gains: &GainVector,
        scenario: &Scenario,
        steps: usize,
    ) -> Result<TelemetrySeries, SimulationFailure> {
        (self.simulate)(gains, scenario, steps)
    }
}
