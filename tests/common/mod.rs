//! Closed-loop altitude simulation used as an in-process simulator.
//!
//! Same loop as the flight controller binary: a clamped PID drives an
//! integrating altitude plant at `dt = 0.1`, without sensor noise so runs
//! are reproducible.

#![allow(dead_code)]

use rust_pid_autotune::gateway::FnGateway;
use rust_pid_autotune::{
    GainVector, Scenario, SimulationFailure, SimulationGateway, TelemetrySeries,
};

pub const DT: f64 = 0.1;
const OUTPUT_LIMIT: f64 = 500.0;

struct Pid {
    gains: GainVector,
    integral: f64,
    previous_error: f64,
}

impl Pid {
    fn new(gains: GainVector) -> Self {
        Self {
            gains,
            integral: 0.0,
            previous_error: 0.0,
        }
    }

    fn update(&mut self, setpoint: f64, process_variable: f64) -> f64 {
        let error = setpoint - process_variable;
        self.integral += error * DT;
        let derivative = (error - self.previous_error) / DT;
        self.previous_error = error;

        let output =
            self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative;
        output.clamp(-OUTPUT_LIMIT, OUTPUT_LIMIT)
    }
}

/// Simulate `steps` control cycles for `gains` under `scenario`
pub fn simulate(
    gains: &GainVector,
    scenario: &Scenario,
    steps: usize,
) -> Result<TelemetrySeries, SimulationFailure> {
    let (target1, target2, switch_step) = scenario.simulator_targets();
    let mut pid = Pid::new(*gains);
    let mut altitude = 0.0;

    let samples = (0..steps).map(|i| {
        let target = if i < switch_step { target1 } else { target2 };
        let sample = (i as f64 * DT, target, altitude);
        altitude += pid.update(target, altitude) * DT;
        sample
    });

    Ok(TelemetrySeries::from_tuples(samples.collect::<Vec<_>>())?)
}

/// Gateway running [`simulate`] in-process
pub fn altitude_gateway() -> impl SimulationGateway {
    FnGateway::new(simulate)
}
