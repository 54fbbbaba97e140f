// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Console output of tuning and evaluation results

use rust_pid_autotune::{CostStrategy, Evaluation, GainVector, MetricsTriple, TuningReport};

const HIGH_OVERSHOOT_PERCENT: f64 = 20.0;
const LOW_OVERSHOOT_PERCENT: f64 = 5.0;
const HIGH_RMSE: f64 = 10.0;

/// Advice derived from the metrics of the tuned response
pub fn recommendations(metrics: &MetricsTriple) -> Vec<&'static str> {
    let mut advice = Vec::new();
    if !metrics.is_settled() {
        advice.push("⚠️  The response never settles. Consider reducing Kp or increasing Kd.");
    }
    if metrics.overshoot_percent > HIGH_OVERSHOOT_PERCENT {
        advice.push("⚠️  High overshoot detected. Consider reducing Kp or increasing Kd.");
    }
    if metrics.rmse > HIGH_RMSE {
        advice.push("⚠️  Large tracking error. Consider increasing Kp or Ki.");
    }
    if advice.is_empty() && metrics.overshoot_percent < LOW_OVERSHOOT_PERCENT {
        advice.push("✅ Good balance between stability and response time.");
    }
    advice
}

fn format_cost(cost: f64) -> String {
    if cost.is_finite() {
        format!("{:.6}", cost)
    } else {
        "inf (simulation failed)".to_string()
    }
}

fn display_gains(gains: &GainVector) {
    println!("   ╭─────────────────────────────────────────╮");
    println!("   │  Kp = {:<12.6}                      │", gains.kp);
    println!("   │  Ki = {:<12.6}                      │", gains.ki);
    println!("   │  Kd = {:<12.6}                      │", gains.kd);
    println!("   ╰─────────────────────────────────────────╯");
}

fn display_metrics(metrics: &MetricsTriple) {
    println!("\n📊 Performance Metrics:");
    println!("   • RMSE:               {:.4}", metrics.rmse);
    println!("   • Overshoot:          {:.2} %", metrics.overshoot_percent);
    if metrics.is_settled() {
        println!("   • Settling Time:      {:.2} s", metrics.settling_time);
    } else {
        println!("   • Settling Time:      never settled");
    }

    println!("\n💡 Recommendations:");
    for line in recommendations(metrics) {
        println!("   {}", line);
    }
}

/// Print the outcome of a tuning run
pub fn display_tuning_results(report: &TuningReport) {
    println!(
        "\n🎯 PID Tuning Results ({}, {} strategy):",
        report.scenario, report.strategy
    );
    display_gains(&report.gains);
    if report.gains != report.raw_gains {
        println!("   (clamped from {})", report.raw_gains);
    }

    println!("\n🔁 Search:");
    println!("   • Seed cost:          {}", format_cost(report.seed_cost));
    println!("   • Best cost:          {}", format_cost(report.cost));
    println!("   • Iterations:         {}", report.iterations);
    println!("   • Cost evaluations:   {}", report.evaluations);
    println!("   • Simulator runs:     {}", report.simulations);
    println!("   • Failed runs:        {}", report.failed_simulations);
    println!(
        "   • Converged:          {}",
        if report.converged { "yes" } else { "no (budget exhausted)" }
    );

    match &report.final_evaluation.metrics {
        Some(metrics) => display_metrics(metrics),
        None => println!("\n❌ The tuned gains could not be simulated."),
    }
}

/// Print the score of a single gain vector
pub fn display_evaluation(gains: &GainVector, evaluation: &Evaluation, strategy: CostStrategy) {
    println!("\n🧪 Evaluation ({} strategy):", strategy);
    display_gains(gains);
    println!("\n   • Cost:               {}", format_cost(evaluation.cost));
    match &evaluation.metrics {
        Some(metrics) => display_metrics(metrics),
        None => println!("\n❌ Simulation failed."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendations_for_clean_response() {
        let metrics = MetricsTriple {
            rmse: 2.0,
            overshoot_percent: 1.0,
            settling_time: 5.0,
        };
        let advice = recommendations(&metrics);
        assert_eq!(advice.len(), 1);
        assert!(advice[0].starts_with("✅"));
    }

    #[test]
    fn test_recommendations_for_oscillating_response() {
        let metrics = MetricsTriple {
            rmse: 25.0,
            overshoot_percent: 45.0,
            settling_time: f64::INFINITY,
        };
        let advice = recommendations(&metrics);
        assert_eq!(advice.len(), 3);
        assert!(advice.iter().all(|line| line.starts_with("⚠️")));
    }

    #[test]
    fn test_format_cost() {
        assert_eq!(format_cost(1.5), "1.500000");
        assert!(format_cost(f64::INFINITY).starts_with("inf"));
    }
}
