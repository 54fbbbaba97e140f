// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-pid-autotune project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! JSON report output
//!
//! Infinite costs and settling times serialize as `null`.

use anyhow::{Context, Result};
use rust_pid_autotune::TuningReport;
use std::fs;
use std::path::Path;

pub fn write_json_report(report: &TuningReport, output_path: &Path) -> Result<()> {
    let json =
        serde_json::to_string_pretty(report).context("Failed to serialize tuning report")?;
    fs::write(output_path, json)
        .with_context(|| format!("Failed to write report to {:?}", output_path))?;
    Ok(())
}
