//! `warecost anomalies`: queries with unusual cost.

use super::{AnalysisArgs, print_json, render, run};
use anyhow::Result;
use colored::Colorize;
use serde_json::json;

/// Execute the anomalies command.
pub async fn execute(args: AnalysisArgs) -> Result<()> {
    let config = args.build_config().await?;
    let report = run(&args, &config).await?;

    if args.json {
        return print_json(&json!({ "anomalies": report.anomalies() }));
    }

    println!("{}", "warecost anomalies".bold().cyan());
    println!();
    let scope = config.grouping.map_or_else(
        || "whole batch".to_string(),
        |dimension| format!("per {dimension}"),
    );
    println!("  Threshold: |z| >= {} ({scope})", config.z_threshold);
    println!();
    render::print_anomalies(report.anomalies(), None);

    Ok(())
}
