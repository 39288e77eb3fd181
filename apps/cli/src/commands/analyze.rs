//! `warecost analyze`: the full cost report.

use super::{AnalysisArgs, print_json, render, run};
use anyhow::Result;
use colored::Colorize;

/// Number of anomalies listed before the output is truncated.
const TOP_ANOMALIES: usize = 5;

/// Execute the analyze command.
pub async fn execute(args: AnalysisArgs) -> Result<()> {
    let config = args.build_config().await?;
    let report = run(&args, &config).await?;

    if args.json {
        return print_json(&report);
    }

    println!("{}", "warecost analyze".bold().cyan());
    println!();
    render::print_summary(report.summary());

    for (dimension, buckets) in report.breakdowns() {
        render::print_breakdown(*dimension, buckets, config.credit_price);
    }
    render::print_anomalies(report.anomalies(), Some(TOP_ANOMALIES));
    if !report.budget_status().is_empty() {
        render::print_budgets(report.budget_status());
    }
    render::print_quarantined(report.quarantined());

    Ok(())
}
