//! `warecost breakdown`: spend grouped by one dimension.

use super::{AnalysisArgs, parse_dimension, print_json, render, run};
use anyhow::Result;
use colored::Colorize;
use serde_json::json;

/// Execute the breakdown command.
pub async fn execute(args: AnalysisArgs, dimension: String) -> Result<()> {
    let dimension = parse_dimension(&dimension)?;
    let config = args
        .build_config()
        .await?
        .with_breakdown_dimensions(vec![dimension]);
    let report = run(&args, &config).await?;
    let buckets = report.breakdown(dimension).unwrap_or_default();

    if args.json {
        return print_json(&json!({
            "dimension": dimension,
            "breakdown": buckets,
        }));
    }

    println!(
        "{}",
        format!("warecost breakdown {dimension}").bold().cyan()
    );
    println!();
    render::print_breakdown(dimension, buckets, config.credit_price);
    println!("  Total credits: {:.4}", report.summary().total_credits);
    render::print_quarantined(report.quarantined());

    Ok(())
}
