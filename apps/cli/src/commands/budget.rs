//! `warecost budget-check`: team spend against budget limits.

use super::{AnalysisArgs, print_json, render, run};
use anyhow::{Result, bail};
use colored::Colorize;
use serde_json::json;

/// Execute the budget-check command.
pub async fn execute(args: AnalysisArgs) -> Result<()> {
    let config = args.build_config().await?;
    if config.budgets.is_empty() {
        bail!("No budgets provided. Pass --budget team:amount");
    }
    let report = run(&args, &config).await?;

    if args.json {
        return print_json(&json!({ "budget_status": report.budget_status() }));
    }

    println!("{}", "warecost budget-check".bold().cyan());
    println!();
    render::print_budgets(report.budget_status());

    let alerts = report.budget_alerts().count();
    if alerts == 0 {
        println!("  {} All teams within budget", "✓".green());
    } else {
        println!(
            "  {} {} team(s) at or above 80% of budget",
            "⚠".yellow(),
            alerts
        );
    }

    Ok(())
}
