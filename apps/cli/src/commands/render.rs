//! Human-readable rendering shared by the analysis commands.

use colored::{ColoredString, Colorize};
use comfy_table::{Cell, CellAlignment, Color as ComfyColor, Table};
use rust_decimal::Decimal;
use warecost_core::{
    AggregateBucket, AlertLevel, AnomalyFlag, AnomalySeverity, BudgetStatus, Dimension,
    QuarantinedRecord, ReportSummary,
};

pub fn print_summary(summary: &ReportSummary) {
    println!("  Queries analyzed: {}", summary.total_queries);
    if summary.quarantined_queries > 0 {
        println!(
            "  Quarantined:      {}",
            summary.quarantined_queries.to_string().yellow()
        );
    }
    println!("  Total credits:    {:.4}", summary.total_credits);
    println!(
        "  Total cost:       ${:.2} (at ${:.2}/credit)",
        summary.total_cost_usd, summary.credit_price
    );
    println!();
}

pub fn breakdown_table(
    dimension: Dimension,
    buckets: &[AggregateBucket],
    credit_price: Decimal,
) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        dimension.as_str(),
        "Queries",
        "Credits",
        "Cost (USD)",
        "Mean Credits",
        "Bytes",
        "Time (ms)",
    ]);
    for bucket in buckets {
        let cost = bucket.total_credits.saturating_mul(credit_price);
        table.add_row(vec![
            Cell::new(&bucket.key).fg(ComfyColor::Cyan),
            right(bucket.record_count),
            right(format!("{:.4}", bucket.total_credits)),
            right(format!("{cost:.2}")),
            right(format!("{:.4}", bucket.mean_credits)),
            right(format_number(bucket.total_bytes_scanned)),
            right(format_number(bucket.total_execution_time_ms)),
        ]);
    }
    table
}

fn right<T: ToString>(content: T) -> Cell {
    Cell::new(content).set_alignment(CellAlignment::Right)
}

/// Formats a count with thousands separators.
fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(ch);
    }
    result
}

pub fn print_breakdown(dimension: Dimension, buckets: &[AggregateBucket], credit_price: Decimal) {
    println!("{}", format!("Spend by {dimension}").bold());
    if buckets.is_empty() {
        println!("  {} No records carry a {} value", "•".dimmed(), dimension);
    } else {
        println!("{}", breakdown_table(dimension, buckets, credit_price));
    }
    println!();
}

fn severity_label(severity: AnomalySeverity) -> ColoredString {
    match severity {
        AnomalySeverity::Warning => "WARNING".yellow(),
        AnomalySeverity::Critical => "CRITICAL".red().bold(),
    }
}

pub fn print_anomalies(anomalies: &[AnomalyFlag], limit: Option<usize>) {
    println!("{}", "Cost Anomalies".bold());
    if anomalies.is_empty() {
        println!("  {} No anomalies detected", "✓".green());
        println!();
        return;
    }

    let shown = limit.unwrap_or(anomalies.len()).min(anomalies.len());
    println!(
        "  {:<20} {:<12} {:<12} {:<10} {:<10} {}",
        "Query", "Team", "Credits", "Z-Score", "Severity", "Warehouse"
    );
    println!("  {}", "-".repeat(78));
    for flag in &anomalies[..shown] {
        println!(
            "  {:<20} {:<12} {:<12.4} {:<10.2} {:<10} {}",
            flag.query_id,
            flag.team,
            flag.credits_used,
            flag.z_score,
            severity_label(flag.severity),
            flag.warehouse_name
        );
    }
    if shown < anomalies.len() {
        println!("  ... and {} more", anomalies.len() - shown);
    }
    println!();
}

fn alert_label(level: AlertLevel) -> ColoredString {
    match level {
        AlertLevel::Ok => "OK".green(),
        AlertLevel::Warning => "WARNING".yellow(),
        AlertLevel::Critical => "CRITICAL".red().bold(),
    }
}

pub fn print_budgets(statuses: &[BudgetStatus]) {
    println!("{}", "Budget Status".bold());
    if statuses.is_empty() {
        println!("  {} No budgets configured", "•".dimmed());
        println!();
        return;
    }

    for status in statuses {
        println!(
            "  {:<16} {:>10.2} / {:<10.2} ({:>6.1}%)  {}",
            status.team,
            status.spent,
            status.limit,
            status.percent_used.saturating_mul(Decimal::ONE_HUNDRED),
            alert_label(status.alert_level)
        );
    }
    println!();
}

pub fn print_quarantined(quarantined: &[QuarantinedRecord]) {
    if quarantined.is_empty() {
        return;
    }

    println!("{}", "Quarantined Records".bold().yellow());
    for entry in quarantined {
        let id = entry
            .record
            .get("query_id")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("<no query_id>");
        println!("  {} {} ({})", "✗".red(), id, entry.reason);
    }
    println!();
}
