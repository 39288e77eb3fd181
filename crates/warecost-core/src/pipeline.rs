//! End-to-end analysis of one batch of query records.

use crate::analytics::{AnomalyDetector, CostStatistics, aggregate, evaluate};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::records::{AttributedRecord, Dimension, Normalized, attribute_all, normalize};
use crate::report::{AnalysisReport, ReportParts, ReportSummary};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Runs normalization, attribution, breakdowns, anomaly detection and budget
/// evaluation over `raw`, and assembles the report.
///
/// The configuration is validated before any record is read; an invalid
/// configuration fails the whole call and no report is produced. Malformed
/// records never fail the call, they are listed in the report's quarantine.
///
/// # Errors
/// Returns [`crate::WarecostError::Config`] for an invalid configuration.
#[instrument(skip_all, fields(records = raw.len()))]
pub fn analyze(raw: &[Value], config: &AnalysisConfig) -> Result<AnalysisReport> {
    config.validate()?;
    let detector = AnomalyDetector::new(config.z_threshold)?
        .with_grouping(config.grouping)
        .with_credit_price(config.credit_price);

    let Normalized { valid, quarantined } = normalize(raw);
    let records = attribute_all(valid);

    let mut breakdowns = BTreeMap::new();
    for &dimension in &config.breakdown_dimensions {
        breakdowns
            .entry(dimension)
            .or_insert_with(|| aggregate(&records, dimension));
    }
    let team_buckets = breakdowns
        .get(&Dimension::Team)
        .cloned()
        .unwrap_or_else(|| aggregate(&records, Dimension::Team));

    let anomalies = detector.detect(&records);
    let budget_status = evaluate(&team_buckets, &config.budgets);

    let credits: Vec<f64> = records
        .iter()
        .map(AttributedRecord::credits_as_f64)
        .collect();
    let total_credits = records.iter().fold(Decimal::ZERO, |total, record| {
        total.saturating_add(record.credits_used())
    });
    let summary = ReportSummary {
        total_queries: records.len(),
        quarantined_queries: quarantined.len(),
        total_credits,
        total_cost_usd: total_credits.saturating_mul(config.credit_price),
        credit_price: config.credit_price,
        z_threshold: config.z_threshold,
        grouping: config.grouping,
        statistics: CostStatistics::from_values(&credits),
    };

    info!(
        queries = summary.total_queries,
        quarantined = summary.quarantined_queries,
        total_credits = %summary.total_credits,
        anomalies = anomalies.len(),
        "Analysis complete"
    );

    Ok(AnalysisReport::assemble(ReportParts {
        summary,
        quarantined,
        breakdowns,
        anomalies,
        budget_status,
    }))
}
