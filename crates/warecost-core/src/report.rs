//! The analysis report returned to callers.

use crate::analytics::{AggregateBucket, AlertLevel, AnomalyFlag, BudgetStatus, CostStatistics};
use crate::records::{Dimension, QuarantinedRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

/// Batch-wide totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    /// Records that passed normalization.
    pub total_queries: usize,
    /// Records that were quarantined.
    pub quarantined_queries: usize,
    /// Credits used by all valid records.
    pub total_credits: Decimal,
    /// `total_credits * credit_price`.
    pub total_cost_usd: Decimal,
    /// USD price of one credit used for cost figures.
    pub credit_price: Decimal,
    /// Threshold anomalies were scored against.
    pub z_threshold: f64,
    /// Dimension anomalies were grouped by, if any.
    pub grouping: Option<Dimension>,
    /// Credit distribution over all valid records.
    pub statistics: CostStatistics,
}

/// Outputs of each pipeline stage, ready to be assembled.
#[derive(Debug)]
pub(crate) struct ReportParts {
    pub(crate) summary: ReportSummary,
    pub(crate) quarantined: Vec<QuarantinedRecord>,
    pub(crate) breakdowns: BTreeMap<Dimension, Vec<AggregateBucket>>,
    pub(crate) anomalies: Vec<AnomalyFlag>,
    pub(crate) budget_status: Vec<BudgetStatus>,
}

/// Result of one analysis run.
///
/// Read-only once assembled; ownership passes entirely to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    summary: ReportSummary,
    quarantined: Vec<QuarantinedRecord>,
    breakdowns: BTreeMap<Dimension, Vec<AggregateBucket>>,
    anomalies: Vec<AnomalyFlag>,
    budget_status: Vec<BudgetStatus>,
}

impl AnalysisReport {
    pub(crate) fn assemble(parts: ReportParts) -> Self {
        let ReportParts {
            summary,
            quarantined,
            breakdowns,
            anomalies,
            budget_status,
        } = parts;
        Self {
            summary,
            quarantined,
            breakdowns,
            anomalies,
            budget_status,
        }
    }

    /// Batch-wide totals.
    pub fn summary(&self) -> &ReportSummary {
        &self.summary
    }

    /// Records rejected by the normalizer, with reasons, in input order.
    pub fn quarantined(&self) -> &[QuarantinedRecord] {
        &self.quarantined
    }

    /// Buckets for one dimension, if it was broken down.
    pub fn breakdown(&self, dimension: Dimension) -> Option<&[AggregateBucket]> {
        self.breakdowns.get(&dimension).map(Vec::as_slice)
    }

    /// All breakdowns, keyed by dimension.
    pub fn breakdowns(&self) -> &BTreeMap<Dimension, Vec<AggregateBucket>> {
        &self.breakdowns
    }

    /// Flagged anomalies, most extreme first.
    pub fn anomalies(&self) -> &[AnomalyFlag] {
        &self.anomalies
    }

    /// Status of each configured team budget.
    pub fn budget_status(&self) -> &[BudgetStatus] {
        &self.budget_status
    }

    /// Budget entries at warning or critical level.
    pub fn budget_alerts(&self) -> impl Iterator<Item = &BudgetStatus> {
        self.budget_status
            .iter()
            .filter(|status| status.alert_level != AlertLevel::Ok)
    }

    /// True when nothing was read: no valid and no quarantined records.
    pub fn is_empty(&self) -> bool {
        self.summary.total_queries == 0 && self.quarantined.is_empty()
    }
}
