//! Anomaly detection for identifying unusual query costs using z-scores.

use crate::analytics::statistics::CostStatistics;
use crate::config::DEFAULT_CREDIT_PRICE;
use crate::error::ConfigError;
use crate::records::{AttributedRecord, Dimension};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Multiple of the threshold at which a flag escalates to critical.
pub const CRITICAL_ESCALATION: f64 = 1.5;

/// Severity level of an anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    /// `|z| >= threshold`.
    Warning,
    /// `|z| >= threshold * 1.5`.
    Critical,
}

impl AnomalySeverity {
    /// Severity for a z-score, or `None` when it is not anomalous.
    ///
    /// Only the magnitude matters: unusually cheap queries are flagged like
    /// unusually expensive ones.
    pub fn classify(z_score: f64, threshold: f64) -> Option<Self> {
        let magnitude = z_score.abs();
        if magnitude >= threshold * CRITICAL_ESCALATION {
            Some(Self::Critical)
        } else if magnitude >= threshold {
            Some(Self::Warning)
        } else {
            None
        }
    }
}

/// A query whose cost is a statistical outlier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyFlag {
    /// Query with the anomalous cost.
    pub query_id: String,
    /// Credits the query used.
    pub credits_used: Decimal,
    /// Cost of the query in USD.
    pub cost_usd: Decimal,
    /// Signed standard deviations from the reference mean.
    pub z_score: f64,
    /// Threshold the score was compared against.
    pub threshold: f64,
    /// How far past the threshold the score is.
    pub severity: AnomalySeverity,
    /// Team the query is attributed to.
    pub team: String,
    /// Warehouse the query ran on.
    pub warehouse_name: String,
    /// Reference group the score was computed within, when grouping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Scores record costs against a reference distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyDetector {
    threshold: f64,
    grouping: Option<Dimension>,
    credit_price: Decimal,
}

impl AnomalyDetector {
    /// Creates a detector flagging `|z| >= threshold` against the whole batch.
    pub fn new(threshold: f64) -> Result<Self, ConfigError> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(threshold));
        }
        Ok(Self {
            threshold,
            grouping: None,
            credit_price: DEFAULT_CREDIT_PRICE,
        })
    }

    /// Scores each record within its own group of `dimension` instead of the
    /// whole batch. Records with no value for the dimension are not scored.
    #[must_use]
    pub fn with_grouping(mut self, grouping: Option<Dimension>) -> Self {
        self.grouping = grouping;
        self
    }

    /// Sets the price used for the `cost_usd` of each flag.
    #[must_use]
    pub fn with_credit_price(mut self, credit_price: Decimal) -> Self {
        self.credit_price = credit_price;
        self
    }

    /// The configured z-score threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Flags anomalous records, most extreme first.
    ///
    /// Credits are scored as `f64`; the flags carry the exact amounts.
    /// Groups with fewer than two members or no spread never produce flags.
    /// Ties in `|z|` are ordered by query id.
    pub fn detect(&self, records: &[AttributedRecord]) -> Vec<AnomalyFlag> {
        let mut samples: BTreeMap<Option<&str>, Vec<f64>> = BTreeMap::new();
        for record in records {
            if let Some(key) = self.reference_key(record) {
                samples.entry(key).or_default().push(record.credits_as_f64());
            }
        }

        let references: BTreeMap<Option<&str>, CostStatistics> = samples
            .into_iter()
            .map(|(key, credits)| (key, CostStatistics::from_values(&credits)))
            .collect();

        let mut flags: Vec<AnomalyFlag> = records
            .iter()
            .filter_map(|record| {
                let key = self.reference_key(record)?;
                let z_score = references.get(&key)?.z_score(record.credits_as_f64());
                let severity = AnomalySeverity::classify(z_score, self.threshold)?;
                Some(AnomalyFlag {
                    query_id: record.query_id().to_string(),
                    credits_used: record.credits_used(),
                    cost_usd: record.record.cost_usd(self.credit_price),
                    z_score,
                    threshold: self.threshold,
                    severity,
                    team: record.team.clone(),
                    warehouse_name: record.record.warehouse_name.clone(),
                    group: key.map(str::to_string),
                })
            })
            .collect();

        flags.sort_by(|a, b| {
            b.z_score
                .abs()
                .total_cmp(&a.z_score.abs())
                .then_with(|| a.query_id.cmp(&b.query_id))
        });

        debug!(
            groups = references.len(),
            flagged = flags.len(),
            threshold = self.threshold,
            "Detected cost anomalies"
        );
        flags
    }

    /// Reference distribution a record belongs to: `Some(None)` for the whole
    /// batch, `Some(Some(key))` for a group, `None` when it cannot be grouped.
    fn reference_key<'a>(&self, record: &'a AttributedRecord) -> Option<Option<&'a str>> {
        match self.grouping {
            None => Some(None),
            Some(dimension) => record.dimension_value(dimension).map(Some),
        }
    }
}
