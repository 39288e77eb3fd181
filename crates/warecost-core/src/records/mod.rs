//! Query-execution records and the dimensions they are attributed along.
//!
//! Raw JSON input is turned into [`QueryRecord`]s by the [`normalize`] stage
//! and then tagged with organizational owners by the [`attribution`] stage.

pub mod attribution;
pub mod normalize;

pub use attribution::{Attribution, UNATTRIBUTED_TEAM, attribute, attribute_all};
pub use normalize::{Normalized, QuarantineReason, QuarantinedRecord, normalize};

use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single warehouse query execution, validated and coerced.
///
/// Immutable once produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Unique query identifier.
    pub query_id: String,
    /// Raw SQL text. Opaque to the pipeline.
    pub query_text: String,
    /// Warehouse user that issued the query.
    pub user_name: String,
    /// Warehouse the query ran on.
    pub warehouse_name: String,
    /// Credits consumed by the query.
    pub credits_used: Decimal,
    /// Bytes scanned by the query.
    pub bytes_scanned: u64,
    /// Wall-clock execution time in milliseconds.
    pub execution_time_ms: u64,
    /// When the query started.
    pub start_time: DateTime<Utc>,
    /// Free-form tag attached by the issuing client.
    pub query_tag: Option<String>,
}

impl QueryRecord {
    /// Cost of this query in USD at the given price per credit.
    pub fn cost_usd(&self, credit_price: Decimal) -> Decimal {
        self.credits_used.saturating_mul(credit_price)
    }
}

/// A [`QueryRecord`] tagged with the organizational owners derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributedRecord {
    /// The underlying record.
    #[serde(flatten)]
    pub record: QueryRecord,
    /// Owning team. Always set; `"unattributed"` when nothing matched.
    pub team: String,
    /// dbt model, when the tag named one.
    pub dbt_model: Option<String>,
    /// Orchestration DAG id, when the tag named one.
    pub dag_id: Option<String>,
}

impl AttributedRecord {
    /// Value of the given dimension for this record, if it has one.
    ///
    /// Absent optional fields and empty user names yield `None`, so callers
    /// grouping by a dimension skip the record instead of bucketing it under
    /// an empty key.
    pub fn dimension_value(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Team => Some(self.team.as_str()),
            Dimension::WarehouseName => Some(self.record.warehouse_name.as_str()),
            Dimension::DbtModel => self.dbt_model.as_deref(),
            Dimension::DagId => self.dag_id.as_deref(),
            Dimension::UserName => {
                let name = self.record.user_name.as_str();
                (!name.is_empty()).then_some(name)
            }
        }
    }

    /// Query identifier of the underlying record.
    pub fn query_id(&self) -> &str {
        &self.record.query_id
    }

    /// Credits consumed by the underlying record.
    pub fn credits_used(&self) -> Decimal {
        self.record.credits_used
    }

    /// Credits as a float, for statistics.
    pub fn credits_as_f64(&self) -> f64 {
        self.record.credits_used.to_f64().unwrap_or_default()
    }
}

/// A field records can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Owning team.
    Team,
    /// Warehouse the query ran on.
    WarehouseName,
    /// dbt model from the query tag.
    DbtModel,
    /// Orchestration DAG id from the query tag.
    DagId,
    /// Issuing warehouse user.
    UserName,
}

impl Dimension {
    /// Every supported dimension.
    pub const ALL: [Dimension; 5] = [
        Dimension::Team,
        Dimension::WarehouseName,
        Dimension::DbtModel,
        Dimension::DagId,
        Dimension::UserName,
    ];

    /// Dimensions broken down in a full report unless configured otherwise.
    pub const DEFAULT_BREAKDOWNS: [Dimension; 4] = [
        Dimension::Team,
        Dimension::WarehouseName,
        Dimension::DbtModel,
        Dimension::DagId,
    ];

    /// The snake_case name used in configuration and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Dimension::Team => "team",
            Dimension::WarehouseName => "warehouse_name",
            Dimension::DbtModel => "dbt_model",
            Dimension::DagId => "dag_id",
            Dimension::UserName => "user_name",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        Dimension::ALL
            .into_iter()
            .find(|dimension| dimension.as_str() == name)
            .ok_or_else(|| ConfigError::UnknownDimension(s.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::TimeZone;

    /// Builds a valid record with the given id, user, credits and tag.
    pub(crate) fn record(
        id: &str,
        user: &str,
        credits: Decimal,
        tag: Option<&str>,
    ) -> QueryRecord {
        QueryRecord {
            query_id: id.to_string(),
            query_text: "SELECT 1".to_string(),
            user_name: user.to_string(),
            warehouse_name: "ANALYTICS_WH".to_string(),
            credits_used: credits,
            bytes_scanned: 1_000,
            execution_time_ms: 100,
            start_time: Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap(),
            query_tag: tag.map(str::to_string),
        }
    }

    /// Builds an attributed record for the given team.
    pub(crate) fn attributed(id: &str, team: &str, credits: Decimal) -> AttributedRecord {
        AttributedRecord {
            record: record(id, "svc", credits, None),
            team: team.to_string(),
            dbt_model: None,
            dag_id: None,
        }
    }
}
