//! WareCost Core - cost attribution for data-warehouse query history.
//!
//! This crate turns a batch of query-execution records into a cost report:
//! - Normalization of raw JSON records, with a quarantine for malformed ones
//! - Attribution of each query to a team, dbt model and DAG
//! - Per-dimension spend breakdowns
//! - Z-score anomaly flags
//! - Per-team budget alerts
//!
//! Every stage is a pure function; the crate performs no I/O apart from the
//! explicit [`AnalysisConfig::load`].
//!
//! # Example
//!
//! ```rust
//! use warecost_core::{AnalysisConfig, Budgets, Dimension, analyze};
//! use serde_json::json;
//!
//! # fn main() -> warecost_core::Result<()> {
//! let records = vec![json!({
//!     "query_id": "q1",
//!     "user_name": "analytics_bob",
//!     "warehouse_name": "ANALYTICS_WH",
//!     "credits_used": 120.0,
//!     "start_time": "2024-01-15T10:00:00Z",
//!     "query_tag": "team=analytics;dbt:stg_orders"
//! })];
//! let config = AnalysisConfig::new().with_budgets(Budgets::from_tokens(["analytics:100"])?);
//!
//! let report = analyze(&records, &config)?;
//! assert_eq!(report.breakdown(Dimension::Team).unwrap()[0].key, "analytics");
//! assert_eq!(report.budget_alerts().count(), 1);
//! # Ok(())
//! # }
//! ```

pub mod analytics;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod records;
pub mod report;

pub use analytics::{
    AggregateBucket, AlertLevel, AnomalyDetector, AnomalyFlag, AnomalySeverity, BudgetStatus,
    CostStatistics, aggregate, evaluate,
};
pub use config::{AnalysisConfig, Budgets, DEFAULT_CREDIT_PRICE, DEFAULT_Z_THRESHOLD};
pub use error::{ConfigError, Result, WarecostError};
pub use pipeline::analyze;
pub use records::{
    AttributedRecord, Attribution, Dimension, Normalized, QuarantineReason, QuarantinedRecord,
    QueryRecord, UNATTRIBUTED_TEAM, attribute, attribute_all, normalize,
};
pub use report::{AnalysisReport, ReportSummary};
