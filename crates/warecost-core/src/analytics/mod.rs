//! Cost analytics over attributed records.
//!
//! Breakdowns, anomaly scoring and budget evaluation are pure functions of
//! their inputs. Breakdowns and anomaly scoring read the same attributed set
//! independently; budget evaluation consumes the per-team breakdown.

pub mod aggregate;
pub mod anomaly_detection;
pub mod budget;
pub mod statistics;

pub use aggregate::{AggregateBucket, aggregate};
pub use anomaly_detection::{AnomalyDetector, AnomalyFlag, AnomalySeverity, CRITICAL_ESCALATION};
pub use budget::{AlertLevel, BudgetStatus, CRITICAL_AT, WARNING_AT, evaluate};
pub use statistics::CostStatistics;
