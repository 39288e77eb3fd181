//! Per-team budget evaluation.
//!
//! Compares each configured team's aggregate spend with its limit. Teams
//! without a configured limit are not evaluated.

use crate::analytics::aggregate::AggregateBucket;
use crate::config::Budgets;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// Fraction of the limit at which a team enters the warning level.
pub const WARNING_AT: Decimal = Decimal::from_parts(80, 0, 0, false, 2);

/// Fraction of the limit at which a team enters the critical level.
pub const CRITICAL_AT: Decimal = Decimal::ONE;

/// Budget alert level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Under 80% of the limit.
    Ok,
    /// At least 80% of the limit.
    Warning,
    /// At or over the limit.
    Critical,
}

impl AlertLevel {
    /// Alert level for a spend fraction (`spent / limit`).
    pub fn from_percent_used(percent_used: Decimal) -> Self {
        if percent_used >= CRITICAL_AT {
            Self::Critical
        } else if percent_used >= WARNING_AT {
            Self::Warning
        } else {
            Self::Ok
        }
    }
}

/// Budget status of one team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatus {
    /// Team name.
    pub team: String,
    /// Configured credit limit.
    pub limit: Decimal,
    /// Credits spent in the analyzed batch.
    pub spent: Decimal,
    /// `limit - spent`; negative when over budget.
    pub remaining: Decimal,
    /// `spent / limit` (1.0 means exactly at the limit).
    pub percent_used: Decimal,
    /// Alert level derived from `percent_used`.
    pub alert_level: AlertLevel,
}

/// Evaluates every configured budget against per-team buckets.
///
/// A team with a budget but no bucket has spent nothing. Output follows the
/// budget order, which is ascending by team name.
pub fn evaluate(team_buckets: &[AggregateBucket], budgets: &Budgets) -> Vec<BudgetStatus> {
    let spend: HashMap<&str, Decimal> = team_buckets
        .iter()
        .map(|bucket| (bucket.key.as_str(), bucket.total_credits))
        .collect();

    let statuses: Vec<BudgetStatus> = budgets
        .iter()
        .map(|(team, limit)| {
            let spent = spend.get(team).copied().unwrap_or_default();
            // Limits are positive, so the division only fails on overflow.
            let percent_used = spent.checked_div(limit).unwrap_or(Decimal::MAX);
            BudgetStatus {
                team: team.to_string(),
                limit,
                spent,
                remaining: limit.saturating_sub(spent),
                percent_used,
                alert_level: AlertLevel::from_percent_used(percent_used),
            }
        })
        .collect();

    let alerting = statuses
        .iter()
        .filter(|s| s.alert_level != AlertLevel::Ok)
        .count();
    debug!(evaluated = statuses.len(), alerting, "Evaluated budgets");
    statuses
}
