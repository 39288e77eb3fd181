//! Per-dimension spend breakdowns.

use crate::records::{AttributedRecord, Dimension};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Spend summary for one value of a dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateBucket {
    /// Dimension value the bucket is keyed by.
    pub key: String,
    /// Number of records in the bucket.
    pub record_count: u64,
    /// Sum of credits used.
    pub total_credits: Decimal,
    /// `total_credits / record_count`.
    pub mean_credits: Decimal,
    /// Sum of bytes scanned.
    pub total_bytes_scanned: u64,
    /// Sum of execution time in milliseconds.
    pub total_execution_time_ms: u64,
}

#[derive(Default)]
struct Totals {
    record_count: u64,
    credits: Decimal,
    bytes_scanned: u64,
    execution_time_ms: u64,
}

/// Groups records by `dimension` and summarizes each group.
///
/// Records with no value for the dimension are left out. Buckets are ordered
/// by descending `total_credits`, ties by ascending key.
pub fn aggregate(records: &[AttributedRecord], dimension: Dimension) -> Vec<AggregateBucket> {
    let mut groups: BTreeMap<&str, Totals> = BTreeMap::new();

    for record in records {
        let Some(key) = record.dimension_value(dimension) else {
            continue;
        };
        let totals = groups.entry(key).or_default();
        totals.record_count += 1;
        totals.credits = totals.credits.saturating_add(record.credits_used());
        totals.bytes_scanned = totals.bytes_scanned.saturating_add(record.record.bytes_scanned);
        totals.execution_time_ms =
            totals.execution_time_ms.saturating_add(record.record.execution_time_ms);
    }

    let mut buckets: Vec<AggregateBucket> = groups
        .into_iter()
        .map(|(key, totals)| AggregateBucket {
            key: key.to_string(),
            record_count: totals.record_count,
            total_credits: totals.credits,
            mean_credits: totals
                .credits
                .checked_div(Decimal::from(totals.record_count))
                .unwrap_or_default(),
            total_bytes_scanned: totals.bytes_scanned,
            total_execution_time_ms: totals.execution_time_ms,
        })
        .collect();

    buckets.sort_by(|a, b| {
        b.total_credits
            .cmp(&a.total_credits)
            .then_with(|| a.key.cmp(&b.key))
    });

    debug!(%dimension, buckets = buckets.len(), "Aggregated records");
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::test_support::attributed;
    use rust_decimal_macros::dec;

    #[test]
    fn test_aggregate_by_team() {
        let records = vec![
            attributed("q1", "analytics", dec!(2.5)),
            attributed("q2", "ml", dec!(0.5)),
            attributed("q3", "analytics", dec!(15.0)),
        ];
        let buckets = aggregate(&records, Dimension::Team);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].key, "analytics");
        assert_eq!(buckets[0].record_count, 2);
        assert_eq!(buckets[0].total_credits, dec!(17.5));
        assert_eq!(buckets[0].mean_credits, dec!(8.75));
        assert_eq!(buckets[0].total_bytes_scanned, 2_000);
        assert_eq!(buckets[0].total_execution_time_ms, 200);
        assert_eq!(buckets[1].key, "ml");
    }

    #[test]
    fn test_ties_sorted_by_key() {
        let records = vec![
            attributed("q1", "zeta", dec!(4.0)),
            attributed("q2", "alpha", dec!(4)),
            attributed("q3", "mid", dec!(8.0)),
        ];
        let keys: Vec<_> = aggregate(&records, Dimension::Team)
            .into_iter()
            .map(|b| b.key)
            .collect();
        assert_eq!(keys, vec!["mid", "alpha", "zeta"]);
    }

    #[test]
    fn test_absent_dimension_excluded() {
        let mut tagged = attributed("q1", "analytics", dec!(3.0));
        tagged.dbt_model = Some("stg_orders".to_string());
        let records = vec![tagged, attributed("q2", "analytics", dec!(5.0))];

        let buckets = aggregate(&records, Dimension::DbtModel);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].key, "stg_orders");
        assert_eq!(buckets[0].total_credits, dec!(3));

        assert!(aggregate(&records, Dimension::DagId).is_empty());
    }

    #[test]
    fn test_totals_are_exact_for_decimal_credits() {
        let records: Vec<_> = (1..=30)
            .map(|k| {
                let team = ["analytics", "ml", "finance"][k % 3];
                attributed(&format!("q{k}"), team, Decimal::new(k as i64, 1))
            })
            .collect();
        let direct: Decimal = records.iter().map(AttributedRecord::credits_used).sum();
        let buckets: Decimal = aggregate(&records, Dimension::Team)
            .iter()
            .map(|b| b.total_credits)
            .sum();
        assert_eq!(direct, dec!(46.5));
        assert_eq!(buckets, direct);
    }

    #[test]
    fn test_mean_of_non_terminating_division() {
        let records = vec![
            attributed("q1", "analytics", dec!(0.1)),
            attributed("q2", "analytics", dec!(0.1)),
            attributed("q3", "analytics", dec!(0.2)),
        ];
        let bucket = &aggregate(&records, Dimension::Team)[0];
        assert_eq!(bucket.total_credits, dec!(0.4));
        assert_eq!(bucket.mean_credits.round_dp(6), dec!(0.133333));
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate(&[], Dimension::Team).is_empty());
    }
}
