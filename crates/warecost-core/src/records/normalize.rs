//! Validation and coercion of raw query-history records.
//!
//! The normalizer never fails. Each raw input either becomes a
//! [`QueryRecord`] or is quarantined with the reason it was rejected, and
//! both lists keep the input order.

use super::QueryRecord;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Naive timestamp layouts accepted when the input carries no offset.
/// Such timestamps are taken to be UTC.
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Why a raw record was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuarantineReason {
    /// A required field is absent, null or blank.
    MissingField(&'static str),
    /// A field is present but of the wrong type or unparseable.
    InvalidType(&'static str),
    /// A numeric field is negative.
    NegativeValue(&'static str),
    /// A field that must be unique repeats an earlier record.
    DuplicateValue(&'static str),
}

impl fmt::Display for QuarantineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(name) => write!(f, "missing_field:{}", name),
            Self::InvalidType(name) => write!(f, "invalid_type:{}", name),
            Self::NegativeValue(name) => write!(f, "negative_value:{}", name),
            Self::DuplicateValue(name) => write!(f, "duplicate_value:{}", name),
        }
    }
}

impl Serialize for QuarantineReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A raw input that did not survive normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarantinedRecord {
    /// The input exactly as received.
    pub record: Value,
    /// Why it was rejected.
    pub reason: QuarantineReason,
}

/// Output of [`normalize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// Records that passed validation, in input order.
    pub valid: Vec<QueryRecord>,
    /// Records that were rejected, in input order.
    pub quarantined: Vec<QuarantinedRecord>,
}

/// Validates and coerces raw records.
///
/// Required fields are `query_id`, `credits_used`, `warehouse_name` and
/// `start_time`; they are checked in that order and the first problem found
/// is the quarantine reason. A `query_id` seen earlier in the batch is
/// quarantined as `duplicate_value:query_id`.
pub fn normalize(raw: &[Value]) -> Normalized {
    let mut normalized = Normalized::default();
    let mut seen_ids = HashSet::new();

    for (index, value) in raw.iter().enumerate() {
        let outcome = parse_record(value).and_then(|record| {
            if seen_ids.insert(record.query_id.clone()) {
                Ok(record)
            } else {
                Err(QuarantineReason::DuplicateValue("query_id"))
            }
        });

        match outcome {
            Ok(record) => normalized.valid.push(record),
            Err(reason) => {
                warn!(index, %reason, "Quarantining query record");
                normalized.quarantined.push(QuarantinedRecord {
                    record: value.clone(),
                    reason,
                });
            }
        }
    }

    debug!(
        valid = normalized.valid.len(),
        quarantined = normalized.quarantined.len(),
        "Normalized query records"
    );
    normalized
}

fn parse_record(value: &Value) -> Result<QueryRecord, QuarantineReason> {
    let obj = value
        .as_object()
        .ok_or(QuarantineReason::InvalidType("record"))?;

    let query_id = required_string(obj, "query_id")?;
    let credits_used = required_credits(obj, "credits_used")?;
    let warehouse_name = required_string(obj, "warehouse_name")?;
    let start_time = required_timestamp(obj, "start_time")?;
    let bytes_scanned = optional_count(obj, "bytes_scanned")?;
    let execution_time_ms = optional_count(obj, "execution_time_ms")?;
    let user_name = optional_string(obj, "user_name")?.unwrap_or_default();
    let query_text = match optional_string(obj, "query_text")? {
        Some(text) => text,
        None => optional_string(obj, "text")?.unwrap_or_default(),
    };
    let query_tag = optional_string(obj, "query_tag")?
        .filter(|tag| !tag.trim().is_empty());

    Ok(QueryRecord {
        query_id,
        query_text,
        user_name,
        warehouse_name,
        credits_used,
        bytes_scanned,
        execution_time_ms,
        start_time,
        query_tag,
    })
}

/// Looks up a field, treating JSON `null` the same as absence.
fn field<'a>(obj: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    obj.get(name).filter(|value| !value.is_null())
}

fn required_string(
    obj: &Map<String, Value>,
    name: &'static str,
) -> Result<String, QuarantineReason> {
    match optional_string(obj, name)? {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(QuarantineReason::MissingField(name)),
    }
}

fn optional_string(
    obj: &Map<String, Value>,
    name: &'static str,
) -> Result<Option<String>, QuarantineReason> {
    match field(obj, name) {
        None => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(QuarantineReason::InvalidType(name)),
    }
}

/// Reads a number, accepting numeric strings such as `"2.5"`.
fn number(value: &Value, name: &'static str) -> Result<f64, QuarantineReason> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|n| n.is_finite())
        .ok_or(QuarantineReason::InvalidType(name))
}

/// Reads an exact credit amount from a JSON number or numeric string.
///
/// JSON numbers are read through their shortest decimal rendering, so `0.1`
/// becomes exactly one tenth.
fn required_credits(
    obj: &Map<String, Value>,
    name: &'static str,
) -> Result<Decimal, QuarantineReason> {
    let value = field(obj, name)
        .ok_or(QuarantineReason::MissingField(name))?;
    let text = match value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_string(),
        _ => return Err(QuarantineReason::InvalidType(name)),
    };
    let credits = text
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| QuarantineReason::InvalidType(name))?;
    if credits.is_sign_negative() && !credits.is_zero() {
        return Err(QuarantineReason::NegativeValue(name));
    }
    // Drop the sign of -0 so sums and displays never carry a negative zero.
    Ok(credits.abs())
}

/// Reads a non-negative integer. Absent or null means zero.
fn optional_count(obj: &Map<String, Value>, name: &'static str) -> Result<u64, QuarantineReason> {
    let Some(value) = field(obj, name) else {
        return Ok(0);
    };
    if let Some(count) = value.as_u64() {
        return Ok(count);
    }

    let n = number(value, name)?;
    if n < 0.0 {
        Err(QuarantineReason::NegativeValue(name))
    } else if n.fract() != 0.0 || n > u64::MAX as f64 {
        Err(QuarantineReason::InvalidType(name))
    } else {
        Ok(n as u64)
    }
}

fn required_timestamp(
    obj: &Map<String, Value>,
    name: &'static str,
) -> Result<DateTime<Utc>, QuarantineReason> {
    let text = required_string(obj, name)?;
    parse_timestamp(text.trim())
        .ok_or(QuarantineReason::InvalidType(name))
}

/// Parses an ISO-8601 timestamp, with or without an offset.
fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "query_id": "q1",
            "query_text": "SELECT * FROM orders",
            "user_name": "analytics_bob",
            "warehouse_name": "ANALYTICS_WH",
            "credits_used": 2.5,
            "bytes_scanned": 1_000_000,
            "execution_time_ms": 3000,
            "start_time": "2024-01-15T10:00:00",
            "query_tag": "team=analytics;dbt:stg_orders"
        })
    }

    fn with(field: &str, value: Value) -> Value {
        let mut record = sample();
        record[field] = value;
        record
    }

    fn without(field: &str) -> Value {
        let mut record = sample();
        record.as_object_mut().unwrap().remove(field);
        record
    }

    fn reason_for(value: Value) -> String {
        let normalized = normalize(&[value]);
        assert!(
            normalized.valid.is_empty(),
            "expected record to be quarantined"
        );
        normalized.quarantined[0].reason.to_string()
    }

    #[test]
    fn test_valid_record() {
        let normalized = normalize(&[sample()]);
        assert!(normalized.quarantined.is_empty());
        let record = &normalized.valid[0];
        assert_eq!(record.query_id, "q1");
        assert_eq!(record.user_name, "analytics_bob");
        assert_eq!(record.bytes_scanned, 1_000_000);
        assert_eq!(record.execution_time_ms, 3000);
        assert_eq!(
            record.start_time,
            Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap()
        );
        assert_eq!(
            record.query_tag.as_deref(),
            Some("team=analytics;dbt:stg_orders")
        );
    }

    #[test]
    fn test_missing_required_fields() {
        assert_eq!(reason_for(without("query_id")), "missing_field:query_id");
        assert_eq!(
            reason_for(without("credits_used")),
            "missing_field:credits_used"
        );
        assert_eq!(
            reason_for(without("warehouse_name")),
            "missing_field:warehouse_name"
        );
        assert_eq!(
            reason_for(without("start_time")),
            "missing_field:start_time"
        );
        assert_eq!(
            reason_for(with("credits_used", Value::Null)),
            "missing_field:credits_used"
        );
        assert_eq!(
            reason_for(with("query_id", json!("  "))),
            "missing_field:query_id"
        );
    }

    #[test]
    fn test_first_missing_field_wins() {
        let mut record = sample();
        let obj = record.as_object_mut().unwrap();
        obj.remove("start_time");
        obj.remove("credits_used");
        assert_eq!(reason_for(record), "missing_field:credits_used");
    }

    #[test]
    fn test_invalid_types() {
        assert_eq!(
            reason_for(with("credits_used", json!("lots"))),
            "invalid_type:credits_used"
        );
        assert_eq!(
            reason_for(with("query_id", json!(42))),
            "invalid_type:query_id"
        );
        assert_eq!(
            reason_for(with("start_time", json!("yesterday"))),
            "invalid_type:start_time"
        );
        assert_eq!(
            reason_for(with("bytes_scanned", json!(1.5))),
            "invalid_type:bytes_scanned"
        );
        assert_eq!(
            reason_for(with("query_tag", json!(["team=a"]))),
            "invalid_type:query_tag"
        );
        assert_eq!(reason_for(json!("not an object")), "invalid_type:record");
    }

    #[test]
    fn test_negative_values() {
        assert_eq!(
            reason_for(with("credits_used", json!(-1.0))),
            "negative_value:credits_used"
        );
        assert_eq!(
            reason_for(with("bytes_scanned", json!(-10))),
            "negative_value:bytes_scanned"
        );
        assert_eq!(
            reason_for(with("execution_time_ms", json!(-5))),
            "negative_value:execution_time_ms"
        );
    }

    #[test]
    fn test_numeric_coercion() {
        let normalized = normalize(&[with("credits_used", json!("3.25"))]);
        assert_eq!(normalized.valid[0].credits_used, dec!(3.25));

        let normalized = normalize(&[with("credits_used", json!("1.5e1"))]);
        assert_eq!(normalized.valid[0].credits_used, dec!(15));

        let normalized = normalize(&[with("bytes_scanned", json!(2048.0))]);
        assert_eq!(normalized.valid[0].bytes_scanned, 2048);

        let normalized = normalize(&[with("execution_time_ms", json!("750"))]);
        assert_eq!(normalized.valid[0].execution_time_ms, 750);
    }

    #[test]
    fn test_credits_are_exact() {
        let normalized = normalize(&[
            with("credits_used", json!(0.1)),
            json!({"query_id": "q2", "warehouse_name": "WH", "credits_used": 0.2,
                   "start_time": "2024-01-15T10:00:00Z"}),
            json!({"query_id": "q3", "warehouse_name": "WH", "credits_used": "0.3",
                   "start_time": "2024-01-15T10:00:00Z"}),
        ]);
        assert_eq!(normalized.valid[0].credits_used, dec!(0.1));
        let total: Decimal = normalized.valid.iter().map(|r| r.credits_used).sum();
        assert_eq!(total, dec!(0.6));

        let negative_zero = normalize(&[with("credits_used", json!(-0.0))]);
        assert_eq!(negative_zero.valid[0].credits_used, Decimal::ZERO);
        assert!(!negative_zero.valid[0].credits_used.is_sign_negative());
    }

    #[test]
    fn test_optional_fields_default() {
        let mut record = sample();
        let obj = record.as_object_mut().unwrap();
        for name in [
            "query_text",
            "user_name",
            "bytes_scanned",
            "execution_time_ms",
            "query_tag",
        ] {
            obj.remove(name);
        }
        let normalized = normalize(&[record]);
        let record = &normalized.valid[0];
        assert_eq!(record.query_text, "");
        assert_eq!(record.user_name, "");
        assert_eq!(record.bytes_scanned, 0);
        assert_eq!(record.execution_time_ms, 0);
        assert_eq!(record.query_tag, None);
    }

    #[test]
    fn test_empty_tag_is_absent() {
        let normalized = normalize(&[with("query_tag", json!(""))]);
        assert_eq!(normalized.valid[0].query_tag, None);
    }

    #[test]
    fn test_text_alias() {
        let mut record = without("query_text");
        record["text"] = json!("SELECT 2");
        let normalized = normalize(&[record]);
        assert_eq!(normalized.valid[0].query_text, "SELECT 2");
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 10, 0, 0).unwrap();
        for text in [
            "2024-01-15T10:00:00Z",
            "2024-01-15T11:00:00+01:00",
            "2024-01-15 10:00:00",
        ] {
            let normalized = normalize(&[with("start_time", json!(text))]);
            assert_eq!(normalized.valid[0].start_time, expected, "format {text}");
        }
    }

    #[test]
    fn test_duplicate_query_id() {
        let normalized = normalize(&[sample(), with("credits_used", json!(9.0))]);
        assert_eq!(normalized.valid.len(), 1);
        assert_eq!(normalized.valid[0].credits_used, dec!(2.5));
        assert_eq!(
            normalized.quarantined[0].reason.to_string(),
            "duplicate_value:query_id"
        );
    }

    #[test]
    fn test_order_preserved_and_raw_kept() {
        let bad = without("credits_used");
        let records = vec![
            with("query_id", json!("a")),
            bad.clone(),
            with("query_id", json!("b")),
        ];
        let normalized = normalize(&records);
        let ids: Vec<_> = normalized
            .valid
            .iter()
            .map(|r| r.query_id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(normalized.quarantined[0].record, bad);
    }

    #[test]
    fn test_quarantine_reason_serializes_as_string() {
        let entry = QuarantinedRecord {
            record: json!({}),
            reason: QuarantineReason::MissingField("query_id"),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["reason"], "missing_field:query_id");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(&[]), Normalized::default());
    }
}
