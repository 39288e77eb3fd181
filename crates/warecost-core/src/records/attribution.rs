//! Derivation of organizational owners from query tags and user names.
//!
//! A query tag is split on `;` or `,` into segments. Each segment is matched
//! against [`TAG_RULES`] in order and the first rule that yields a value
//! claims the segment. A field keeps the first value assigned to it, so
//! earlier segments win over later ones.
//!
//! When no segment supplies a team, the team falls back to the user-name
//! prefix (`analytics_bob` becomes `analytics`), and finally to
//! [`UNATTRIBUTED_TEAM`].
//!
//! Attribution depends only on `(query_tag, user_name)`; the same inputs always
//! produce the same owners.

use super::{AttributedRecord, QueryRecord};
use tracing::debug;

/// Team assigned when neither the tag nor the user name names one.
pub const UNATTRIBUTED_TEAM: &str = "unattributed";

/// Characters separating tag segments.
const TAG_DELIMITERS: [char; 2] = [';', ','];

/// An attributed field a tag rule can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Team,
    DbtModel,
    DagId,
}

/// A single tag-parsing rule.
#[derive(Debug, Clone, Copy)]
enum TagRule {
    /// `key=value`, key compared case-insensitively.
    KeyValue {
        key: &'static str,
        field: Field,
        lowercase: bool,
    },
    /// A literal, case-sensitive prefix followed by the value.
    Prefix {
        prefix: &'static str,
        field: Field,
    },
}

/// Tag rules in precedence order.
const TAG_RULES: &[TagRule] = &[
    TagRule::KeyValue {
        key: "team",
        field: Field::Team,
        lowercase: true,
    },
    TagRule::KeyValue {
        key: "dag",
        field: Field::DagId,
        lowercase: true,
    },
    TagRule::Prefix {
        prefix: "dbt:",
        field: Field::DbtModel,
    },
    TagRule::KeyValue {
        key: "model",
        field: Field::DbtModel,
        lowercase: false,
    },
];

impl TagRule {
    /// Returns the field and value this rule extracts from a trimmed segment.
    /// Empty values never match.
    fn apply(self, segment: &str) -> Option<(Field, String)> {
        let (field, value) = match self {
            Self::KeyValue {
                key,
                field,
                lowercase,
            } => {
                let (seg_key, seg_value) = segment.split_once('=')?;
                if !seg_key.trim().eq_ignore_ascii_case(key) {
                    return None;
                }
                let seg_value = seg_value.trim();
                let value = if lowercase {
                    seg_value.to_lowercase()
                } else {
                    seg_value.to_string()
                };
                (field, value)
            }
            Self::Prefix { prefix, field } => {
                (field, segment.strip_prefix(prefix)?.trim().to_string())
            }
        };
        (!value.is_empty()).then_some((field, value))
    }
}

/// Organizational owners derived for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribution {
    /// Owning team.
    pub team: String,
    /// dbt model, if tagged.
    pub dbt_model: Option<String>,
    /// Orchestration DAG id, if tagged.
    pub dag_id: Option<String>,
}

impl Attribution {
    /// Derives owners from a query tag and the issuing user name.
    pub fn derive(query_tag: Option<&str>, user_name: &str) -> Self {
        let mut team = None;
        let mut dbt_model = None;
        let mut dag_id = None;

        let segments = query_tag
            .into_iter()
            .flat_map(|tag| tag.split(TAG_DELIMITERS))
            .map(str::trim)
            .filter(|segment| !segment.is_empty());

        for segment in segments {
            let Some((field, value)) = TAG_RULES.iter().find_map(|rule| rule.apply(segment))
            else {
                continue;
            };
            let slot = match field {
                Field::Team => &mut team,
                Field::DbtModel => &mut dbt_model,
                Field::DagId => &mut dag_id,
            };
            slot.get_or_insert(value);
        }

        let team = team
            .or_else(|| team_from_user_name(user_name))
            .unwrap_or_else(|| UNATTRIBUTED_TEAM.to_string());

        Self {
            team,
            dbt_model,
            dag_id,
        }
    }
}

/// Team encoded as the user-name prefix before the last underscore.
///
/// Requires at least two non-empty underscore-delimited tokens, so `bob`,
/// `_bob` and `bob_` yield nothing.
fn team_from_user_name(user_name: &str) -> Option<String> {
    let user_name = user_name.trim();
    let (prefix, _) = user_name.rsplit_once('_')?;
    let tokens = user_name
        .split('_')
        .filter(|token| !token.is_empty())
        .count();
    (!prefix.is_empty() && tokens > 1).then(|| prefix.to_lowercase())
}

/// Attributes a single record.
pub fn attribute(record: QueryRecord) -> AttributedRecord {
    let Attribution {
        team,
        dbt_model,
        dag_id,
    } = Attribution::derive(record.query_tag.as_deref(), &record.user_name);
    AttributedRecord {
        record,
        team,
        dbt_model,
        dag_id,
    }
}

/// Attributes every record, preserving order.
pub fn attribute_all(records: Vec<QueryRecord>) -> Vec<AttributedRecord> {
    let attributed: Vec<AttributedRecord> = records.into_iter().map(attribute).collect();
    let unattributed = attributed
        .iter()
        .filter(|r| r.team == UNATTRIBUTED_TEAM)
        .count();
    debug!(
        records = attributed.len(),
        unattributed,
        "Attributed records"
    );
    attributed
}
