//! Per-team budget limits.

use crate::error::{ConfigError, Result};
use rust_decimal::Decimal;
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Validated mapping of team name to credit limit.
///
/// Team names are trimmed and lower-cased so they match attributed teams.
/// Every limit is positive, and each team appears once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Budgets(BTreeMap<String, Decimal>);

/// A budget amount as written in a config document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Amount {
    Number(Decimal),
    Text(String),
}

impl Budgets {
    /// Creates an empty budget set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a limit for `team`.
    pub fn insert(&mut self, team: &str, limit: Decimal) -> std::result::Result<(), ConfigError> {
        let team = normalize_team(team)?;
        if limit <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveLimit { team, limit });
        }
        if self.0.contains_key(&team) {
            return Err(ConfigError::DuplicateTeam(team));
        }
        self.0.insert(team, limit);
        Ok(())
    }

    /// Parses CLI-style `team:amount` tokens, e.g. `analytics:500`.
    pub fn from_tokens<I, S>(tokens: I) -> std::result::Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut budgets = Self::new();
        for token in tokens {
            let token = token.as_ref();
            let (team, amount) = token
                .rsplit_once(':')
                .ok_or_else(|| ConfigError::MalformedBudgetToken(token.to_string()))?;
            budgets.insert(team, parse_amount(team, amount)?)?;
        }
        Ok(budgets)
    }

    /// Parses a JSON object such as `{"analytics": 500, "ml": 100}`.
    ///
    /// Repeated keys are rejected rather than silently overwritten.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let entries: BudgetEntries = serde_json::from_str(json)?;
        Ok(Self::from_entries(entries.0)?)
    }

    fn from_entries(entries: Vec<(String, Amount)>) -> std::result::Result<Self, ConfigError> {
        let mut budgets = Self::new();
        for (team, amount) in entries {
            let limit = match amount {
                Amount::Number(limit) => limit,
                Amount::Text(text) => parse_amount(&team, &text)?,
            };
            budgets.insert(&team, limit)?;
        }
        Ok(budgets)
    }

    /// Combines two budget sets; limits in `overrides` replace those in `self`.
    #[must_use]
    pub fn merge(mut self, overrides: Budgets) -> Self {
        self.0.extend(overrides.0);
        self
    }

    /// Limit configured for `team`, if any.
    pub fn get(&self, team: &str) -> Option<Decimal> {
        self.0.get(team).copied()
    }

    /// Iterates `(team, limit)` pairs in ascending team order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.0.iter().map(|(team, limit)| (team.as_str(), *limit))
    }

    /// Number of configured teams.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no budget is configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn normalize_team(team: &str) -> std::result::Result<String, ConfigError> {
    let team = team.trim().to_lowercase();
    if team.is_empty() {
        Err(ConfigError::EmptyTeam)
    } else {
        Ok(team)
    }
}

/// Parses a plain (`500`, `99.5`) or scientific (`5e2`) amount.
fn parse_amount(team: &str, amount: &str) -> std::result::Result<Decimal, ConfigError> {
    let text = amount.trim();
    text.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| ConfigError::UnparseableAmount {
            team: team.trim().to_string(),
            amount: amount.to_string(),
        })
}

/// Raw map entries in document order, duplicates included.
struct BudgetEntries(Vec<(String, Amount)>);

impl<'de> Deserialize<'de> for BudgetEntries {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = BudgetEntries;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of team name to budget amount")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut map: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Amount>()? {
                    entries.push(entry);
                }
                Ok(BudgetEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

impl<'de> Deserialize<'de> for Budgets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let entries = BudgetEntries::deserialize(deserializer)?;
        Budgets::from_entries(entries.0).map_err(de::Error::custom)
    }
}
