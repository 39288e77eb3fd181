//! Error types for WareCost Core.
//!
//! Only configuration problems surface as errors. Malformed records are
//! quarantined by the normalizer and degenerate statistics resolve to "no
//! flag", so neither ever reaches this module.

use rust_decimal::Decimal;
use thiserror::Error;

/// Invalid analysis configuration. Always detected before any record is read.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A budget limit is zero or negative.
    #[error("budget limit for team '{team}' must be positive, got {limit}")]
    NonPositiveLimit {
        /// Team the limit was configured for.
        team: String,
        /// The rejected limit.
        limit: Decimal,
    },

    /// A budget amount could not be parsed as a number.
    #[error("budget amount '{amount}' for team '{team}' is not a number")]
    UnparseableAmount {
        /// Team the amount was configured for.
        team: String,
        /// The raw amount text.
        amount: String,
    },

    /// A budget token is not of the form `team:amount`.
    #[error("malformed budget '{0}', expected team:amount (e.g. analytics:500)")]
    MalformedBudgetToken(String),

    /// The same team was given more than one limit.
    #[error("duplicate budget for team '{0}'")]
    DuplicateTeam(String),

    /// A budget was configured for an empty team name.
    #[error("budget team name must not be empty")]
    EmptyTeam,

    /// The z-score threshold is zero, negative or not finite.
    #[error("z-score threshold must be a positive number, got {0}")]
    InvalidThreshold(f64),

    /// The credit price is negative.
    #[error("credit price must be a non-negative number, got {0}")]
    InvalidCreditPrice(Decimal),

    /// An aggregation or grouping dimension name is not recognized.
    #[error("invalid dimension '{0}', valid: dag_id, dbt_model, team, user_name, warehouse_name")]
    UnknownDimension(String),
}

/// Core error type for WareCost operations.
#[derive(Error, Debug)]
pub enum WarecostError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors while loading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML configuration file could not be parsed
    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON budget document could not be parsed
    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for WareCost operations.
pub type Result<T> = std::result::Result<T, WarecostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_conversion() {
        let err: WarecostError = ConfigError::DuplicateTeam("analytics".to_string()).into();
        match err {
            WarecostError::Config(ConfigError::DuplicateTeam(team)) => {
                assert_eq!(team, "analytics");
            }
            _ => panic!("Expected Config error variant"),
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = WarecostError::Config(ConfigError::NonPositiveLimit {
            team: "ml".to_string(),
            limit: Decimal::ZERO,
        });
        let msg = format!("{}", err);
        assert!(msg.contains("Configuration error"));
        assert!(msg.contains("'ml'"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn test_unknown_dimension_lists_valid_names() {
        let msg = ConfigError::UnknownDimension("invalid".to_string()).to_string();
        assert!(msg.contains("'invalid'"));
        assert!(msg.contains("warehouse_name"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: WarecostError = io_err.into();
        assert!(matches!(err, WarecostError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: WarecostError = json_err.into();
        assert!(matches!(err, WarecostError::Json(_)));
    }
}
