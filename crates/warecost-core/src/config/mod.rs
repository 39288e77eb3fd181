//! Analysis configuration.
//!
//! Configuration is an explicit value handed to the pipeline; nothing is read
//! from global state. It can be built in code, deserialized from JSON, or
//! loaded from a TOML file:
//!
//! ```toml
//! z_threshold = 2.5
//! grouping = "team"
//! credit_price = 3.0
//! breakdown_dimensions = ["team", "warehouse_name"]
//!
//! [budgets]
//! analytics = 500
//! ml = 100
//! ```

mod budgets;

pub use budgets::Budgets;

use crate::error::{ConfigError, Result};
use crate::records::Dimension;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default z-score threshold for anomaly flags.
pub const DEFAULT_Z_THRESHOLD: f64 = 2.0;

/// Default USD price of one warehouse credit.
pub const DEFAULT_CREDIT_PRICE: Decimal = Decimal::from_parts(3, 0, 0, false, 0);

fn default_z_threshold() -> f64 {
    DEFAULT_Z_THRESHOLD
}

fn default_credit_price() -> Decimal {
    DEFAULT_CREDIT_PRICE
}

fn default_breakdown_dimensions() -> Vec<Dimension> {
    Dimension::DEFAULT_BREAKDOWNS.to_vec()
}

/// Parameters of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    /// `|z|` at or above which a record is flagged.
    #[serde(default = "default_z_threshold")]
    pub z_threshold: f64,
    /// Dimension whose groups serve as separate reference distributions.
    #[serde(default)]
    pub grouping: Option<Dimension>,
    /// USD price of one credit.
    #[serde(default = "default_credit_price")]
    pub credit_price: Decimal,
    /// Dimensions broken down in the report.
    #[serde(default = "default_breakdown_dimensions")]
    pub breakdown_dimensions: Vec<Dimension>,
    /// Per-team credit limits.
    #[serde(default)]
    pub budgets: Budgets,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            z_threshold: DEFAULT_Z_THRESHOLD,
            grouping: None,
            credit_price: DEFAULT_CREDIT_PRICE,
            breakdown_dimensions: default_breakdown_dimensions(),
            budgets: Budgets::default(),
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        debug!(path = %path.display(), "Loaded analysis config");
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Budgets are validated on construction, so only the scalar settings are
    /// checked here.
    ///
    /// # Errors
    /// Returns error if any configuration value is invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !self.z_threshold.is_finite() || self.z_threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(self.z_threshold));
        }
        if self.credit_price < Decimal::ZERO {
            return Err(ConfigError::InvalidCreditPrice(self.credit_price));
        }
        Ok(())
    }

    /// Sets the z-score threshold.
    #[must_use]
    pub fn with_z_threshold(mut self, z_threshold: f64) -> Self {
        self.z_threshold = z_threshold;
        self
    }

    /// Sets the anomaly grouping dimension.
    #[must_use]
    pub fn with_grouping(mut self, grouping: Option<Dimension>) -> Self {
        self.grouping = grouping;
        self
    }

    /// Sets the credit price.
    #[must_use]
    pub fn with_credit_price(mut self, credit_price: Decimal) -> Self {
        self.credit_price = credit_price;
        self
    }

    /// Sets the dimensions broken down in the report.
    #[must_use]
    pub fn with_breakdown_dimensions(mut self, dimensions: Vec<Dimension>) -> Self {
        self.breakdown_dimensions = dimensions;
        self
    }

    /// Sets the team budgets.
    #[must_use]
    pub fn with_budgets(mut self, budgets: Budgets) -> Self {
        self.budgets = budgets;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WarecostError;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.z_threshold, 2.0);
        assert_eq!(config.credit_price, dec!(3.0));
        assert_eq!(config.grouping, None);
        assert_eq!(
            config.breakdown_dimensions,
            Dimension::DEFAULT_BREAKDOWNS.to_vec()
        );
        assert!(config.budgets.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("warecost.toml");
        std::fs::write(
            &config_path,
            r#"
z_threshold = 2.5
grouping = "team"
breakdown_dimensions = ["team", "user_name"]

[budgets]
analytics = 500
ML = 100.5
"#,
        )
        .unwrap();

        let config = AnalysisConfig::load(&config_path).unwrap();
        assert_eq!(config.z_threshold, 2.5);
        assert_eq!(config.grouping, Some(Dimension::Team));
        assert_eq!(config.credit_price, DEFAULT_CREDIT_PRICE);
        assert_eq!(
            config.breakdown_dimensions,
            vec![Dimension::Team, Dimension::UserName]
        );
        assert_eq!(config.budgets.get("analytics"), Some(dec!(500)));
        assert_eq!(config.budgets.get("ml"), Some(dec!(100.5)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let absent = temp_dir.path().join("absent.toml");
        let config = AnalysisConfig::load(absent).unwrap();
        assert_eq!(config, AnalysisConfig::default());
    }

    #[test]
    fn test_load_rejects_invalid_threshold() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("warecost.toml");
        std::fs::write(&config_path, "z_threshold = -1.0\n").unwrap();

        let err = AnalysisConfig::load(&config_path).unwrap_err();
        assert!(matches!(
            err,
            WarecostError::Config(ConfigError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_load_rejects_bad_budget() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("warecost.toml");
        std::fs::write(&config_path, "[budgets]\nanalytics = 0\n").unwrap();

        let err = AnalysisConfig::load(&config_path).unwrap_err();
        assert!(matches!(err, WarecostError::Toml(_)));
        assert!(err.to_string().contains("must be positive"));
    }

    #[test]
    fn test_load_rejects_unknown_dimension() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("warecost.toml");
        std::fs::write(&config_path, "grouping = \"region\"\n").unwrap();

        assert!(matches!(
            AnalysisConfig::load(&config_path),
            Err(WarecostError::Toml(_))
        ));
    }

    #[test]
    fn test_validate_credit_price() {
        let config = AnalysisConfig::new().with_credit_price(dec!(-1));
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidCreditPrice(dec!(-1)))
        );
        let free = AnalysisConfig::new().with_credit_price(Decimal::ZERO);
        assert!(free.validate().is_ok());
    }

    #[test]
    fn test_deserialize_json() {
        let json = r#"{"z_threshold": 3.0, "credit_price": 2.5, "budgets": {"analytics": 10}}"#;
        let config: AnalysisConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.z_threshold, 3.0);
        assert_eq!(config.credit_price, dec!(2.5));
        assert_eq!(config.budgets.get("analytics"), Some(dec!(10)));
    }
}
