//! Command implementations for the WareCost CLI.

pub mod analyze;
pub mod anomalies;
pub mod breakdown;
pub mod budget;
mod render;

use anyhow::{Context, Result, bail};
use rust_decimal::Decimal;
use serde_json::Value;
use std::path::{Path, PathBuf};
use warecost_core::{AnalysisConfig, AnalysisReport, Budgets, Dimension};

/// Input and configuration options shared by every analysis command.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct AnalysisArgs {
    /// JSON file containing an array of query records
    pub file: PathBuf,

    /// Team budget in credits as team:amount (repeatable, e.g. analytics:500)
    #[arg(short = 'b', long = "budget", value_name = "TEAM:AMOUNT")]
    pub budgets: Vec<String>,

    /// JSON file with a {"team": amount} budget object
    #[arg(long)]
    pub budgets_file: Option<PathBuf>,

    /// TOML analysis config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Z-score at or above which a query is flagged
    #[arg(long)]
    pub z_threshold: Option<f64>,

    /// Score anomalies within groups of this dimension instead of the whole batch
    #[arg(long)]
    pub group_by: Option<String>,

    /// USD price of one warehouse credit
    #[arg(long)]
    pub credit_price: Option<Decimal>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AnalysisArgs {
    /// Builds the analysis configuration from the config file and flags.
    ///
    /// Flags override the config file. Budgets from the config file, the
    /// budgets file and `--budget` are merged in that order, later sources
    /// replacing earlier limits for the same team.
    pub async fn build_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found: {}", path.display());
                }
                AnalysisConfig::load(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?
            }
            None => AnalysisConfig::default(),
        };

        if let Some(z_threshold) = self.z_threshold {
            config.z_threshold = z_threshold;
        }
        if let Some(credit_price) = self.credit_price {
            config.credit_price = credit_price;
        }
        if let Some(group_by) = &self.group_by {
            config.grouping = Some(parse_dimension(group_by)?);
        }

        let mut budgets = std::mem::take(&mut config.budgets);
        if let Some(path) = &self.budgets_file {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read budgets file {}", path.display()))?;
            let from_file = Budgets::from_json_str(&content)
                .with_context(|| format!("Invalid budgets file {}", path.display()))?;
            budgets = budgets.merge(from_file);
        }
        let from_flags = Budgets::from_tokens(&self.budgets).context("Invalid --budget value")?;
        config.budgets = budgets.merge(from_flags);

        config.validate().context("Invalid analysis configuration")?;
        Ok(config)
    }
}

/// Parses a dimension name, reporting the valid names on failure.
pub fn parse_dimension(name: &str) -> Result<Dimension> {
    Ok(name.parse::<Dimension>()?)
}

/// Reads a JSON array of raw query records.
pub async fn load_records(path: &Path) -> Result<Vec<Value>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read query history {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| {
        format!(
            "Query history {} must be a JSON array of query records",
            path.display()
        )
    })
}

/// Loads the records named by `args` and runs the analysis.
pub async fn run(args: &AnalysisArgs, config: &AnalysisConfig) -> Result<AnalysisReport> {
    let records = load_records(&args.file).await?;
    Ok(warecost_core::analyze(&records, config)?)
}

/// Prints a value as pretty JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
