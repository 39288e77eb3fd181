//! WareCost CLI - Command-line interface for warehouse query cost attribution
//!
//! This CLI provides a `warecost` command that reads a JSON export of
//! warehouse query history and reports spend by team, warehouse, dbt model and
//! DAG, together with cost anomalies and budget alerts.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{AnalysisArgs, analyze, anomalies, breakdown, budget};

/// WareCost - Data warehouse query cost attribution
///
/// Traces warehouse credit spend to the teams, pipelines and dashboards that
/// issued the queries.
#[derive(Parser, Debug)]
#[command(
    name = "warecost",
    author,
    version,
    about = "WareCost - Data warehouse query cost attribution",
    long_about = "WareCost attributes data warehouse query spend to teams, dbt models and \
                  DAGs.\nIt flags statistically unusual query costs and checks per-team budgets."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze query history and print the full cost report
    ///
    /// Prints spend breakdowns, anomalies, budget status and any records that
    /// were quarantined because they were malformed.
    Analyze {
        #[command(flatten)]
        args: AnalysisArgs,
    },

    /// Break spend down by a single dimension
    Breakdown {
        #[command(flatten)]
        args: AnalysisArgs,

        /// Dimension to group by (team, warehouse_name, dbt_model, dag_id, user_name)
        dimension: String,
    },

    /// List queries with anomalous cost
    Anomalies {
        #[command(flatten)]
        args: AnalysisArgs,
    },

    /// Check team spend against budgets
    ///
    /// At least one budget must be given with --budget, --budgets-file or a
    /// [budgets] table in the config file.
    BudgetCheck {
        #[command(flatten)]
        args: AnalysisArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Execute command
    match args.command {
        Command::Analyze { args } => analyze::execute(args).await?,
        Command::Breakdown { args, dimension } => breakdown::execute(args, dimension).await?,
        Command::Anomalies { args } => anomalies::execute(args).await?,
        Command::BudgetCheck { args } => budget::execute(args).await?,
    }

    Ok(())
}
