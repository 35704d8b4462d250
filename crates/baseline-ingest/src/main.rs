//! Baseline Ingest - API-Tennis ingestion tool

use anyhow::Result;
use baseline_common::logging::{init_logging, LogConfig, LogLevel};
use baseline_ingest::{
    list_upcoming, ApiTennisClient, IngestConfig, IngestOrchestrator, PgStore,
};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "baseline-ingest")]
#[command(author, version, about = "API-Tennis data ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Run a full ingestion: players, tournaments, rankings
    Run {
        /// Print the JSON run summary to stdout
        #[arg(long)]
        summary_json: bool,
    },

    /// List upcoming tournaments without writing anything
    ///
    /// Useful for verifying connectivity and data shape before a real run.
    Upcoming,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut log_config =
        LogConfig::from_env().unwrap_or_else(|_| LogConfig::with_level(LogLevel::Info));
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    init_logging(&log_config)?;

    let config = IngestConfig::load()?;
    if config.using_insecure_default_key() {
        warn!("API_TENNIS_KEY is unset; running with the insecure default key");
    }

    let client = ApiTennisClient::new(&config)?;

    match cli.command {
        Command::Run { summary_json } => {
            let store = PgStore::connect(&config.database).await?;
            let mut orchestrator = IngestOrchestrator::new(client, store, config);

            let summary = orchestrator.run().await?;

            if summary_json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }

            if !summary.fully_successful() {
                warn!(
                    errors = summary.errors.len(),
                    "Ingestion finished with recorded failures"
                );
            }
        },
        Command::Upcoming => {
            let events = list_upcoming(&client).await?;
            info!(count = events.len(), "Upcoming tournaments fetched");
            println!("{}", serde_json::to_string_pretty(&events)?);
        },
    }

    Ok(())
}
