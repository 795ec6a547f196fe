//! Parascope Indexer CLI
//!
//! Entry point for the indexer binary. Provides subcommands for:
//! - `run` - Backfill the configured interval, optionally tail the head
//! - `init-schema` - Create the partitioned schema and exit
//! - `version` - Show version information
//!
//! # Exit Codes
//!
//! - `0` - clean completion (backfill finished or live tail cancelled)
//! - `1` - unrecoverable runtime failure (database loss mid-run)
//! - `2` - configuration error
//! - `3` - schema creation failure

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use parascope_indexer::config::Settings;
use parascope_indexer::error::IngestError;
use parascope_indexer::ingest::IngestionDriver;
use parascope_indexer::ports::BlockStore;
use parascope_indexer::store::PostgresStore;

/// Parascope Block Indexer
#[derive(Parser, Debug)]
#[command(name = "parascope-indexer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "parascope.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Backfill the configured interval, then optionally tail the head
    Run {
        /// Override the configured start of the interval
        #[arg(long)]
        start_id: Option<u64>,

        /// Override the configured end of the interval (0 = head)
        #[arg(long)]
        end_id: Option<u64>,

        /// Keep tailing the chain head after the backfill completes
        #[arg(long)]
        live: bool,
    },

    /// Create the partitioned schema and exit
    InitSchema,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    info!(version = parascope_indexer::VERSION, "Starting Parascope Indexer");

    if matches!(cli.command, Commands::Version) {
        println!("parascope-indexer {}", parascope_indexer::VERSION);
        return ExitCode::SUCCESS;
    }

    let settings = match Settings::load(&cli.config) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return ExitCode::from(2);
        }
    };
    if let Err(errors) = settings.validate() {
        for message in &errors {
            error!(%message, "Invalid configuration");
        }
        return ExitCode::from(2);
    }

    match run(&cli.command, &settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e @ IngestError::Schema(_)) => {
            error!(error = %e, "Schema creation failed");
            ExitCode::from(3)
        }
        Err(e @ IngestError::Config(_)) => {
            error!(error = %e, "Configuration rejected");
            ExitCode::from(2)
        }
        Err(e) => {
            error!(error = %e, "Ingestion failed");
            ExitCode::FAILURE
        }
    }
}

/// Execute the selected subcommand against a built pipeline.
async fn run(command: &Commands, settings: &Settings) -> Result<(), IngestError> {
    let reader = chain_reader::ChainReaderClient::new(&settings.chain_reader_url)
        .map_err(|e| IngestError::Config(e.to_string()))?;
    let store = Arc::new(
        PostgresStore::connect(&settings.database_url)
            .await?
            .with_tablespaces(
                settings.fast_tablespace.clone(),
                settings.slow_tablespace.clone(),
            ),
    );
    store.ping().await?;

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let driver = IngestionDriver::new(
        Arc::new(reader),
        Arc::clone(&store),
        settings.chain_spec(),
        settings.batch_size,
        settings.max_workers,
        settings.flush_interval(),
        cancel,
    );

    let result = match command {
        Commands::Run {
            start_id,
            end_id,
            live,
        } => {
            let start = start_id.unwrap_or(settings.start_id);
            let end = match end_id {
                Some(0) => None,
                Some(end) => Some(*end),
                None if settings.end_is_head() => None,
                None => Some(settings.end_id),
            };
            driver.run(start, end, *live || settings.live).await
        }
        Commands::InitSchema => {
            driver.ensure_schema().await.map(|()| {
                info!(chain = %settings.chain_spec(), "Schema created");
            })
        }
        Commands::Version => Ok(()),
    };

    store.close().await;
    result
}

/// Cancel the pipeline token on ctrl-c for a graceful drain.
fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, draining");
            cancel.cancel();
        }
    });
}
