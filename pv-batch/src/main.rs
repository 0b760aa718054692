//! Provider Validator batch runner (pv-batch) - Main entry point
//!
//! Reads directory records from a CSV file, runs the validation pipeline
//! over them and writes the batch results.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pv_batch::config::{BatchConfig, CliOverrides};
use pv_batch::extractors::Extractors;
use pv_batch::sink::{MemorySink, OutreachDispatcher, ProfileSink, SqliteSink};
use pv_batch::{db, input, output, BatchScheduler};
use pv_common::config::load_toml_config_or_default;
use pv_common::logging::init_logging;

/// Command-line arguments for pv-batch
#[derive(Parser, Debug)]
#[command(name = "pv-batch")]
#[command(about = "Validate provider directory records from a CSV file")]
#[command(version)]
struct Args {
    /// Input CSV with one record per row
    input: PathBuf,

    /// Maximum records processed concurrently
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Process only the first N records
    #[arg(short, long)]
    limit: Option<usize>,

    /// Write per-record results as CSV
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write the full batch result as JSON
    #[arg(long)]
    json: Option<PathBuf>,

    /// SQLite database file (default: <root folder>/providers.db)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Root folder for data files
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file
    #[arg(long, env = "PV_CONFIG")]
    config: Option<PathBuf>,

    /// Default region for phone numbers without a country code
    #[arg(long)]
    region: Option<String>,

    /// Base URL of the verification page linked from outreach drafts
    #[arg(long)]
    verification_base_url: Option<String>,

    /// Keep results in memory instead of writing the database
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let toml_config = load_toml_config_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    init_logging(&toml_config.logging).context("Failed to initialize logging")?;

    info!("Starting pv-batch v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOverrides {
        root_folder: args.root_folder.clone(),
        database_path: args.database.clone(),
        concurrency: args.concurrency,
        verification_base_url: args.verification_base_url.clone(),
        default_region: args.region.clone(),
    };
    let config = BatchConfig::resolve(&cli, &toml_config);

    let records = input::load_records(&args.input)
        .with_context(|| format!("Failed to read input {}", args.input.display()))?;

    let extractors =
        Extractors::production(config.source_timeout).context("Failed to build HTTP client")?;
    let pipeline = config.build_pipeline(extractors);

    let (sink, dispatcher): (Arc<dyn ProfileSink>, Arc<dyn OutreachDispatcher>) = if args.dry_run {
        info!("Dry run: results are kept in memory only");
        let memory = Arc::new(MemorySink::new());
        (memory.clone() as Arc<dyn ProfileSink>, memory as Arc<dyn OutreachDispatcher>)
    } else {
        let pool = db::init_database_pool(&config.database_path)
            .await
            .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
        info!("Connected to database: {:?}", config.database_path);
        let sqlite = Arc::new(SqliteSink::new(pool));
        (sqlite.clone() as Arc<dyn ProfileSink>, sqlite as Arc<dyn OutreachDispatcher>)
    };

    let cancel_token = CancellationToken::new();
    tokio::spawn(cancel_on_ctrl_c(cancel_token.clone()));

    let scheduler = BatchScheduler::new(pipeline, sink)
        .with_outreach(dispatcher)
        .with_cancellation(cancel_token)
        .with_sink_timeout(config.sink_timeout);

    let result = scheduler
        .run_batch(records, config.concurrency, args.limit)
        .await
        .context("Batch failed")?;

    if let Some(path) = &args.output {
        output::write_csv(path, &result)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    if let Some(path) = &args.json {
        output::write_json(path, &result)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    let completed = result.completed().count();
    let failed = result.failed().count();
    let manual_review = result
        .completed()
        .filter(|o| o.profile.as_ref().is_some_and(|p| !p.flags.is_empty()))
        .count();
    if result.cancelled {
        warn!("Batch was cancelled before all records were processed");
    }

    println!(
        "batch {}: {} records, {} completed ({} need review), {} failed{}",
        result.batch_id,
        result.len(),
        completed,
        manual_review,
        failed,
        if result.cancelled { ", cancelled" } else { "" }
    );

    Ok(())
}

/// Cancel the batch on Ctrl+C; records already running are allowed to finish
async fn cancel_on_ctrl_c(cancel_token: CancellationToken) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received Ctrl+C, cancelling batch");
            cancel_token.cancel();
        }
        Err(e) => warn!("Failed to install Ctrl+C handler: {}", e),
    }
}
