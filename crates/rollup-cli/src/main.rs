//! Rollup CLI: run a pipeline stage once and print its outcome.
//!
//! Configuration comes from the environment (see `PipelineConfig::from_env`).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rollup_cli::{print_json, read_event, with_report_date};
use rollup_core::PipelineConfig;
use rollup_infra::{init_telemetry, DEFAULT_LOG_FILTER};
use rollup_storage::create_storage;
use rollup_worker::{DailyReportHandler, IngestionHandler, IngestionReport, Outcome};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "rollup", about = "Upload ingestion and daily summary pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every upload in a storage event document
    Ingest {
        /// Event file, or `-` for stdin
        #[arg(long)]
        event: PathBuf,
    },
    /// Process a single object
    Process {
        /// Object key
        #[arg(long)]
        key: String,
        /// Source bucket (defaults to RAW_BUCKET)
        #[arg(long)]
        bucket: Option<String>,
    },
    /// Generate the daily summary
    DailyReport {
        /// Date to summarize, YYYY-MM-DD (defaults to yesterday UTC)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Trigger event file, or `-` for stdin
        #[arg(long)]
        event: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let config = PipelineConfig::from_env().context("Failed to load configuration")?;
    if let Err(e) = init_telemetry(config.log_format, DEFAULT_LOG_FILTER) {
        eprintln!("Failed to initialize tracing: {}", e);
    }

    let storage = create_storage(&config)
        .await
        .context("Failed to create storage backend")?;
    tracing::debug!(
        backend = %storage.backend_type(),
        environment = %config.environment,
        production = config.is_production(),
        "Storage ready"
    );

    let succeeded = match cli.command {
        Commands::Ingest { event } => {
            let outcome = match read_event(&event) {
                Ok(event) => IngestionHandler::new(storage, &config).invoke(&event).await,
                Err(e) => Outcome::failure("Error processing file", format!("{:#}", e), None),
            };
            print_json(&outcome)?;
            outcome.is_success()
        }
        Commands::Process { key, bucket } => {
            let bucket = bucket
                .or_else(|| config.raw_bucket.clone())
                .context("No bucket given. Pass --bucket or set RAW_BUCKET")?;
            let handler = IngestionHandler::new(storage, &config);
            let report = IngestionReport {
                items: vec![handler.ingest(&bucket, &key).await],
            };
            let outcome = IngestionHandler::into_outcome(report);
            print_json(&outcome)?;
            outcome.is_success()
        }
        Commands::DailyReport { date, event } => {
            let event = match event {
                Some(path) => read_event(&path),
                None => Ok(Value::Object(Default::default())),
            };
            let outcome = match event {
                Ok(event) => {
                    let event = with_report_date(event, date);
                    DailyReportHandler::new(storage, &config).invoke(&event).await
                }
                Err(e) => {
                    Outcome::failure("Error generating daily report", format!("{:#}", e), None)
                }
            };
            print_json(&outcome)?;
            outcome.is_success()
        }
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
