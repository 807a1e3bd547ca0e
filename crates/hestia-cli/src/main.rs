mod jobs;
mod sync;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use hestia_client::{ClientSessionFactory, NotionClient};
use hestia_core::models::ListingRequest;
use hestia_core::{
    BatchConfig, BatchDriver, BatchReport, FetchConfig, ListingService, ResilientFetcher,
    TracingBatchReporter, recover, select_strategy,
};

use crate::jobs::load_jobs;
use crate::sync::{CliSink, NotionOutcomeSink};

/// Exit status when at least one job was unrecoverable, blocked or timed out.
const EXIT_NOT_PROCEEDED: u8 = 2;

#[derive(Parser)]
#[command(name = "hestia", version, about = "Real-estate listing recovery and extraction")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recover, fetch and extract a single listing
    Scrape {
        /// Listing URL or mangled identifier
        identifier: String,

        /// Existing Notion page to update instead of creating a card
        #[arg(short, long)]
        destination: Option<String>,

        #[command(flatten)]
        sync: SyncArgs,
    },

    /// Process every listing of a CSV file (`identifier,destination_id`)
    Batch {
        /// Path to the CSV job file
        #[arg(short, long)]
        file: PathBuf,

        /// Random extra pause between jobs, in milliseconds
        #[arg(long, default_value_t = 0)]
        jitter_ms: u64,

        #[command(flatten)]
        sync: SyncArgs,
    },

    /// Show the URL an identifier recovers to, without fetching it
    Recover {
        /// Listing URL or mangled identifier
        identifier: String,
    },
}

#[derive(Args)]
struct SyncArgs {
    /// Print results only, do not write to Notion
    #[arg(long, default_value_t = false)]
    no_sync: bool,

    /// Notion integration token
    #[arg(long, env = "NOTION_TOKEN", hide_env_values = true)]
    notion_token: Option<String>,

    /// Notion database receiving new cards
    #[arg(long, env = "NOTION_DB_ID")]
    notion_db: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout carries JSON results
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hestia=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let all_proceeded = match cli.command {
        Commands::Scrape {
            identifier,
            destination,
            sync,
        } => {
            let jobs = vec![ListingRequest::new(identifier, destination)];
            let report = run_jobs(jobs, &sync, BatchConfig::from_env()?, true).await?;
            report.all_proceeded()
        }
        Commands::Batch {
            file,
            jitter_ms,
            sync,
        } => {
            let jobs = load_jobs(&file)?;
            if jobs.is_empty() {
                tracing::warn!(file = %file.display(), "No jobs found");
            }
            let config = BatchConfig::from_env()?.with_jitter(Duration::from_millis(jitter_ms));
            let report = run_jobs(jobs, &sync, config, false).await?;
            eprintln!("{}", serde_json::to_string_pretty(&report)?);
            report.all_proceeded()
        }
        Commands::Recover { identifier } => cmd_recover(&identifier)?,
    };

    Ok(if all_proceeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_NOT_PROCEEDED)
    })
}

/// Build the pipeline from the environment and drive `jobs` through it.
async fn run_jobs(
    jobs: Vec<ListingRequest>,
    sync: &SyncArgs,
    config: BatchConfig,
    pretty: bool,
) -> Result<BatchReport> {
    let fetch_config = FetchConfig::from_env().context("Invalid fetch configuration")?;
    config
        .check_against(&fetch_config)
        .context("Invalid batch configuration")?;
    if fetch_config.proxy.is_none() {
        tracing::info!("No RESIDENTIAL_PROXY set, blocked pages will not be retried");
    }

    let sink = CliSink::new(notion_sink(sync)?, pretty);
    let factory = ClientSessionFactory::new(&fetch_config);
    let driver = BatchDriver::new(
        ListingService::new(ResilientFetcher::new(factory, fetch_config)),
        config,
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current job");
            on_signal.cancel();
        }
    });

    Ok(driver.run(jobs, &sink, cancel, &TracingBatchReporter).await)
}

fn notion_sink(sync: &SyncArgs) -> Result<Option<NotionOutcomeSink>> {
    if sync.no_sync {
        return Ok(None);
    }
    let token = sync
        .notion_token
        .as_deref()
        .context("NOTION_TOKEN not set. Required for Notion sync (or pass --no-sync).")?;
    if sync.notion_db.is_none() {
        tracing::warn!("NOTION_DB_ID not set, only jobs with a destination will be synced");
    }
    let client = NotionClient::new(token).map_err(|e| anyhow::anyhow!(e))?;
    Ok(Some(NotionOutcomeSink::new(client, sync.notion_db.clone())))
}

fn cmd_recover(identifier: &str) -> Result<bool> {
    let (output, recovered) = match recover(identifier) {
        Ok(url) => (
            json!({
                "identifier": identifier,
                "url": url,
                "host": url.host(),
                "strategy": select_strategy(&url).name(),
            }),
            true,
        ),
        Err(failure) => (
            json!({
                "identifier": identifier,
                "failure": failure.reason_code(),
                "detail": failure.to_string(),
            }),
            false,
        ),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(recovered)
}
