// ABOUTME: Entry point for the tracklog binary.
// ABOUTME: Parses CLI arguments, initializes tracing, runs the startup recovery check, and records points.

mod config;
mod input;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracklog_store::StorageManager;
use tracklog_store::recorder::{self, RecorderError, RecorderHandle};

use crate::config::TracklogConfig;
use crate::input::{LocationEvent, parse_line};

#[derive(Parser)]
#[command(
    name = "tracklog",
    version,
    about = "Buffer GPS points and recover interrupted sessions as GPX"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Recover a session left behind by an abnormal termination
    Recover,
    /// Recover any interrupted session, then record JSON-lines location events from stdin
    Record,
    /// Show how many points are buffered and which GPX files exist
    Status,
    /// Drop every buffered point, e.g. after the session was saved normally
    Discard,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("tracklog=info,tracklog_store=info")
            }),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = TracklogConfig::from_env()?;
    tracing::debug!("loaded config: {:?}", config);

    let manager = StorageManager::new(
        config.home.clone(),
        config.documents_dir.clone(),
        config.creator.clone(),
    )
    .context("failed to prepare storage directories")?;

    match cli.command {
        Command::Recover => {
            if let Some(outcome) = manager.recover_on_startup().await? {
                println!("{}", outcome.path.display());
            }
        }
        Command::Record => {
            manager.recover_on_startup().await?;
            record(&manager).await?;
        }
        Command::Status => {
            let counts = manager.open_store()?.counts()?;
            println!("trackpoints: {}", counts.trackpoints);
            println!("waypoints: {}", counts.waypoints);
            for path in manager.list_documents()? {
                println!("{}", path.display());
            }
        }
        Command::Discard => {
            let removed = manager.open_store()?.delete_all()?;
            tracing::info!(
                "discarded {} trackpoints and {} waypoints",
                removed.trackpoints,
                removed.waypoints
            );
        }
    }

    Ok(())
}

/// Feed stdin into the recorder until EOF. Points stay buffered afterwards;
/// the session is only folded into a file by recovery or dropped by `discard`.
async fn record(manager: &StorageManager) -> anyhow::Result<()> {
    let (handle, task) = recorder::spawn(manager.open_store()?);
    tracing::info!("recording to {}", manager.store_path().display());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        match parse_line(&line) {
            Ok(Some(event)) => apply_event(&handle, event)
                .await
                .with_context(|| format!("recording stopped at line {}", line_no))?,
            Ok(None) => {}
            Err(e) => tracing::warn!("skipping malformed line {}: {}", line_no, e),
        }
    }

    drop(handle);
    let store = task.await?;
    let counts = store.counts()?;
    tracing::info!(
        "input closed with {} trackpoints and {} waypoints buffered",
        counts.trackpoints,
        counts.waypoints
    );
    Ok(())
}

/// Apply one event. Only a fatal recorder error is returned; bad points are logged and skipped.
async fn apply_event(handle: &RecorderHandle, event: LocationEvent) -> Result<(), RecorderError> {
    let result = match event {
        LocationEvent::Fix(fix) => handle.record_fix(fix).await.map(|_| ()),
        LocationEvent::Waypoint(waypoint) => handle.record_waypoint(waypoint).await.map(|_| ()),
        LocationEvent::DeleteWaypoint { index } => handle.delete_waypoint(index).await,
    };

    match result {
        Err(RecorderError::InvalidPoint(e)) => {
            tracing::warn!("skipping invalid point: {}", e);
            Ok(())
        }
        other => other,
    }
}
