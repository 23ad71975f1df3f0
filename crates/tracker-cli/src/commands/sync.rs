use std::path::Path;

use tracker_core::sync::{CycleOutcome, SyncReport};
use tracker_core::QueueEntry;

use crate::commands::common::{open_service, Service};
use crate::error::CliError;

/// Map the core "no endpoint" error onto the CLI hint.
fn require_remote(error: tracker_core::Error) -> CliError {
    match error {
        tracker_core::Error::NotConfigured => CliError::SyncNotConfigured,
        other => CliError::Core(other),
    }
}

pub fn describe_cycle(outcome: CycleOutcome) -> Result<String, CliError> {
    match outcome {
        CycleOutcome::AlreadyRunning => Ok("A sync is already running".to_string()),
        CycleOutcome::NotConfigured => Err(CliError::SyncNotConfigured),
        CycleOutcome::Completed(SyncReport {
            batches: 0,
            remaining: 0,
            ..
        }) => Ok("Nothing to sync".to_string()),
        CycleOutcome::Completed(report) => Ok(format!(
            "Sync completed: {} changes sent in {} batches, {} still queued",
            report.delivered, report.batches, report.remaining
        )),
    }
}

pub async fn run_sync(db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let outcome = service.sync_now().await?;
    println!("{}", describe_cycle(outcome)?);
    Ok(())
}

pub async fn run_pull(db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let count = service.pull_all().await.map_err(require_remote)?;
    println!("Pulled {count} items");
    Ok(())
}

pub async fn run_stats(db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let stats = service.remote_stats().await.map_err(require_remote)?;
    println!("Active:         {}", stats.active);
    println!("Archived:       {}", stats.archived);
    println!("Total:          {}", stats.total);
    println!("Archive sheets: {}", stats.archive_sheets);
    Ok(())
}

pub async fn run_archive(db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let message = service.trigger_archive().await.map_err(require_remote)?;
    if message.is_empty() {
        println!("Archive triggered");
    } else {
        println!("{message}");
    }
    Ok(())
}

pub fn describe_entry(entry: &QueueEntry) -> String {
    match entry {
        QueueEntry::Upsert(item) => format!("upsert {} {}", item.id, item.title),
        QueueEntry::Delete { id } => format!("delete {id}"),
        QueueEntry::Raw(value) => format!("raw    {value}"),
    }
}

pub async fn run_queue_list(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let entries = service.queue().peek_all().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("Queue is empty.");
    } else {
        for entry in &entries {
            println!("{}", describe_entry(entry));
        }
    }
    Ok(())
}

pub async fn run_queue_clear(db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let dropped = service.queue().clear().await?;
    println!("Discarded {dropped} queued changes");
    Ok(())
}

pub async fn run_daemon(db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let options = service.load_options().await?;
    if !options.is_configured() {
        return Err(CliError::SyncNotConfigured);
    }

    let interval = options.autosync_interval();
    println!(
        "Autosync every {} minutes, press Ctrl-C to stop",
        interval.as_secs() / 60
    );
    let cycles = run_until_ctrl_c(&service, interval).await;
    println!("Stopped after {cycles} sync cycles");
    Ok(())
}

async fn run_until_ctrl_c(service: &Service, interval: std::time::Duration) -> usize {
    service
        .scheduler()
        .run_periodic(interval, async {
            if let Err(error) = tokio::signal::ctrl_c().await {
                tracing::warn!("Failed to listen for Ctrl-C: {error}");
                std::future::pending::<()>().await;
            }
        })
        .await
}
