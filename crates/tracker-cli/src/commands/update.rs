use std::path::Path;
use std::time::Duration;

use tracker_core::Status;

use crate::commands::common::{format_timestamp, open_service, resolve_item};
use crate::error::CliError;

pub async fn run_done(id: &str, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let item = resolve_item(&service, id).await?;

    let item = service.mark_done(&item.id).await?;
    println!("Done: {}", item.title);
    Ok(())
}

pub async fn run_reopen(id: &str, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let item = resolve_item(&service, id).await?;

    let item = service.set_status(&item.id, Status::Todo).await?;
    println!("Reopened: {}", item.title);
    Ok(())
}

pub async fn run_snooze(id: &str, minutes: Option<u64>, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let item = resolve_item(&service, id).await?;

    let duration = minutes.map(|minutes| Duration::from_secs(minutes.saturating_mul(60)));
    let item = service.snooze_reminder(&item.id, duration).await?;
    let until = item.reminder_time.map(format_timestamp).unwrap_or_default();
    println!("Snoozed until {until}: {}", item.title);
    Ok(())
}
