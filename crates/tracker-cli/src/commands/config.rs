use std::path::Path;

use tracker_core::config::{SyncOptions, MAX_AUTOSYNC_MINS};

use crate::cli::ConfigCommands;
use crate::commands::common::open_service;
use crate::error::CliError;

pub async fn run_config(command: ConfigCommands, db_path: &Path) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_config_show(db_path).await,
        ConfigCommands::Set {
            url,
            autosync_mins,
            timeout_secs,
        } => run_config_set(url, autosync_mins, timeout_secs, db_path).await,
    }
}

pub fn format_options(options: &SyncOptions) -> Vec<String> {
    vec![
        format!(
            "Apps Script URL:  {}",
            options.endpoint().as_deref().unwrap_or("(not set)")
        ),
        format!(
            "Autosync:         every {} minutes",
            options.autosync_interval().as_secs() / 60
        ),
        format!(
            "Request timeout:  {} seconds",
            options.request_timeout().as_secs()
        ),
    ]
}

async fn run_config_show(db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    for line in format_options(&service.load_options().await?) {
        println!("{line}");
    }
    Ok(())
}

/// Apply `config set` flags to `options`. An empty URL clears the endpoint.
pub fn apply_config_changes(
    options: &mut SyncOptions,
    url: Option<String>,
    autosync_mins: Option<u64>,
    timeout_secs: Option<u64>,
) -> Result<(), CliError> {
    if let Some(url) = url {
        options.set_endpoint(Some(url))?;
    }
    if let Some(minutes) = autosync_mins {
        if minutes > MAX_AUTOSYNC_MINS {
            return Err(CliError::invalid(
                "autosync",
                format!("must be at most {MAX_AUTOSYNC_MINS} minutes"),
            ));
        }
        options.autosync_mins = minutes;
    }
    if let Some(seconds) = timeout_secs {
        if seconds == 0 {
            return Err(CliError::invalid("timeout", "must be at least 1 second"));
        }
        options.request_timeout_secs = seconds;
    }
    Ok(())
}

async fn run_config_set(
    url: Option<String>,
    autosync_mins: Option<u64>,
    timeout_secs: Option<u64>,
    db_path: &Path,
) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let mut options = service.load_options().await?;
    apply_config_changes(&mut options, url, autosync_mins, timeout_secs)?;
    service.save_options(&options).await?;

    for line in format_options(&options) {
        println!("{line}");
    }
    Ok(())
}
