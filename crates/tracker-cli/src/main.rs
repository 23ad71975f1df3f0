//! Universal Tracker CLI - track videos, articles and movies from the terminal
//!
//! Items live in a local database first; changes are queued and delivered
//! to the spreadsheet web app by `tracker sync` or `tracker daemon`.

mod cli;
mod commands;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, QueueCommands};
use crate::commands::add::{run_add, AddArgs};
use crate::commands::common::resolve_db_path;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::export::{run_export, run_import};
use crate::commands::list::{run_list, run_reminders, run_show, ListArgs};
use crate::commands::sync::{
    run_archive, run_daemon, run_pull, run_queue_clear, run_queue_list, run_stats, run_sync,
};
use crate::commands::update::{run_done, run_reopen, run_snooze};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "tracker=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Add {
            title,
            url,
            category,
            priority,
            tags,
            notes,
            source,
            reminder_in_mins,
        } => {
            let args = AddArgs {
                title,
                url,
                category,
                priority,
                tags,
                notes,
                source,
                reminder_in_mins,
            };
            run_add(args, &db_path).await?;
        }
        Commands::List {
            status,
            category,
            priority,
            search,
            tags,
            sort,
            limit,
            json,
        } => {
            let args = ListArgs {
                status,
                category,
                priority,
                search,
                tags,
                sort,
                limit,
                json,
            };
            run_list(args, &db_path).await?;
        }
        Commands::Show { id, json } => run_show(&id, json, &db_path).await?,
        Commands::Done { id } => run_done(&id, &db_path).await?,
        Commands::Reopen { id } => run_reopen(&id, &db_path).await?,
        Commands::Delete { id } => run_delete(&id, &db_path).await?,
        Commands::Snooze { id, mins } => run_snooze(&id, mins, &db_path).await?,
        Commands::Reminders { json } => run_reminders(json, &db_path).await?,
        Commands::Sync => run_sync(&db_path).await?,
        Commands::Pull => run_pull(&db_path).await?,
        Commands::Stats => run_stats(&db_path).await?,
        Commands::Archive => run_archive(&db_path).await?,
        Commands::Queue { command } => match command {
            QueueCommands::List { json } => run_queue_list(json, &db_path).await?,
            QueueCommands::Clear => run_queue_clear(&db_path).await?,
        },
        Commands::Export { format, output } => {
            run_export(format, output.as_deref(), &db_path).await?;
        }
        Commands::Import { file } => run_import(&file, &db_path).await?,
        Commands::Config { command } => run_config(command, &db_path).await?,
        Commands::Daemon => run_daemon(&db_path).await?,
    }

    Ok(())
}
