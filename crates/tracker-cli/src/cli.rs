use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "tracker")]
#[command(about = "Track videos, articles and movies with local-first sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Track a new item
    #[command(alias = "new")]
    Add {
        /// Item title
        #[arg(required = true)]
        title: Vec<String>,
        #[arg(long)]
        url: Option<String>,
        /// Movie, TV, Trailer, Video, Blog, Podcast, Book, Course, Game or Other
        #[arg(short, long)]
        category: Option<String>,
        /// low, medium or high
        #[arg(short, long)]
        priority: Option<String>,
        /// Comma-separated tags
        #[arg(short, long)]
        tags: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Where the item was found
        #[arg(long)]
        source: Option<String>,
        /// Set a reminder this many minutes from now
        #[arg(long, value_name = "MINS")]
        reminder_in_mins: Option<u64>,
    },
    /// List tracked items
    List {
        /// todo or done
        #[arg(long)]
        status: Option<String>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        priority: Option<String>,
        /// Match title, notes or tags
        #[arg(short, long)]
        search: Option<String>,
        /// Require a tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// updated_desc, updated_asc, created_desc, created_asc, priority_desc or priority_asc
        #[arg(long, default_value = "updated_desc")]
        sort: String,
        /// Number of items to show
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one item
    Show {
        /// Item ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark an item as done
    Done {
        /// Item ID or unique ID prefix
        id: String,
    },
    /// Mark an item as todo again
    Reopen {
        /// Item ID or unique ID prefix
        id: String,
    },
    /// Delete an item
    #[command(alias = "rm")]
    Delete {
        /// Item ID or unique ID prefix
        id: String,
    },
    /// Push an item's reminder into the future
    Snooze {
        /// Item ID or unique ID prefix
        id: String,
        /// Minutes to snooze for (default 60)
        #[arg(long)]
        mins: Option<u64>,
    },
    /// List reminders that are still pending
    Reminders {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Send queued changes to the remote sheet
    Sync,
    /// Replace local items with everything on the remote sheet
    Pull,
    /// Show remote sheet statistics
    Stats,
    /// Move old remote rows to archive sheets
    Archive,
    /// Inspect the outbound queue
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Export items
    Export {
        /// Output format
        #[arg(long, value_enum, default_value_t = ExportFormat::Json)]
        format: ExportFormat,
        /// Optional output file path (prints to stdout if omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Import items from a JSON export
    Import {
        /// Path to an export file
        file: PathBuf,
    },
    /// Show or change sync settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Sync periodically until interrupted
    Daemon,
}

#[derive(Subcommand)]
pub enum QueueCommands {
    /// List pending entries
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Discard every pending entry
    Clear,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print current settings
    Show,
    /// Update settings
    Set {
        /// Apps Script web app URL (empty string clears it)
        #[arg(long, value_name = "URL")]
        url: Option<String>,
        /// Autosync interval in minutes (minimum 5)
        #[arg(long, value_name = "MINS")]
        autosync_mins: Option<u64>,
        /// HTTP request timeout in seconds
        #[arg(long, value_name = "SECS")]
        timeout_secs: Option<u64>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ExportFormat {
    Json,
    Markdown,
}
