use std::env;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracker_core::db::Database;
use tracker_core::search::ItemSort;
use tracker_core::services::ItemService;
use tracker_core::util::now_millis;
use tracker_core::{Item, Priority, Status};

use crate::error::CliError;

pub type Service = ItemService<Database>;

/// Row shape for `--json` listings.
#[derive(Debug, Serialize)]
pub struct ItemListItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub status: Status,
    pub category: String,
    pub priority: Priority,
    pub tags: Vec<String>,
    pub reminder_time: Option<i64>,
    pub added_at: i64,
    pub updated_at: Option<i64>,
    pub relative_time: String,
}

pub fn item_to_list_item(item: &Item, now_ms: i64) -> ItemListItem {
    ItemListItem {
        id: item.id.to_string(),
        title: item.title.clone(),
        url: item.url.clone(),
        status: item.status,
        category: item.category.clone(),
        priority: item.priority,
        tags: item.tags.clone(),
        reminder_time: item.reminder_time,
        added_at: item.added_at,
        updated_at: item.updated_at,
        relative_time: format_relative_time(last_change(item), now_ms),
    }
}

fn last_change(item: &Item) -> i64 {
    item.updated_at.unwrap_or(item.added_at)
}

pub fn format_item_lines(items: &[Item], now_ms: i64) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let id_prefix: String = item.id.as_str().chars().take(8).collect();
            let mark = if item.is_done() { "x" } else { " " };
            let mut line = format!(
                "{id_prefix} [{mark}] {} ({}, {}) {}",
                item.title,
                item.category,
                item.priority,
                format_relative_time(last_change(item), now_ms)
            );
            let tags = render_tags(item);
            if !tags.is_empty() {
                line.push(' ');
                line.push_str(&tags);
            }
            line
        })
        .collect()
}

pub fn format_item_details(item: &Item) -> Vec<String> {
    let mut lines = vec![
        format!("ID:        {}", item.id),
        format!("Title:     {}", item.title),
        format!("Status:    {}", item.status),
        format!("Category:  {}", item.category),
        format!("Priority:  {}", item.priority),
    ];
    let optional = [("URL", &item.url), ("Source", &item.source)];
    for (label, value) in optional {
        if !value.is_empty() {
            lines.push(format!("{:<11}{value}", format!("{label}:")));
        }
    }
    if !item.tags.is_empty() {
        lines.push(format!("Tags:      {}", item.tags.join(", ")));
    }
    if let Some(reminder) = item.reminder_time {
        lines.push(format!("Reminder:  {}", format_timestamp(reminder)));
    }
    lines.push(format!("Added:     {}", format_timestamp(item.added_at)));
    if let Some(updated_at) = item.updated_at {
        lines.push(format!("Updated:   {}", format_timestamp(updated_at)));
    }
    if let Some(completed_at) = item.completed_at {
        lines.push(format!("Completed: {}", format_timestamp(completed_at)));
    }
    for (key, value) in &item.extra {
        let rendered = value
            .as_str()
            .map_or_else(|| value.to_string(), ToString::to_string);
        lines.push(format!("{key}: {rendered}"));
    }
    if !item.notes.trim().is_empty() {
        lines.push(String::new());
        lines.push(item.notes.trim().to_string());
    }
    lines
}

pub fn render_tags(item: &Item) -> String {
    item.tags
        .iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn normalize_item_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyItemId);
    }
    Ok(trimmed.to_string())
}

pub fn parse_status(raw: Option<&str>) -> Result<Option<Status>, CliError> {
    raw.map(|value| value.parse().map_err(|error| CliError::invalid("status", error)))
        .transpose()
}

pub fn parse_priority(raw: Option<&str>) -> Result<Option<Priority>, CliError> {
    raw.map(|value| value.parse().map_err(|error| CliError::invalid("priority", error)))
        .transpose()
}

pub fn parse_sort(raw: &str) -> Result<ItemSort, CliError> {
    raw.parse().map_err(|error| CliError::invalid("sort", error))
}

/// Minutes from now as a Unix-ms timestamp
pub fn minutes_from_now(minutes: u64) -> Result<i64, CliError> {
    i64::try_from(minutes)
        .ok()
        .and_then(|minutes| minutes.checked_mul(60_000))
        .and_then(|offset| now_millis().checked_add(offset))
        .ok_or_else(|| CliError::invalid("minutes", format!("{minutes} is too large")))
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("TRACKER_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tracker")
        .join("tracker.db")
}

pub async fn open_service(path: &Path) -> Result<Service, CliError> {
    Ok(ItemService::open_path(path).await?)
}

pub async fn resolve_item(service: &Service, id: &str) -> Result<Item, CliError> {
    let normalized_id = normalize_item_identifier(id)?;
    Ok(service.resolve_item(&normalized_id).await?)
}
