//! Item export and import file formats.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::Item;

/// Export output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Json,
    Markdown,
}

/// JSON export document; also the accepted import shape.
#[derive(Debug, Serialize)]
struct ExportDocument<'a> {
    items: &'a [Item],
}

#[derive(Debug, Deserialize)]
struct ImportDocument {
    items: Vec<Value>,
}

/// Items read from an import file
#[derive(Debug, Default)]
pub struct ParsedImport {
    pub items: Vec<Item>,
    /// Entries that were not readable as items
    pub skipped: usize,
}

/// Render items as `{"items": [...]}` pretty-printed JSON.
pub fn render_json_export(items: &[Item]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&ExportDocument { items })
}

/// Render items as a Markdown checklist grouped by category.
#[must_use]
pub fn render_markdown_export(items: &[Item]) -> String {
    let mut categories: Vec<&str> = items.iter().map(|item| item.category.as_str()).collect();
    categories.sort_unstable();
    categories.dedup();

    let mut output = String::from("# Universal Tracker\n");
    for category in categories {
        let _ = writeln!(output, "\n## {category}\n");
        for item in items.iter().filter(|item| item.category == category) {
            let mark = if item.is_done() { "x" } else { " " };
            if item.url.is_empty() {
                let _ = writeln!(output, "- [{mark}] {}", item.title);
            } else {
                let _ = writeln!(output, "- [{mark}] [{}]({})", item.title, item.url);
            }

            let mut details = vec![format!("priority: {}", item.priority)];
            if !item.tags.is_empty() {
                details.push(format!("tags: {}", item.tags.join(", ")));
            }
            if let Some(reminder) = item.reminder_time.and_then(DateTime::<Utc>::from_timestamp_millis) {
                details.push(format!("reminder: {}", reminder.format("%Y-%m-%d %H:%M UTC")));
            }
            let _ = writeln!(output, "  - {}", details.join(" | "));

            if !item.notes.trim().is_empty() {
                let _ = writeln!(output, "  - {}", item.notes.trim().replace('\n', " "));
            }
        }
    }

    output
}

/// Render items in the selected format.
pub fn render_items_export(items: &[Item], format: ExportFormat) -> serde_json::Result<String> {
    match format {
        ExportFormat::Json => render_json_export(items),
        ExportFormat::Markdown => Ok(render_markdown_export(items)),
    }
}

/// Parse an export file. The document must be an object with an `items`
/// array; individual entries that are not valid items are skipped.
pub fn parse_import(raw: &str) -> Result<ParsedImport> {
    let document: ImportDocument = serde_json::from_str(raw)
        .map_err(|error| Error::InvalidInput(format!("Invalid import file: {error}")))?;

    let mut parsed = ParsedImport::default();
    for value in document.items {
        match serde_json::from_value::<Item>(value) {
            Ok(item) => parsed.items.push(item),
            Err(error) => {
                tracing::warn!("Skipping unreadable import entry: {error}");
                parsed.skipped += 1;
            }
        }
    }
    Ok(parsed)
}
