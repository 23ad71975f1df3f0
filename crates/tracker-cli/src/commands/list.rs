use std::path::Path;

use tracker_core::search::ItemFilter;
use tracker_core::util::now_millis;

use crate::commands::common::{
    format_item_details, format_item_lines, format_timestamp, item_to_list_item, open_service,
    parse_priority, parse_sort, parse_status, resolve_item, ItemListItem,
};
use crate::error::CliError;

/// Flags accepted by `tracker list`
#[derive(Debug, Default)]
pub struct ListArgs {
    pub status: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
    pub tags: Vec<String>,
    pub sort: String,
    pub limit: Option<usize>,
    pub json: bool,
}

pub fn build_filter(args: &ListArgs) -> Result<ItemFilter, CliError> {
    Ok(ItemFilter {
        status: parse_status(args.status.as_deref())?,
        category: args.category.clone(),
        priority: parse_priority(args.priority.as_deref())?,
        search: args.search.clone(),
        tags: args.tags.clone(),
    })
}

pub async fn run_list(args: ListArgs, db_path: &Path) -> Result<(), CliError> {
    let filter = build_filter(&args)?;
    let sort = parse_sort(&args.sort)?;

    let service = open_service(db_path).await?;
    let mut items = service.list_items(&filter, sort).await?;
    if let Some(limit) = args.limit {
        items.truncate(limit);
    }

    let now = now_millis();
    if args.json {
        let json_items = items
            .iter()
            .map(|item| item_to_list_item(item, now))
            .collect::<Vec<ItemListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if items.is_empty() {
        println!("No items found.");
    } else {
        for line in format_item_lines(&items, now) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_show(id: &str, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let item = resolve_item(&service, id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        for line in format_item_details(&item) {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn run_reminders(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let service = open_service(db_path).await?;
    let now = now_millis();
    let items = service.upcoming_reminders(now).await?;

    if as_json {
        let json_items = items
            .iter()
            .map(|item| item_to_list_item(item, now))
            .collect::<Vec<ItemListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No pending reminders.");
        return Ok(());
    }

    for item in &items {
        let id_prefix: String = item.id.as_str().chars().take(8).collect();
        let when = item.reminder_time.map(format_timestamp).unwrap_or_default();
        println!("{id_prefix} {when} {}", item.title);
    }
    Ok(())
}
