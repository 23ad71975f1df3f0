use std::path::Path;

use tracker_core::util::split_tags;
use tracker_core::ItemDraft;

use crate::commands::common::{minutes_from_now, open_service, parse_priority};
use crate::error::CliError;

/// Flags accepted by `tracker add`
#[derive(Debug, Default)]
pub struct AddArgs {
    pub title: Vec<String>,
    pub url: Option<String>,
    pub category: Option<String>,
    pub priority: Option<String>,
    pub tags: Option<String>,
    pub notes: Option<String>,
    pub source: Option<String>,
    pub reminder_in_mins: Option<u64>,
}

pub fn build_draft(args: AddArgs) -> Result<ItemDraft, CliError> {
    let mut draft = ItemDraft::new(args.title.join(" "));
    draft.url = args.url;
    draft.category = args.category;
    draft.priority = parse_priority(args.priority.as_deref())?;
    draft.tags = args.tags.as_deref().map(split_tags).unwrap_or_default();
    draft.notes = args.notes;
    draft.source = args.source;
    draft.reminder_time = args.reminder_in_mins.map(minutes_from_now).transpose()?;
    Ok(draft)
}

pub async fn run_add(args: AddArgs, db_path: &Path) -> Result<(), CliError> {
    let draft = build_draft(args)?;
    let service = open_service(db_path).await?;
    let item = service.add_item(draft).await?;

    println!("{}", item.id);
    Ok(())
}
