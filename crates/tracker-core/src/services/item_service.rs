//! Item operations shared by every client.
//!
//! Each local mutation writes the canonical store first and then enqueues
//! the resulting state for delivery, so the store always reflects user
//! intent even while the remote is unreachable.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::config::SyncOptions;
use crate::db::{Database, ItemStore, KeyValueStore, OutboundQueue};
use crate::error::{Error, Result};
use crate::export::{self, ExportFormat};
use crate::models::{Item, ItemDraft, ItemId, QueueEntry, Status};
use crate::search::{ItemFilter, ItemSort};
use crate::sync::{CycleOutcome, RemoteClient, RemoteStats, Scheduler, SyncEngine};
use crate::util::{normalize_text_option, now_millis};

/// Page size for `getItems`
pub const PULL_PAGE_SIZE: usize = 1000;
/// Most pages fetched by one pull
pub const PULL_MAX_PAGES: usize = 10;
/// Snooze length when none is given
pub const DEFAULT_SNOOZE: Duration = Duration::from_secs(60 * 60);

/// Metadata suggested by an enrichment provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub genre: Option<String>,
    pub streaming_availability: Option<String>,
}

/// Result of importing an export file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Entries written to the store
    pub applied: usize,
    /// Entries ignored because the stored copy was newer
    pub kept_existing: usize,
    /// Entries that could not be read as items
    pub skipped: usize,
}

pub struct ItemService<S> {
    kv: Arc<S>,
    items: ItemStore<S>,
    scheduler: Scheduler<S>,
}

impl ItemService<Database> {
    /// Open a service backed by a database file, creating parent directories.
    pub async fn open_path(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(db_path).await?;
        Ok(Self::new(Arc::new(db)))
    }

    /// Open an in-memory service (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Arc::new(Database::open_in_memory().await?)))
    }
}

impl<S: KeyValueStore> ItemService<S> {
    pub fn new(kv: Arc<S>) -> Self {
        let queue = Arc::new(OutboundQueue::new(Arc::clone(&kv)));
        let engine = SyncEngine::new(Arc::clone(&kv), queue);
        Self {
            items: ItemStore::new(Arc::clone(&kv)),
            scheduler: Scheduler::new(engine),
            kv,
        }
    }

    pub const fn scheduler(&self) -> &Scheduler<S> {
        &self.scheduler
    }

    pub fn queue(&self) -> &OutboundQueue<S> {
        self.scheduler.queue()
    }

    pub async fn load_options(&self) -> Result<SyncOptions> {
        SyncOptions::load(self.kv.as_ref()).await
    }

    pub async fn save_options(&self, options: &SyncOptions) -> Result<()> {
        options.save(self.kv.as_ref()).await
    }

    /// Create an item from user input.
    pub async fn add_item(&self, draft: ItemDraft) -> Result<Item> {
        if draft.title.trim().is_empty() {
            return Err(Error::InvalidInput("Item title cannot be empty".to_string()));
        }
        let item = draft.into_item(now_millis());
        self.commit(item).await
    }

    /// Store an edited item, stamping it as the newest version.
    pub async fn save_item(&self, mut item: Item) -> Result<Item> {
        if item.title.trim().is_empty() {
            return Err(Error::InvalidInput("Item title cannot be empty".to_string()));
        }
        let stored = self.items.get(&item.id).await?;
        item.touch(write_stamp(stored.as_ref()));
        self.commit(item).await
    }

    /// Queue a remote delete, then drop the local copy.
    pub async fn delete_item(&self, id: &ItemId) -> Result<()> {
        if self.items.get(id).await?.is_none() {
            return Err(Error::NotFound(id.to_string()));
        }
        self.queue().enqueue(QueueEntry::delete(id.clone())).await?;
        self.items.remove(id).await?;
        tracing::debug!("Deleted item {id}");
        Ok(())
    }

    pub async fn set_status(&self, id: &ItemId, status: Status) -> Result<Item> {
        self.modify(id, |item, now| item.set_status(status, now))
            .await
    }

    /// Complete an item and clear its reminder.
    pub async fn mark_done(&self, id: &ItemId) -> Result<Item> {
        self.modify(id, Item::mark_done).await
    }

    /// Push the reminder `duration` into the future.
    pub async fn snooze_reminder(&self, id: &ItemId, duration: Option<Duration>) -> Result<Item> {
        let duration = duration.unwrap_or(DEFAULT_SNOOZE);
        let until = i64::try_from(duration.as_millis())
            .ok()
            .and_then(|millis| now_millis().checked_add(millis))
            .ok_or_else(|| Error::InvalidInput("Snooze duration is too long".to_string()))?;
        self.modify(id, move |item, stamp| item.snooze_until(until, stamp))
            .await
    }

    /// Merge non-empty enrichment fields into the item.
    pub async fn apply_enrichment(&self, id: &ItemId, enrichment: Enrichment) -> Result<Item> {
        let fields = [
            ("genre", enrichment.genre),
            ("streaming_availability", enrichment.streaming_availability),
        ];
        self.modify(id, move |item, now| {
            for (key, value) in fields {
                if let Some(value) = normalize_text_option(value) {
                    item.extra.insert(key.to_string(), Value::String(value));
                }
            }
            item.touch(now);
        })
        .await
    }

    pub async fn list_items(&self, filter: &ItemFilter, sort: ItemSort) -> Result<Vec<Item>> {
        let mut items = filter.apply(self.items.get_all().await?);
        sort.sort(&mut items);
        Ok(items)
    }

    pub async fn get_item(&self, id: &ItemId) -> Result<Option<Item>> {
        self.items.get(id).await
    }

    /// Find an item by full id or unique id prefix.
    pub async fn resolve_item(&self, id_or_prefix: &str) -> Result<Item> {
        let needle = id_or_prefix.trim();
        if needle.is_empty() {
            return Err(Error::InvalidInput("Item id cannot be empty".to_string()));
        }

        let items = self.items.get_all().await?;
        if let Some(item) = items.iter().find(|item| item.id.as_str() == needle) {
            return Ok(item.clone());
        }

        let mut matches = items
            .into_iter()
            .filter(|item| item.id.as_str().starts_with(needle));
        match (matches.next(), matches.next()) {
            (Some(item), None) => Ok(item),
            (Some(_), Some(_)) => Err(Error::InvalidInput(format!(
                "Ambiguous id prefix '{needle}'"
            ))),
            (None, _) => Err(Error::NotFound(needle.to_string())),
        }
    }

    /// Items whose reminder is still ahead of `now`, soonest first.
    pub async fn upcoming_reminders(&self, now: i64) -> Result<Vec<Item>> {
        let mut items: Vec<Item> = self
            .items
            .get_all()
            .await?
            .into_iter()
            .filter(|item| item.upcoming_reminder(now).is_some())
            .collect();
        items.sort_by_key(|item| item.reminder_time);
        Ok(items)
    }

    /// Run one sync cycle now.
    pub async fn sync_now(&self) -> Result<CycleOutcome> {
        self.scheduler.run_sync_cycle().await
    }

    /// Replace the local store with every item on the remote.
    pub async fn pull_all(&self) -> Result<usize> {
        let client = self.remote_client().await?;
        let mut pulled = Vec::new();
        for index in 0..PULL_MAX_PAGES {
            let page = client
                .get_items_page(PULL_PAGE_SIZE, index * PULL_PAGE_SIZE)
                .await?;
            let short_page = page.rows < PULL_PAGE_SIZE;
            pulled.extend(page.items);
            if short_page {
                break;
            }
        }

        let count = self.items.replace_all(pulled).await?;
        tracing::info!("Pulled {count} items from remote");
        Ok(count)
    }

    pub async fn remote_stats(&self) -> Result<RemoteStats> {
        Ok(self.remote_client().await?.get_stats().await?)
    }

    /// Ask the remote to archive old rows; returns its message.
    pub async fn trigger_archive(&self) -> Result<String> {
        Ok(self.remote_client().await?.trigger_archive().await?)
    }

    /// Merge items from an export file into the local store. Imported items
    /// are not queued for delivery.
    pub async fn import_items(&self, raw: &str) -> Result<ImportSummary> {
        let parsed = export::parse_import(raw)?;
        let mut summary = ImportSummary {
            skipped: parsed.skipped,
            ..ImportSummary::default()
        };
        for item in parsed.items {
            if self.items.upsert(item).await? {
                summary.applied += 1;
            } else {
                summary.kept_existing += 1;
            }
        }
        Ok(summary)
    }

    /// Render every item in the given export format.
    pub async fn export_items(&self, format: ExportFormat) -> Result<String> {
        let mut items = self.items.get_all().await?;
        ItemSort::CreatedAsc.sort(&mut items);
        Ok(export::render_items_export(&items, format)?)
    }

    async fn remote_client(&self) -> Result<RemoteClient> {
        let options = self.load_options().await?;
        RemoteClient::from_options(&options)?.ok_or(Error::NotConfigured)
    }

    async fn modify<F>(&self, id: &ItemId, change: F) -> Result<Item>
    where
        F: FnOnce(&mut Item, i64),
    {
        let mut item = self
            .items
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let stamp = write_stamp(Some(&item));
        change(&mut item, stamp);
        self.commit(item).await
    }

    /// Store the item, then queue it. Nothing is queued if the store kept a
    /// newer copy.
    async fn commit(&self, item: Item) -> Result<Item> {
        if !self.items.upsert(item.clone()).await? {
            return Err(Error::Conflict(item.id.to_string()));
        }
        self.queue().enqueue(QueueEntry::upsert(item.clone())).await?;
        Ok(item)
    }
}

/// `updated_at` for a local write over `stored`. Normally the wall clock,
/// but always past the stored stamp so a copy written by a device whose
/// clock runs ahead cannot shadow the edit.
fn write_stamp(stored: Option<&Item>) -> i64 {
    let now = now_millis();
    stored
        .and_then(|item| item.updated_at)
        .map_or(now, |updated_at| now.max(updated_at.saturating_add(1)))
}
