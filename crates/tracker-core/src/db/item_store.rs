//! Canonical item store

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use super::key_value::{KeyValueStore, ITEMS_KEY};
use crate::error::Result;
use crate::models::{Item, ItemId};

/// Authoritative list of tracked items, keyed by id.
///
/// Every operation is one read-modify-write of the `items` key, serialized
/// by an internal lock so concurrent callers never interleave partial
/// updates.
pub struct ItemStore<S> {
    kv: Arc<S>,
    lock: Mutex<()>,
}

impl<S: KeyValueStore> ItemStore<S> {
    pub fn new(kv: Arc<S>) -> Self {
        Self {
            kv,
            lock: Mutex::new(()),
        }
    }

    /// All items, in storage order
    pub async fn get_all(&self) -> Result<Vec<Item>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Fetch an item by id
    pub async fn get(&self, id: &ItemId) -> Result<Option<Item>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.into_iter().find(|item| &item.id == id))
    }

    /// Insert or merge an item using last-write-wins on `updated_at`.
    ///
    /// Returns `false` when the stored version is newer and was kept.
    pub async fn upsert(&self, incoming: Item) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;

        let applied = match items.iter_mut().find(|item| item.id == incoming.id) {
            None => {
                items.push(incoming);
                true
            }
            Some(stored) if stored.is_superseded_by(&incoming) => {
                *stored = incoming;
                true
            }
            Some(stored) => {
                tracing::debug!(
                    "Kept stored item {} (updated_at {:?}) over older write ({:?})",
                    stored.id,
                    stored.updated_at,
                    incoming.updated_at
                );
                false
            }
        };

        if applied {
            self.save(&items).await?;
        }
        Ok(applied)
    }

    /// Remove an item; returns whether it existed
    pub async fn remove(&self, id: &ItemId) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut items = self.load().await?;
        let before = items.len();
        items.retain(|item| &item.id != id);

        if items.len() == before {
            return Ok(false);
        }
        self.save(&items).await?;
        Ok(true)
    }

    /// Replace the whole set, collapsing duplicate ids by last-write-wins
    pub async fn replace_all(&self, incoming: Vec<Item>) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let mut items: Vec<Item> = Vec::with_capacity(incoming.len());
        for item in incoming {
            match items.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) if existing.is_superseded_by(&item) => *existing = item,
                Some(_) => {}
                None => items.push(item),
            }
        }

        self.save(&items).await?;
        Ok(items.len())
    }

    async fn load(&self) -> Result<Vec<Item>> {
        match self.kv.get(ITEMS_KEY).await? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => Ok(serde_json::from_value(value)?),
        }
    }

    async fn save(&self, items: &[Item]) -> Result<()> {
        self.kv.set(ITEMS_KEY, serde_json::to_value(items)?).await
    }
}
