//! Outbound mutation queue

use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use serde_json::Value;
use tokio::sync::Mutex;

use super::key_value::{KeyValueStore, QUEUE_KEY};
use crate::error::Result;
use crate::models::QueueEntry;

/// FIFO of mutations waiting to be sent to the remote endpoint.
///
/// All operations hold one lock for their whole read-modify-write, so a
/// `take_batch` can never hand the same entry to two callers.
pub struct OutboundQueue<S> {
    kv: Arc<S>,
    lock: Mutex<()>,
    /// Entries from leases dropped without being settled, head first
    stranded: StdMutex<Vec<QueueEntry>>,
}

/// A batch taken from the head of the queue that has not been settled yet.
///
/// [`Lease::commit`] consumes the entries for good and [`Lease::release`]
/// puts them back at the head. A lease dropped in any other way (the flush
/// future was cancelled mid-request, say) parks its entries and the next
/// queue operation restores them to the head.
pub struct Lease<'a, S> {
    queue: &'a OutboundQueue<S>,
    entries: Vec<QueueEntry>,
}

impl<S> Lease<'_, S> {
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entries were delivered; drop them
    pub fn commit(mut self) -> usize {
        let delivered = self.entries.len();
        self.entries.clear();
        delivered
    }
}

impl<S: KeyValueStore> Lease<'_, S> {
    /// Put the entries back at the head of the queue
    pub async fn release(mut self) -> Result<()> {
        self.queue.requeue_front(self.entries.clone()).await?;
        self.entries.clear();
        Ok(())
    }
}

impl<S> Drop for Lease<'_, S> {
    fn drop(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        tracing::warn!(
            "Unsettled batch of {} entries dropped, returning it to the queue",
            self.entries.len()
        );
        self.queue.park(std::mem::take(&mut self.entries));
    }
}

impl<S> OutboundQueue<S> {
    fn park(&self, entries: Vec<QueueEntry>) {
        let mut stranded = self.stranded.lock().unwrap_or_else(PoisonError::into_inner);
        let later = std::mem::replace(&mut *stranded, entries);
        stranded.extend(later);
    }

    fn take_stranded(&self) -> Vec<QueueEntry> {
        std::mem::take(&mut *self.stranded.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl<S: KeyValueStore> OutboundQueue<S> {
    pub fn new(kv: Arc<S>) -> Self {
        Self {
            kv,
            lock: Mutex::new(()),
            stranded: StdMutex::new(Vec::new()),
        }
    }

    /// Append an entry to the tail
    pub async fn enqueue(&self, entry: QueueEntry) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut queue = self.load().await?;
        queue.push(entry);
        self.save(&queue).await
    }

    /// Remove and return up to `n` entries from the head
    pub async fn take_batch(&self, n: usize) -> Result<Vec<QueueEntry>> {
        let _guard = self.lock.lock().await;
        let mut queue = self.load().await?;
        if queue.is_empty() || n == 0 {
            return Ok(Vec::new());
        }

        let batch: Vec<QueueEntry> = queue.drain(..n.min(queue.len())).collect();
        self.save(&queue).await?;
        Ok(batch)
    }

    /// Take up to `n` head entries under a [`Lease`] that returns them to
    /// the queue unless committed
    pub async fn lease_batch(&self, n: usize) -> Result<Lease<'_, S>> {
        let entries = self.take_batch(n).await?;
        Ok(Lease {
            queue: self,
            entries,
        })
    }

    /// Put entries back at the head, ahead of anything enqueued since
    pub async fn requeue_front(&self, entries: Vec<QueueEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let _guard = self.lock.lock().await;
        let queue = self.load().await?;
        let mut restored = entries;
        restored.extend(queue);
        self.save(&restored).await
    }

    /// Number of pending entries
    pub async fn size(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.len())
    }

    /// Snapshot of the pending entries, head first
    pub async fn peek_all(&self) -> Result<Vec<QueueEntry>> {
        let _guard = self.lock.lock().await;
        self.load().await
    }

    /// Drop every pending entry; returns how many were discarded
    pub async fn clear(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let dropped = self.load().await?.len();
        self.save(&[]).await?;
        Ok(dropped)
    }

    /// Read the stored queue, first restoring any parked entries to its head
    async fn load(&self) -> Result<Vec<QueueEntry>> {
        let queue: Vec<QueueEntry> = match self.kv.get(QUEUE_KEY).await? {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value)?,
        };

        let mut restored = self.take_stranded();
        if restored.is_empty() {
            return Ok(queue);
        }

        let count = restored.len();
        restored.extend(queue);
        if let Err(error) = self.save(&restored).await {
            self.park(restored.drain(..count).collect());
            return Err(error);
        }
        tracing::debug!("Restored {count} entries from an interrupted flush");
        Ok(restored)
    }

    async fn save(&self, queue: &[QueueEntry]) -> Result<()> {
        self.kv.set(QUEUE_KEY, serde_json::to_value(queue)?).await
    }
}
