//! Batch flush of the outbound queue

use std::sync::Arc;

use serde_json::Value;

use super::client::{RemoteClient, UpsertSummary};
use crate::config::SyncOptions;
use crate::db::{KeyValueStore, OutboundQueue};
use crate::error::Result;
use crate::models::{ItemId, QueueEntry};

/// Most entries sent per flush
pub const BATCH_SIZE: usize = 100;

/// Why a flush sent nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotConfigured,
    EmptyQueue,
}

/// Result of one successful flush
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Skipped(SkipReason),
    Delivered {
        deletes: usize,
        upserts: usize,
        summary: Option<UpsertSummary>,
    },
}

impl FlushOutcome {
    /// Entries acknowledged by the remote
    pub const fn delivered(&self) -> usize {
        match self {
            Self::Skipped(_) => 0,
            Self::Delivered {
                deletes, upserts, ..
            } => *deletes + *upserts,
        }
    }
}

/// A batch split by operation
#[derive(Debug, Default, PartialEq)]
struct Partition {
    deletes: Vec<ItemId>,
    upserts: Vec<Value>,
    dropped: usize,
}

fn partition(batch: &[QueueEntry]) -> Partition {
    let mut partition = Partition::default();
    for entry in batch {
        match entry {
            QueueEntry::Delete { id } => partition.deletes.push(id.clone()),
            entry if entry.is_malformed_delete() => partition.dropped += 1,
            entry => partition.upserts.push(entry.to_upsert_payload()),
        }
    }
    partition
}

/// Drains the outbound queue to the remote endpoint one batch at a time.
///
/// A batch is all-or-nothing: if any request fails, or the flush is dropped
/// before the remote answers, every entry taken for it goes back to the head
/// of the queue in its original order.
pub struct SyncEngine<S> {
    kv: Arc<S>,
    queue: Arc<OutboundQueue<S>>,
    batch_size: usize,
}

impl<S: KeyValueStore> SyncEngine<S> {
    pub const fn new(kv: Arc<S>, queue: Arc<OutboundQueue<S>>) -> Self {
        Self {
            kv,
            queue,
            batch_size: BATCH_SIZE,
        }
    }

    pub fn queue(&self) -> &OutboundQueue<S> {
        &self.queue
    }

    /// Whether a remote endpoint is configured right now
    pub async fn is_configured(&self) -> Result<bool> {
        Ok(SyncOptions::load(self.kv.as_ref()).await?.is_configured())
    }

    /// Send at most one batch and reconcile the queue
    pub async fn flush_once(&self) -> Result<FlushOutcome> {
        let options = SyncOptions::load(self.kv.as_ref()).await?;
        let Some(client) = RemoteClient::from_options(&options)? else {
            tracing::debug!("Skipping flush: no remote endpoint configured");
            return Ok(FlushOutcome::Skipped(SkipReason::NotConfigured));
        };

        let batch = self.queue.lease_batch(self.batch_size).await?;
        if batch.is_empty() {
            return Ok(FlushOutcome::Skipped(SkipReason::EmptyQueue));
        }

        let result = self.transmit(&client, batch.entries()).await;
        match result {
            Ok(outcome) => {
                batch.commit();
                Ok(outcome)
            }
            Err(error) => {
                tracing::warn!(
                    "Flush of {} entries failed, requeueing: {error}",
                    batch.len()
                );
                batch.release().await?;
                Err(error)
            }
        }
    }

    async fn transmit(&self, client: &RemoteClient, batch: &[QueueEntry]) -> Result<FlushOutcome> {
        let Partition {
            deletes,
            upserts,
            dropped,
        } = partition(batch);

        if dropped > 0 {
            tracing::warn!("Dropping {dropped} delete entries without an id");
        }

        if !deletes.is_empty() {
            client.bulk_delete(&deletes).await?;
            tracing::debug!("Remote deleted {} items", deletes.len());
        }

        let mut summary = None;
        if !upserts.is_empty() {
            let counts = client.bulk_upsert(&upserts).await?;
            tracing::info!(
                "Upserted {} items (updated {:?}, inserted {:?})",
                counts.upserted.unwrap_or(upserts.len() as u64),
                counts.updated,
                counts.inserted
            );
            summary = Some(counts);
        }

        Ok(FlushOutcome::Delivered {
            deletes: deletes.len(),
            upserts: upserts.len(),
            summary,
        })
    }
}
