//! Single-flight sync cycles and the periodic trigger

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use super::engine::{FlushOutcome, SkipReason, SyncEngine};
use crate::db::{KeyValueStore, OutboundQueue};
use crate::error::Result;

/// Most batches flushed by one cycle
pub const MAX_ITERATIONS: usize = 5;

/// Totals for a cycle that ran
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub batches: usize,
    pub delivered: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle on this scheduler was in flight; nothing was done
    AlreadyRunning,
    NotConfigured,
    Completed(SyncReport),
}

/// Clears the running flag when dropped
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs sync cycles with at most one in flight per scheduler.
pub struct Scheduler<S> {
    engine: SyncEngine<S>,
    running: AtomicBool,
}

impl<S: KeyValueStore> Scheduler<S> {
    pub const fn new(engine: SyncEngine<S>) -> Self {
        Self {
            engine,
            running: AtomicBool::new(false),
        }
    }

    pub fn queue(&self) -> &OutboundQueue<S> {
        self.engine.queue()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Flush batches until the queue is empty or the iteration cap is hit.
    ///
    /// Returns the first transmission or storage error; the failed batch is
    /// already back in the queue by then.
    pub async fn run_sync_cycle(&self) -> Result<CycleOutcome> {
        let Some(_guard) = RunningGuard::acquire(&self.running) else {
            tracing::debug!("Sync cycle already running, skipping");
            return Ok(CycleOutcome::AlreadyRunning);
        };

        if !self.engine.is_configured().await? {
            tracing::debug!("Skipping sync cycle: no remote endpoint configured");
            return Ok(CycleOutcome::NotConfigured);
        }

        let mut report = SyncReport::default();
        for _ in 0..MAX_ITERATIONS {
            if self.queue().size().await? == 0 {
                break;
            }

            match self.engine.flush_once().await? {
                FlushOutcome::Skipped(SkipReason::NotConfigured) => {
                    return Ok(CycleOutcome::NotConfigured);
                }
                FlushOutcome::Skipped(SkipReason::EmptyQueue) => break,
                outcome => {
                    report.batches += 1;
                    report.delivered += outcome.delivered();
                }
            }
        }

        report.remaining = self.queue().size().await?;
        if report.batches > 0 {
            tracing::info!(
                "Sync cycle delivered {} entries in {} batches ({} remaining)",
                report.delivered,
                report.batches,
                report.remaining
            );
        }
        Ok(CycleOutcome::Completed(report))
    }

    /// Run a cycle every `interval` until `shutdown` resolves.
    ///
    /// The first cycle fires one full interval after the call. Ticks missed
    /// while a cycle is still running are skipped. Returns how many cycles
    /// were triggered.
    pub async fn run_periodic<F>(&self, interval: Duration, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut cycles = 0;
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => {
                    cycles += 1;
                    match self.run_sync_cycle().await {
                        Ok(outcome) => tracing::debug!("Periodic sync finished: {outcome:?}"),
                        Err(error) => tracing::warn!("Periodic sync failed: {error}"),
                    }
                }
            }
        }

        tracing::debug!("Periodic sync stopped after {cycles} cycles");
        cycles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncOptions;
    use crate::db::MemoryStore;
    use crate::models::{Item, QueueEntry};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn scheduler_for(url: Option<String>) -> Scheduler<MemoryStore> {
        let kv = Arc::new(MemoryStore::new());
        SyncOptions {
            apps_script_url: url,
            ..SyncOptions::default()
        }
        .save(kv.as_ref())
        .await
        .unwrap();
        let queue = Arc::new(OutboundQueue::new(Arc::clone(&kv)));
        Scheduler::new(SyncEngine::new(kv, queue))
    }

    fn upsert(id: usize) -> QueueEntry {
        let mut item = Item::new(format!("Item {id}"), 1);
        item.id = id.to_string().into();
        QueueEntry::upsert(item)
    }

    async fn fill(scheduler: &Scheduler<MemoryStore>, count: usize) {
        for id in 0..count {
            scheduler.queue().enqueue(upsert(id)).await.unwrap();
        }
    }

    async fn accepting_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(query_param("action", "bulkUpsert"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "upserted": 1 })))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn cycle_drains_more_than_one_batch() {
        let server = accepting_server().await;
        let scheduler = scheduler_for(Some(server.uri())).await;
        fill(&scheduler, 120).await;

        let outcome = scheduler.run_sync_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Completed(SyncReport {
                batches: 2,
                delivered: 120,
                remaining: 0
            })
        );
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cycle_stops_at_iteration_cap() {
        let server = accepting_server().await;
        let scheduler = scheduler_for(Some(server.uri())).await;
        fill(&scheduler, 560).await;

        let outcome = scheduler.run_sync_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Completed(SyncReport {
                batches: MAX_ITERATIONS,
                delivered: 500,
                remaining: 60
            })
        );
    }

    #[tokio::test]
    async fn cycle_without_endpoint_leaves_queue() {
        let scheduler = scheduler_for(None).await;
        fill(&scheduler, 3).await;

        assert_eq!(
            scheduler.run_sync_cycle().await.unwrap(),
            CycleOutcome::NotConfigured
        );
        assert_eq!(scheduler.queue().size().await.unwrap(), 3);
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn cycle_without_endpoint_and_empty_queue_is_not_configured() {
        let scheduler = scheduler_for(None).await;

        assert_eq!(
            scheduler.run_sync_cycle().await.unwrap(),
            CycleOutcome::NotConfigured
        );
    }

    #[tokio::test]
    async fn cycle_with_endpoint_and_empty_queue_completes_empty() {
        let server = accepting_server().await;
        let scheduler = scheduler_for(Some(server.uri())).await;

        assert_eq!(
            scheduler.run_sync_cycle().await.unwrap(),
            CycleOutcome::Completed(SyncReport::default())
        );
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_cycle_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "upserted": 1 }))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;
        let scheduler = scheduler_for(Some(server.uri())).await;
        fill(&scheduler, 1).await;

        let (first, second) = tokio::join!(scheduler.run_sync_cycle(), scheduler.run_sync_cycle());
        let outcomes = [first.unwrap(), second.unwrap()];

        assert!(outcomes.contains(&CycleOutcome::AlreadyRunning));
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn failure_releases_running_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let scheduler = scheduler_for(Some(server.uri())).await;
        fill(&scheduler, 2).await;

        assert!(scheduler.run_sync_cycle().await.is_err());
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.queue().size().await.unwrap(), 2);

        // A second attempt really runs instead of reporting AlreadyRunning
        assert!(scheduler.run_sync_cycle().await.is_err());
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_cycle_keeps_batch_and_releases_flag() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        let scheduler = scheduler_for(Some(server.uri())).await;
        fill(&scheduler, 1).await;

        let cancelled =
            tokio::time::timeout(Duration::from_millis(50), scheduler.run_sync_cycle()).await;
        assert!(cancelled.is_err());
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.queue().size().await.unwrap(), 1);
        assert_eq!(
            scheduler.queue().peek_all().await.unwrap()[0].item_id(),
            Some("0")
        );
    }

    #[tokio::test]
    async fn entries_added_during_failed_flush_stay_behind_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_delay(Duration::from_millis(200)))
            .mount(&server)
            .await;
        let scheduler = scheduler_for(Some(server.uri())).await;
        fill(&scheduler, 2).await;

        let (result, ()) = tokio::join!(scheduler.run_sync_cycle(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            scheduler.queue().enqueue(upsert(99)).await.unwrap();
        });
        assert!(result.is_err());

        let ids: Vec<String> = scheduler
            .queue()
            .peek_all()
            .await
            .unwrap()
            .iter()
            .filter_map(|entry| entry.item_id().map(ToString::to_string))
            .collect();
        assert_eq!(ids, vec!["0", "1", "99"]);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_waits_one_interval_before_first_cycle() {
        let scheduler = scheduler_for(None).await;
        let interval = Duration::from_secs(10 * 60);

        let cycles = scheduler
            .run_periodic(interval, tokio::time::sleep(Duration::from_secs(9 * 60)))
            .await;
        assert_eq!(cycles, 0);

        let cycles = scheduler
            .run_periodic(interval, tokio::time::sleep(Duration::from_secs(25 * 60)))
            .await;
        assert_eq!(cycles, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_keeps_going_after_errors() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(crate::db::OPTIONS_KEY, json!("not an object"))
            .await
            .unwrap();
        let queue = Arc::new(OutboundQueue::new(Arc::clone(&kv)));
        let scheduler = Scheduler::new(SyncEngine::new(kv, queue));
        scheduler.queue().enqueue(upsert(1)).await.unwrap();

        let cycles = scheduler
            .run_periodic(
                Duration::from_secs(5 * 60),
                tokio::time::sleep(Duration::from_secs(16 * 60)),
            )
            .await;
        assert_eq!(cycles, 3);
        assert_eq!(scheduler.queue().size().await.unwrap(), 1);
    }
}
