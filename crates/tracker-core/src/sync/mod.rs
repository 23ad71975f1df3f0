//! Delivery of queued mutations to the remote endpoint.

mod client;
mod engine;
mod scheduler;

pub use client::{
    ItemPage, RemoteAction, RemoteClient, RemoteStats, TransmissionError, TransmissionResult,
    UpsertSummary,
};
pub use engine::{FlushOutcome, SkipReason, SyncEngine, BATCH_SIZE};
pub use scheduler::{CycleOutcome, Scheduler, SyncReport, MAX_ITERATIONS};
