//! tracker-core - Core library for Universal Tracker
//!
//! Local-first storage for tracked items, the outbound mutation queue and
//! the engine that delivers queued changes to the spreadsheet web app.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod models;
pub mod search;
pub mod services;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Item, ItemDraft, ItemId, Priority, QueueEntry, Status};
