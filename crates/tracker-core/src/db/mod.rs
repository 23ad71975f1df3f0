//! Persistence layer for Universal Tracker

mod connection;
mod item_store;
mod key_value;
mod migrations;
mod outbox;

pub use connection::Database;
pub use item_store::ItemStore;
pub use key_value::{KeyValueStore, MemoryStore, ITEMS_KEY, OPTIONS_KEY, QUEUE_KEY};
pub use outbox::{Lease, OutboundQueue};
