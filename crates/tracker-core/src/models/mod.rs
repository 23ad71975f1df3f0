//! Data models for Universal Tracker

mod cell;
mod item;
mod queue_entry;
pub mod timestamp;

pub use item::{
    normalize_category, Item, ItemDraft, ItemId, Priority, Status, CATEGORIES, DEFAULT_CATEGORY,
};
pub use queue_entry::QueueEntry;
