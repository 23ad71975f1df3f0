//! Service layer shared by clients.

mod item_service;

pub use item_service::{
    Enrichment, ImportSummary, ItemService, DEFAULT_SNOOZE, PULL_MAX_PAGES, PULL_PAGE_SIZE,
};
