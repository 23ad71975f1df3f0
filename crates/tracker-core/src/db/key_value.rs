//! Key-value persistence seam shared by the item store, outbox and options.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::error::{Error, Result};

/// Key holding the canonical item list
pub const ITEMS_KEY: &str = "items";
/// Key holding the outbound mutation queue
pub const QUEUE_KEY: &str = "outbox";
/// Key holding sync options
pub const OPTIONS_KEY: &str = "options";

/// Durable JSON key-value storage (async)
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    /// Read the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Replace the value stored under `key`
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// In-process store. Nothing survives the process; useful for embedding and
/// tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let values = self
            .values
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".to_string()))?;
        Ok(values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| Error::Storage("memory store lock poisoned".to_string()))?;
        values.insert(key.to_string(), value);
        Ok(())
    }
}
