//! Outbound queue entry model

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Item, ItemId};

const DELETE_OP: &str = "delete";

/// A pending mutation awaiting transmission.
///
/// On the wire and in storage an upsert is the bare item payload and a
/// delete is a tombstone of shape `{"op": "delete", "id": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum QueueEntry {
    /// Upsert this full item state
    Upsert(Box<Item>),
    /// Delete the item with this id
    Delete { id: ItemId },
    /// A persisted entry that is neither a tombstone nor a readable item.
    /// It is still transmitted as an upsert payload.
    Raw(Value),
}

impl QueueEntry {
    pub fn upsert(item: Item) -> Self {
        Self::Upsert(Box::new(item))
    }

    pub const fn delete(id: ItemId) -> Self {
        Self::Delete { id }
    }

    /// Id of the item this entry refers to, when known
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Self::Upsert(item) => Some(item.id.as_str()),
            Self::Delete { id } => Some(id.as_str()),
            Self::Raw(value) => value.get("id").and_then(Value::as_str),
        }
    }

    pub const fn is_delete(&self) -> bool {
        matches!(self, Self::Delete { .. })
    }

    /// Raw entries carrying `op: "delete"` without a usable id. These are
    /// neither deletes nor upserts and get dropped at partition time.
    pub fn is_malformed_delete(&self) -> bool {
        match self {
            Self::Raw(value) => value.get("op").and_then(Value::as_str) == Some(DELETE_OP),
            _ => false,
        }
    }

    /// Payload sent to the bulk-upsert endpoint
    pub fn to_upsert_payload(&self) -> Value {
        match self {
            Self::Upsert(item) => serde_json::to_value(item.as_ref()).unwrap_or(Value::Null),
            Self::Delete { .. } | Self::Raw(_) => Value::from(self.clone()),
        }
    }
}

impl From<Value> for QueueEntry {
    fn from(value: Value) -> Self {
        if value.get("op").and_then(Value::as_str) == Some(DELETE_OP) {
            return match value.get("id").and_then(Value::as_str) {
                Some(id) if !id.is_empty() => Self::Delete { id: id.into() },
                _ => Self::Raw(value),
            };
        }

        match serde_json::from_value::<Item>(value.clone()) {
            Ok(item) => Self::Upsert(Box::new(item)),
            Err(_) => Self::Raw(value),
        }
    }
}

impl From<QueueEntry> for Value {
    fn from(entry: QueueEntry) -> Self {
        match entry {
            QueueEntry::Upsert(item) => serde_json::to_value(*item).unwrap_or(Self::Null),
            QueueEntry::Delete { id } => json!({ "op": DELETE_OP, "id": id }),
            QueueEntry::Raw(value) => value,
        }
    }
}
