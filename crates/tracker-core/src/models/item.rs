//! Tracked item model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::{cell, timestamp};

/// Categories offered by the capture flow. Stored categories are free text;
/// these are the canonical spellings.
pub const CATEGORIES: [&str; 10] = [
    "Movie", "TV", "Trailer", "Video", "Blog", "Podcast", "Book", "Course", "Game", "Other",
];

/// Category used when none is given
pub const DEFAULT_CATEGORY: &str = "Other";

/// Opaque unique identifier for an item.
///
/// New ids are UUID v7 strings; ids coming from the remote sheet are kept
/// verbatim, whatever their shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create a new unique item ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Completion status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Status {
    #[default]
    Todo,
    Done,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::Done => "done",
        }
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "todo" => Ok(Self::Todo),
            "done" => Ok(Self::Done),
            other => Err(format!("unknown status '{other}' (expected todo or done)")),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item priority; unknown values read as `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl From<String> for Priority {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!(
                "unknown priority '{other}' (expected low, medium or high)"
            )),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked piece of content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique identifier, the only merge key
    #[serde(deserialize_with = "cell::text")]
    pub id: ItemId,
    #[serde(default, deserialize_with = "cell::text")]
    pub title: String,
    #[serde(default, deserialize_with = "cell::text")]
    pub url: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default = "default_category", deserialize_with = "cell::text")]
    pub category: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, deserialize_with = "cell::tags")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "cell::text")]
    pub notes: String,
    #[serde(default, deserialize_with = "cell::text")]
    pub source: String,
    /// When to remind the user (Unix ms)
    #[serde(default, with = "timestamp::option_millis")]
    pub reminder_time: Option<i64>,
    /// Creation timestamp (Unix ms), never mutated
    #[serde(default, with = "timestamp::millis")]
    pub added_at: i64,
    /// Last mutation timestamp (Unix ms); missing only on legacy records
    #[serde(default, with = "timestamp::option_millis")]
    pub updated_at: Option<i64>,
    /// Set while status is `done`
    #[serde(default, with = "timestamp::option_millis")]
    pub completed_at: Option<i64>,
    /// Fields this client does not model (enrichment data and the like)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Item {
    /// Create a new todo item with the given title, stamped at `now`
    #[must_use]
    pub fn new(title: impl Into<String>, now: i64) -> Self {
        Self {
            id: ItemId::new(),
            title: title.into(),
            url: String::new(),
            status: Status::Todo,
            category: default_category(),
            priority: Priority::Medium,
            tags: Vec::new(),
            notes: String::new(),
            source: String::new(),
            reminder_time: None,
            added_at: now,
            updated_at: Some(now),
            completed_at: None,
            extra: Map::new(),
        }
    }

    /// Record a mutation at `now`
    pub fn touch(&mut self, now: i64) {
        self.updated_at = Some(now);
    }

    /// Change status, keeping `completed_at` consistent with it
    pub fn set_status(&mut self, status: Status, now: i64) {
        match status {
            Status::Done if self.status != Status::Done || self.completed_at.is_none() => {
                self.completed_at = Some(now);
            }
            Status::Done => {}
            Status::Todo => self.completed_at = None,
        }
        self.status = status;
        self.touch(now);
    }

    /// Complete the item and drop any pending reminder
    pub fn mark_done(&mut self, now: i64) {
        self.set_status(Status::Done, now);
        self.reminder_time = None;
    }

    /// Move the reminder to `until`
    pub fn snooze_until(&mut self, until: i64, now: i64) {
        self.reminder_time = Some(until);
        self.touch(now);
    }

    pub const fn is_done(&self) -> bool {
        matches!(self.status, Status::Done)
    }

    /// Reminder time if it lies strictly after `now`
    pub fn upcoming_reminder(&self, now: i64) -> Option<i64> {
        self.reminder_time.filter(|reminder| *reminder > now)
    }

    /// Whether an incoming version of this item should replace this one.
    ///
    /// Last write wins by `updated_at`; ties go to the incoming write, and a
    /// stored item without a timestamp is always replaced.
    pub fn is_superseded_by(&self, incoming: &Self) -> bool {
        match (self.updated_at, incoming.updated_at) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(stored), Some(incoming)) => stored <= incoming,
        }
    }
}

/// User-supplied fields for a new item
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemDraft {
    pub title: String,
    pub url: Option<String>,
    pub category: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub source: Option<String>,
    pub reminder_time: Option<i64>,
}

impl ItemDraft {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Build a fresh item stamped at `now`
    #[must_use]
    pub fn into_item(self, now: i64) -> Item {
        let mut item = Item::new(self.title.trim(), now);
        item.url = self.url.map(|url| url.trim().to_string()).unwrap_or_default();
        item.category = normalize_category(self.category.as_deref());
        item.priority = self.priority.unwrap_or_default();
        item.tags = self
            .tags
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        item.notes = self.notes.unwrap_or_default();
        item.source = self.source.unwrap_or_default();
        item.reminder_time = self.reminder_time;
        item
    }
}

/// Map a category onto its canonical spelling when it is a known one.
pub fn normalize_category(raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return default_category();
    };
    CATEGORIES
        .iter()
        .find(|known| known.eq_ignore_ascii_case(raw))
        .map_or_else(|| raw.to_string(), |known| (*known).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_item_id_unique() {
        assert_ne!(ItemId::new(), ItemId::new());
    }

    #[test]
    fn test_item_new() {
        let item = Item::new("Dune", 1_000);
        assert_eq!(item.title, "Dune");
        assert_eq!(item.status, Status::Todo);
        assert_eq!(item.category, "Other");
        assert_eq!(item.added_at, 1_000);
        assert_eq!(item.updated_at, Some(1_000));
        assert!(item.completed_at.is_none());
    }

    #[test]
    fn test_set_status_tracks_completed_at() {
        let mut item = Item::new("Dune", 1_000);
        item.set_status(Status::Done, 2_000);
        assert_eq!(item.completed_at, Some(2_000));
        assert_eq!(item.updated_at, Some(2_000));

        item.set_status(Status::Done, 3_000);
        assert_eq!(item.completed_at, Some(2_000));

        item.set_status(Status::Todo, 4_000);
        assert!(item.completed_at.is_none());
        assert_eq!(item.updated_at, Some(4_000));
    }

    #[test]
    fn test_mark_done_clears_reminder() {
        let mut item = Item::new("Dune", 1_000);
        item.reminder_time = Some(5_000);
        item.mark_done(2_000);
        assert!(item.is_done());
        assert!(item.reminder_time.is_none());
    }

    #[test]
    fn test_superseded_by_is_last_write_wins() {
        let mut stored = Item::new("a", 10);
        let mut incoming = stored.clone();

        incoming.updated_at = Some(5);
        assert!(!stored.is_superseded_by(&incoming));

        incoming.updated_at = Some(10);
        assert!(stored.is_superseded_by(&incoming));

        incoming.updated_at = None;
        assert!(!stored.is_superseded_by(&incoming));

        stored.updated_at = None;
        assert!(stored.is_superseded_by(&incoming));
    }

    #[test]
    fn test_deserialize_legacy_record() {
        let item: Item = serde_json::from_value(json!({
            "id": "abc",
            "title": "Old",
            "status": "DONE",
            "priority": "urgent",
            "added_at": "2024-01-01T00:00:00.000Z",
            "updated_at": null,
            "reminder_time": "",
            "genre": "Drama"
        }))
        .unwrap();

        assert_eq!(item.id, ItemId::from("abc"));
        assert_eq!(item.status, Status::Done);
        assert_eq!(item.priority, Priority::Medium);
        assert_eq!(item.category, "Other");
        assert_eq!(item.added_at, 1_704_067_200_000);
        assert_eq!(item.updated_at, None);
        assert_eq!(item.reminder_time, None);
        assert_eq!(item.extra.get("genre"), Some(&json!("Drama")));
    }

    #[test]
    fn test_serialize_keeps_extra_fields_and_millis() {
        let mut item = Item::new("Dune", 1_000);
        item.extra.insert("genre".to_string(), json!("Sci-Fi"));
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["updated_at"], json!(1_000));
        assert_eq!(value["status"], json!("todo"));
        assert_eq!(value["genre"], json!("Sci-Fi"));
        assert_eq!(value["reminder_time"], Value::Null);
    }

    #[test]
    fn test_draft_normalizes_fields() {
        let draft = ItemDraft {
            title: "  Severance ".to_string(),
            category: Some("tv".to_string()),
            tags: vec![" drama ".to_string(), String::new()],
            ..ItemDraft::default()
        };
        let item = draft.into_item(7);
        assert_eq!(item.title, "Severance");
        assert_eq!(item.category, "TV");
        assert_eq!(item.tags, vec!["drama"]);
        assert_eq!(item.added_at, 7);
    }

    #[test]
    fn test_normalize_category_keeps_unknown() {
        assert_eq!(normalize_category(None), "Other");
        assert_eq!(normalize_category(Some("Documentary")), "Documentary");
        assert_eq!(normalize_category(Some("podcast")), "Podcast");
    }
}
