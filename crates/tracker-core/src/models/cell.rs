//! Serde helpers for fields that arrive as spreadsheet cells.
//!
//! The remote sheet hands back numeric-looking cells as JSON numbers and
//! checkboxes as booleans, so a film titled "1917" comes back as `1917`.
//! Text fields accept any scalar and keep its textual form.

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

use crate::util::split_tags;

fn scalar_text(value: Value) -> Result<String, String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(format!("expected text, got {other}")),
    }
}

/// Text field; numbers and booleans are stringified, `null` reads as empty
pub fn text<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    scalar_text(Value::deserialize(deserializer)?)
        .map(T::from)
        .map_err(de::Error::custom)
}

/// Tag list, either an array of scalars or one comma-separated cell
pub fn tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Array(values) => values
            .into_iter()
            .map(scalar_text)
            .filter(|tag| !matches!(tag, Ok(tag) if tag.trim().is_empty()))
            .collect::<Result<_, _>>()
            .map_err(de::Error::custom),
        other => scalar_text(other)
            .map(|raw| split_tags(&raw))
            .map_err(de::Error::custom),
    }
}
