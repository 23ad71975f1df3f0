//! Serde helpers for epoch-millisecond timestamps.
//!
//! Timestamps are always written as integer Unix milliseconds. On input we
//! also accept RFC 3339 strings (what older clients and the remote sheet
//! store) and numeric strings, and convert them to milliseconds.

use serde::{de, Deserialize, Deserializer, Serializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Float(f64),
    Text(String),
}

impl RawTimestamp {
    #[allow(clippy::cast_possible_truncation)]
    fn into_millis(self) -> Result<Option<i64>, String> {
        match self {
            Self::Millis(value) => Ok(Some(value)),
            Self::Float(value) if value.is_finite() => Ok(Some(value as i64)),
            Self::Float(value) => Err(format!("invalid timestamp {value}")),
            Self::Text(text) => parse_timestamp_text(&text),
        }
    }
}

/// Parse an RFC 3339 or numeric timestamp string into Unix milliseconds.
///
/// Blank input yields `Ok(None)`.
pub fn parse_timestamp_text(text: &str) -> Result<Option<i64>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    if let Ok(millis) = text.parse::<i64>() {
        return Ok(Some(millis));
    }
    chrono::DateTime::parse_from_rfc3339(text)
        .map(|date_time| Some(date_time.timestamp_millis()))
        .map_err(|error| format!("invalid timestamp '{text}': {error}"))
}

/// Required timestamp field.
pub mod millis {
    use super::{de, Deserialize, Deserializer, RawTimestamp, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)]
    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(*value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        RawTimestamp::deserialize(deserializer)?
            .into_millis()
            .map_err(de::Error::custom)?
            .ok_or_else(|| de::Error::custom("timestamp must not be empty"))
    }
}

/// Optional timestamp field; `null` and blank strings read as `None`.
pub mod option_millis {
    use super::{de, Deserialize, Deserializer, RawTimestamp, Serializer};

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(millis) => serializer.serialize_some(millis),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        match Option::<RawTimestamp>::deserialize(deserializer)? {
            Some(raw) => raw.into_millis().map_err(de::Error::custom),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_and_numeric_text() {
        assert_eq!(
            parse_timestamp_text("1970-01-01T00:00:01.500Z").unwrap(),
            Some(1_500)
        );
        assert_eq!(parse_timestamp_text("42").unwrap(), Some(42));
        assert_eq!(parse_timestamp_text("  ").unwrap(), None);
        assert!(parse_timestamp_text("yesterday").is_err());
    }
}
