//! Lenient timestamp decoding for documents coming back from the backend.
//!
//! Notes written by this client carry RFC 3339 strings, but folders created
//! server-side are stored by the document database and come back either as
//! `{ "_seconds": .., "_nanoseconds": .. }` objects or as epoch milliseconds.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Millis(i64),
    Document {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
}

impl RawTimestamp {
    fn into_datetime(self) -> Option<DateTime<Utc>> {
        match self {
            Self::Text(text) => DateTime::parse_from_rfc3339(text.trim())
                .ok()
                .map(|parsed| parsed.with_timezone(&Utc)),
            Self::Millis(millis) => Utc.timestamp_millis_opt(millis).single(),
            Self::Document {
                seconds,
                nanoseconds,
            } => Utc.timestamp_opt(seconds, nanoseconds).single(),
        }
    }
}

/// Deserialize a timestamp, falling back to "now" when the value is present
/// but unreadable.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    Ok(raw.and_then(RawTimestamp::into_datetime).unwrap_or_else(Utc::now))
}

/// Like [`deserialize`] but keeps a missing or unreadable value as `None`.
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    Ok(raw.and_then(RawTimestamp::into_datetime))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde::Deserialize;

    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(default, deserialize_with = "deserialize_option")]
        at: Option<DateTime<Utc>>,
    }

    fn parse(raw: &str) -> Option<DateTime<Utc>> {
        serde_json::from_str::<Wrapper>(raw).unwrap().at
    }

    #[test]
    fn accepts_rfc3339_strings() {
        let parsed = parse(r#"{"at":"2024-05-01T10:00:00.000Z"}"#).unwrap();
        assert_eq!(parsed.timestamp(), 1_714_557_600);
    }

    #[test]
    fn accepts_document_store_objects() {
        let parsed = parse(r#"{"at":{"_seconds":1714557600,"_nanoseconds":0}}"#).unwrap();
        assert_eq!(parsed.timestamp(), 1_714_557_600);
    }

    #[test]
    fn accepts_epoch_millis() {
        let parsed = parse(r#"{"at":1714557600000}"#).unwrap();
        assert_eq!(parsed.timestamp(), 1_714_557_600);
    }

    #[test]
    fn missing_or_garbage_values_are_none() {
        assert_eq!(parse("{}"), None);
        assert_eq!(parse(r#"{"at":null}"#), None);
        assert_eq!(parse(r#"{"at":"yesterday"}"#), None);
    }
}
