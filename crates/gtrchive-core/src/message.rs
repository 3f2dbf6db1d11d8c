//! Messages delivered by the filtered streaming endpoint.
//!
//! Every line of the stream body is a JSON object. Content records (tweets)
//! are recognised by a string `source` field; every other message type is a
//! single-key envelope (`{"limit": {...}}`, `{"delete": {...}}`, ...).
//!
//! Only [`StreamMessage::Tweet`] is ever persisted. The remaining variants
//! exist so consumers can match exhaustively and discard them explicitly.

use crate::error::Result;
use serde::Deserialize;
use serde_json::{Map, Value};

/// A decoded message from the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// A content record.
    Tweet(Tweet),
    /// A status was deleted upstream.
    Delete(StatusDeletion),
    /// Location data should be scrubbed up to a status id.
    ScrubGeo(LocationDeletion),
    /// The filter matched more statuses than the stream is allowed to deliver.
    Limit(LimitNotice),
    /// A status was withheld in some countries.
    StatusWithheld(Value),
    /// A user was withheld in some countries.
    UserWithheld(Value),
    /// The provider is about to close the connection.
    Disconnect(DisconnectNotice),
    /// The client is falling behind.
    Warning(StallWarning),
    /// Friend ids preamble (user streams).
    FriendsList(Value),
    /// A social event (follow, favorite, ...).
    Event(Value),
    /// Anything that does not match a known shape.
    Other(Value),
}

impl StreamMessage {
    /// Decode a single stream line.
    ///
    /// Fails only when the bytes are not valid JSON; unrecognised JSON
    /// becomes [`StreamMessage::Other`]. A content record keeps the line
    /// byte for byte, minus surrounding whitespace.
    pub fn from_slice(line: &[u8]) -> Result<Self> {
        let line = line.trim_ascii();
        let value: Value = serde_json::from_slice(line)?;
        Ok(Self::decode(value, Some(line)))
    }

    /// Classify an already-decoded JSON value.
    ///
    /// Content records carry the compact serialization of `value` as their
    /// raw text.
    pub fn classify(value: Value) -> Self {
        Self::decode(value, None)
    }

    fn decode(value: Value, raw: Option<&[u8]>) -> Self {
        let mut object = match value {
            Value::Object(object) => object,
            other => return Self::Other(other),
        };

        if matches!(object.get("source"), Some(Value::String(_))) {
            let raw = match raw {
                // Parsing succeeded, so the bytes are valid UTF-8.
                Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
                None => Value::Object(object.clone()).to_string(),
            };
            return Self::Tweet(Tweet {
                raw,
                document: object,
            });
        }

        if let Some(inner) = object.get("delete") {
            // {"delete": {"status": {...}}}
            if let Some(status) = inner.get("status")
                && let Ok(deletion) = serde_json::from_value(status.clone())
            {
                return Self::Delete(deletion);
            }
        } else if let Some(inner) = object.get("scrub_geo") {
            if let Ok(notice) = serde_json::from_value(inner.clone()) {
                return Self::ScrubGeo(notice);
            }
        } else if let Some(inner) = object.get("limit") {
            if let Ok(notice) = serde_json::from_value(inner.clone()) {
                return Self::Limit(notice);
            }
        } else if let Some(inner) = object.remove("status_withheld") {
            return Self::StatusWithheld(inner);
        } else if let Some(inner) = object.remove("user_withheld") {
            return Self::UserWithheld(inner);
        } else if let Some(inner) = object.get("disconnect") {
            if let Ok(notice) = serde_json::from_value(inner.clone()) {
                return Self::Disconnect(notice);
            }
        } else if let Some(inner) = object.get("warning") {
            if let Ok(warning) = serde_json::from_value(inner.clone()) {
                return Self::Warning(warning);
            }
        } else if let Some(inner) = object
            .remove("friends")
            .or_else(|| object.remove("friends_str"))
        {
            return Self::FriendsList(inner);
        } else if object.contains_key("event") {
            return Self::Event(Value::Object(object));
        }

        Self::Other(Value::Object(object))
    }

    /// Short name of the variant, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Tweet(_) => "tweet",
            Self::Delete(_) => "delete",
            Self::ScrubGeo(_) => "scrub_geo",
            Self::Limit(_) => "limit",
            Self::StatusWithheld(_) => "status_withheld",
            Self::UserWithheld(_) => "user_withheld",
            Self::Disconnect(_) => "disconnect",
            Self::Warning(_) => "warning",
            Self::FriendsList(_) => "friends",
            Self::Event(_) => "event",
            Self::Other(_) => "other",
        }
    }
}

/// A content record.
///
/// `raw` is the record exactly as the provider sent it and is what gets
/// stored; `document` is a parsed view used for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct Tweet {
    raw: String,
    document: Map<String, Value>,
}

impl Tweet {
    /// The record exactly as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The provider's string id, if present.
    pub fn id_str(&self) -> Option<&str> {
        self.document.get("id_str").and_then(Value::as_str)
    }

    /// Author screen name, or an empty string when absent.
    pub fn screen_name(&self) -> &str {
        self.document
            .get("user")
            .and_then(|user| user.get("screen_name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Best available text: extended full text, then `full_text`, then `text`.
    pub fn text(&self) -> &str {
        self.document
            .get("extended_tweet")
            .and_then(|ext| ext.get("full_text"))
            .or_else(|| self.document.get("full_text"))
            .or_else(|| self.document.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

/// Body of a `delete` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StatusDeletion {
    pub id: u64,
    #[serde(default)]
    pub id_str: String,
    pub user_id: u64,
    #[serde(default)]
    pub user_id_str: String,
}

/// Body of a `scrub_geo` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocationDeletion {
    pub user_id: u64,
    #[serde(default)]
    pub user_id_str: String,
    pub up_to_status_id: u64,
    #[serde(default)]
    pub up_to_status_id_str: String,
}

/// Body of a `limit` envelope: number of undelivered matching statuses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LimitNotice {
    pub track: u64,
}

/// Body of a `disconnect` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DisconnectNotice {
    pub code: u32,
    #[serde(default)]
    pub stream_name: String,
    #[serde(default)]
    pub reason: String,
}

/// Body of a `warning` envelope.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StallWarning {
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub percent_full: Option<u32>,
}
