// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Change notification parsing.
//!
//! An invocation receives a notification envelope. Each envelope entry is
//! either a pub/sub wrapper whose `Sns.Message` holds a JSON-encoded storage
//! notification, or a bare storage record:
//!
//! ```text
//! {"Records": [
//!   {"Sns": {"Message": "{\"Records\":[{\"eventName\":\"ObjectCreated:Put\", \"s3\":{...}}]}"}},
//!   {"eventName": "ObjectRemoved:Delete", "s3": {"bucket": {"name": "src"}, "object": {"key": "a%20b"}}}
//! ]}
//! ```
//!
//! Every storage record found becomes one [`ChangeDescriptor`], in order. A
//! malformed record becomes an error in its own slot.
//! Object keys arrive percent-encoded and are decoded here, before any realm
//! call sees them. `+` is left as-is.

use crate::error::{ReplicationError, Result};
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::Value;

/// Event-name prefix of removal-class events.
const REMOVED_PREFIX: &str = "ObjectRemoved";

/// Event-name prefix of creation-class events.
const CREATED_PREFIX: &str = "ObjectCreated";

/// Classification of a storage change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Removed,
    Other,
}

impl EventKind {
    /// Classify by event-name prefix (`ObjectRemoved:*`, `ObjectCreated:*`).
    pub fn from_event_name(name: &str) -> Self {
        if name.starts_with(REMOVED_PREFIX) {
            EventKind::Removed
        } else if name.starts_with(CREATED_PREFIX) {
            EventKind::Created
        } else {
            EventKind::Other
        }
    }

    pub fn is_removal(&self) -> bool {
        matches!(self, EventKind::Removed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Removed => "removed",
            EventKind::Other => "other",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized view of one storage change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDescriptor {
    pub event_kind: EventKind,
    /// Event name as delivered (e.g. `ObjectCreated:Put`), for logging.
    pub event_name: String,
    pub source_bucket: String,
    /// Already percent-decoded.
    pub object_key: String,
}

impl ChangeDescriptor {
    pub fn new(event_name: &str, source_bucket: &str, object_key: &str) -> Self {
        Self {
            event_kind: EventKind::from_event_name(event_name),
            event_name: event_name.to_string(),
            source_bucket: source_bucket.to_string(),
            object_key: object_key.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Wire format
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Records", default)]
    records: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct PubSubEntry {
    #[serde(rename = "Sns")]
    sns: PubSubPayload,
}

#[derive(Debug, Deserialize)]
struct PubSubPayload {
    #[serde(rename = "Message")]
    message: String,
}

#[derive(Debug, Deserialize)]
struct StorageNotification {
    #[serde(rename = "Records", default)]
    records: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct StorageRecord {
    #[serde(rename = "eventName")]
    event_name: String,
    s3: StorageEntity,
}

#[derive(Debug, Deserialize)]
struct StorageEntity {
    bucket: BucketEntity,
    object: ObjectEntity,
}

#[derive(Debug, Deserialize)]
struct BucketEntity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ObjectEntity {
    key: String,
}

impl StorageRecord {
    fn into_descriptor(self) -> Result<ChangeDescriptor> {
        let key = decode_key(&self.s3.object.key)?;
        Ok(ChangeDescriptor::new(&self.event_name, &self.s3.bucket.name, &key))
    }
}

/// Percent-decode an object key as delivered in a notification.
pub fn decode_key(raw: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|k| k.into_owned())
        .map_err(|e| ReplicationError::Record {
            key: raw.to_string(),
            reason: format!("object key is not valid UTF-8: {}", e),
        })
}

/// Parse a notification envelope into one result per storage record, in
/// delivery order.
///
/// The outer error covers the envelope itself: unparseable JSON, or no
/// storage records at all. A record that cannot be turned into a descriptor
/// yields its own [`ReplicationError::Record`] and leaves its siblings intact.
pub fn parse_envelope(payload: &str) -> Result<Vec<Result<ChangeDescriptor>>> {
    let envelope: Envelope = serde_json::from_str(payload)
        .map_err(|e| ReplicationError::Event(format!("invalid notification envelope: {}", e)))?;

    let mut records = Vec::new();
    for entry in envelope.records {
        if entry.get("Sns").is_some() {
            match unwrap_pubsub(entry) {
                Ok(inner) => records.extend(inner.into_iter().map(parse_record)),
                Err(reason) => records.push(Err(ReplicationError::Record {
                    key: String::new(),
                    reason,
                })),
            }
        } else {
            records.push(parse_record(entry));
        }
    }

    if records.is_empty() {
        return Err(ReplicationError::Event("notification carries no storage records".into()));
    }
    Ok(records)
}

/// Storage records carried inside a pub/sub wrapper's `Message`.
fn unwrap_pubsub(entry: Value) -> std::result::Result<Vec<Value>, String> {
    let wrapper: PubSubEntry = serde_json::from_value(entry)
        .map_err(|e| format!("invalid pub/sub wrapper: {}", e))?;
    let notification: StorageNotification = serde_json::from_str(&wrapper.sns.message)
        .map_err(|e| format!("invalid storage notification: {}", e))?;
    Ok(notification.records)
}

fn parse_record(raw: Value) -> Result<ChangeDescriptor> {
    let raw_key = raw
        .pointer("/s3/object/key")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let record: StorageRecord = serde_json::from_value(raw).map_err(|e| ReplicationError::Record {
        key: raw_key,
        reason: format!("invalid storage record: {}", e),
    })?;
    record.into_descriptor()
}
