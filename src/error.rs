// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Error types for the replicator.
//!
//! Errors are layered the same way the replication path is:
//!
//! ```text
//! RealmError ──► TransferError ──► TerminalError ──┐
//!            └─► DeleteError ──────────────────────┼──► ReplicationError ──► ErrorResponse
//!                                 (event / config) ┘
//! ```
//!
//! # Error Categories
//!
//! | Error Type | Retryable | Description |
//! |------------|-----------|-------------|
//! | `TransferError::SourceRead` | Yes | Head or tag fetch on the source realm failed |
//! | `TransferError::Stream` | Yes | Source body stream failed or ended early |
//! | `TransferError::DestinationWrite` | Yes | Destination `put_object` failed |
//! | `TransferError::Integrity` | Yes | Destination digest differs from the source digest |
//! | `DeleteError` | No | Destination delete failed (single attempt) |
//! | `ReplicationError::Event` | No | Notification could not be parsed |
//! | `ReplicationError::Record` | No | One storage record in the notification was unusable |
//! | `ReplicationError::Config` | No | Configuration invalid |
//!
//! Whatever escapes the dispatcher is converted into an [`ErrorResponse`],
//! the structured `{statusCode, key, body}` value handed back to the trigger
//! source for dead-lettering and alerting.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Result type alias for dispatcher operations.
pub type Result<T> = std::result::Result<T, ReplicationError>;

/// Error reported by a storage realm collaborator.
///
/// `code` is the realm's own error code (e.g. `"NoSuchKey"`, `"AccessDenied"`)
/// and becomes the `statusCode` of the outbound [`ErrorResponse`].
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct RealmError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl RealmError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Attach the HTTP-level status the realm answered with.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn not_found(bucket: &str, key: &str) -> Self {
        Self::new("NoSuchKey", format!("{}/{} does not exist", bucket, key)).with_status(404)
    }
}

/// Destination digest did not match the digest captured from the source.
///
/// Means the bytes differ, not that the network failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("digest mismatch: expected {expected}, destination returned {actual}")]
pub struct IntegrityError {
    pub expected: String,
    pub actual: String,
}

/// Failure of a single object transfer attempt.
#[derive(Error, Debug, Clone)]
pub enum TransferError {
    /// Head metadata or tag set could not be read from the source realm.
    #[error("source read failed for {key}: {source}")]
    SourceRead {
        key: String,
        #[source]
        source: RealmError,
    },

    /// The source body stream failed to open, errored mid-read, or ended
    /// with a length different from the captured content length.
    #[error("source stream failed for {key}: {source}")]
    Stream {
        key: String,
        #[source]
        source: RealmError,
    },

    /// The destination realm rejected the write.
    #[error("destination write failed for {key}: {source}")]
    DestinationWrite {
        key: String,
        #[source]
        source: RealmError,
    },

    /// The destination stored bytes whose digest differs from the source.
    #[error("integrity check failed for {key}: {source}")]
    Integrity {
        key: String,
        #[source]
        source: IntegrityError,
    },
}

impl TransferError {
    /// Every transfer failure consumes one attempt and is retried while the
    /// attempt budget lasts.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::SourceRead { .. } => true,
            Self::Stream { .. } => true,
            Self::DestinationWrite { .. } => true,
            Self::Integrity { .. } => true,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::SourceRead { key, .. }
            | Self::Stream { key, .. }
            | Self::DestinationWrite { key, .. }
            | Self::Integrity { key, .. } => key,
        }
    }

    /// Collaborator error code, if the failure came from a realm call.
    pub fn status_code(&self) -> Option<&str> {
        self.realm_error().map(|e| e.code.as_str())
    }

    fn realm_error(&self) -> Option<&RealmError> {
        match self {
            Self::SourceRead { source, .. }
            | Self::Stream { source, .. }
            | Self::DestinationWrite { source, .. } => Some(source),
            Self::Integrity { .. } => None,
        }
    }

    /// The raw underlying error as a JSON value.
    pub fn body(&self) -> Value {
        match self {
            Self::SourceRead { source, .. }
            | Self::Stream { source, .. }
            | Self::DestinationWrite { source, .. } => realm_error_body(source),
            Self::Integrity { source, .. } => json!({
                "message": source.to_string(),
                "expected": source.expected,
                "actual": source.actual,
            }),
        }
    }
}

/// Destination delete failed. Never retried.
#[derive(Error, Debug, Clone)]
#[error("delete of {key} failed: {source}")]
pub struct DeleteError {
    pub key: String,
    #[source]
    pub source: RealmError,
}

/// The attempt budget was spent without a successful transfer.
///
/// Carries the failure of the final attempt.
#[derive(Error, Debug, Clone)]
#[error("replication of {key} failed after {attempts} attempt(s): {source}")]
pub struct TerminalError {
    pub key: String,
    pub attempts: u32,
    #[source]
    pub source: TransferError,
}

/// Errors that can escape [`Replicator::dispatch`](crate::Replicator::dispatch).
#[derive(Error, Debug)]
pub enum ReplicationError {
    /// Copy path failed terminally.
    #[error(transparent)]
    Transfer(#[from] TerminalError),

    /// Delete path failed.
    #[error(transparent)]
    Delete(#[from] DeleteError),

    /// The change notification was malformed.
    #[error("Event error: {0}")]
    Event(String),

    /// One storage record was unusable; its siblings are unaffected.
    ///
    /// `key` is the raw key as delivered, empty when the record had none.
    #[error("Invalid record for {key:?}: {reason}")]
    Record { key: String, reason: String },

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ReplicationError {
    /// Object key the failure concerns, empty when none is known.
    pub fn key(&self) -> &str {
        match self {
            Self::Transfer(e) => &e.key,
            Self::Delete(e) => &e.key,
            Self::Record { key, .. } => key,
            Self::Event(_) | Self::Config(_) => "",
        }
    }

    pub fn status_code(&self) -> Option<&str> {
        match self {
            Self::Transfer(e) => e.source.status_code(),
            Self::Delete(e) => Some(e.source.code.as_str()),
            Self::Event(_) | Self::Record { .. } => Some("InvalidEvent"),
            Self::Config(_) => Some("InvalidConfiguration"),
        }
    }

    pub fn body(&self) -> Value {
        match self {
            Self::Transfer(e) => e.source.body(),
            Self::Delete(e) => realm_error_body(&e.source),
            Self::Event(message) | Self::Config(message) => json!({ "message": message }),
            Self::Record { reason, .. } => json!({ "message": reason }),
        }
    }

    /// Wrap into the structured outbound failure signal.
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            status_code: self.status_code().map(str::to_string),
            key: self.key().to_string(),
            body: self.body(),
        }
    }
}

fn realm_error_body(source: &RealmError) -> Value {
    serde_json::to_value(source).unwrap_or_else(|_| json!({ "message": source.to_string() }))
}

/// Structured failure handed back to the trigger source.
///
/// Serializes as `{"statusCode": .., "key": .., "body": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: Option<String>,
    pub key: String,
    pub body: Value,
}

impl ErrorResponse {
    /// Serialized form of the failure signal.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"statusCode":null,"key":{:?},"body":"unserializable error"}}"#,
                self.key
            )
        })
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl std::error::Error for ErrorResponse {}

impl From<ReplicationError> for ErrorResponse {
    fn from(e: ReplicationError) -> Self {
        e.to_response()
    }
}
