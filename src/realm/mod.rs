// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Storage realm integration traits.
//!
//! A realm is a storage environment with its own endpoint and credential
//! boundary. The replicator reads from a [`SourceRealm`] and writes to a
//! [`DestinationRealm`]; the embedding process provides implementations
//! bound to the right identities, constructed once at startup.
//!
//! Only the calls the replication path needs are part of these traits:
//!
//! | Realm | Call | Used by |
//! |-------|------|---------|
//! | source | `head_object` | Object Transfer (metadata snapshot) |
//! | source | `get_object_tags` | Object Transfer (tag snapshot) |
//! | source | `get_object_stream` | Object Transfer (body) |
//! | destination | `put_object` | Object Transfer (write + digest) |
//! | destination | `delete_object` | Deletion Propagator |
//!
//! [`memory::InMemoryRealm`] implements both sides and is used for standalone
//! runs and tests.

pub mod memory;

use crate::error::RealmError;
use bytes::Bytes;
use futures::Stream;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

/// Result type for realm operations.
pub type RealmResult<T> = std::result::Result<T, RealmError>;

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = RealmResult<T>> + Send + 'a>>;

/// Incrementally consumed object body.
///
/// Errors are delivered in-band as stream items.
pub type ByteStream = Pin<Box<dyn Stream<Item = RealmResult<Bytes>> + Send>>;

/// One object tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Head metadata of a source object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHead {
    pub content_length: u64,
    pub content_type: String,
    pub user_metadata: BTreeMap<String, String>,
    /// Realm-issued integrity token (e.g. an ETag).
    pub digest: String,
}

/// Snapshot of everything carried across realms besides the body.
///
/// Captured once at the start of a transfer attempt; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_length: u64,
    pub content_type: String,
    pub user_metadata: BTreeMap<String, String>,
    pub tags: Vec<Tag>,
    pub digest: String,
}

impl ObjectMetadata {
    pub fn from_parts(head: ObjectHead, tags: Vec<Tag>) -> Self {
        Self {
            content_length: head.content_length,
            content_type: head.content_type,
            user_metadata: head.user_metadata,
            tags,
            digest: head.digest,
        }
    }

    /// Tag set in the destination's tagging representation.
    pub fn tagging(&self) -> String {
        encode_tags(&self.tags)
    }
}

/// Characters left unescaped in tag keys and values.
///
/// Matches URI-component encoding: alphanumerics plus `-_.!~*'()`.
pub const TAG_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Encode a tag set as `k1=v1&k2=v2`, escaping each key and value.
///
/// Order is preserved; an empty tag set encodes to the empty string.
pub fn encode_tags(tags: &[Tag]) -> String {
    tags.iter()
        .map(|tag| {
            format!(
                "{}={}",
                utf8_percent_encode(&tag.key, TAG_ENCODE_SET),
                utf8_percent_encode(&tag.value, TAG_ENCODE_SET)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// A streaming write to the destination realm.
pub struct PutObjectRequest {
    pub bucket: String,
    pub key: String,
    pub body: ByteStream,
    pub content_length: u64,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
    /// Encoded tag set, see [`encode_tags`].
    pub tagging: String,
}

impl std::fmt::Debug for PutObjectRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PutObjectRequest")
            .field("bucket", &self.bucket)
            .field("key", &self.key)
            .field("content_length", &self.content_length)
            .field("content_type", &self.content_type)
            .field("metadata", &self.metadata)
            .field("tagging", &self.tagging)
            .finish_non_exhaustive()
    }
}

/// Result of a completed destination write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectOutput {
    /// Integrity token of the stored object, as issued by the destination.
    pub digest: String,
}

/// Read side: the realm change notifications originate from.
///
/// Uses the ambient identity of the process.
pub trait SourceRealm: Send + Sync + 'static {
    fn head_object(&self, bucket: &str, key: &str) -> BoxFuture<'_, ObjectHead>;

    fn get_object_tags(&self, bucket: &str, key: &str) -> BoxFuture<'_, Vec<Tag>>;

    /// Open a streaming read of the object body.
    fn get_object_stream(&self, bucket: &str, key: &str) -> BoxFuture<'_, ByteStream>;
}

/// Write side: the realm replicas are kept in.
///
/// Bound to the explicit destination credentials.
pub trait DestinationRealm: Send + Sync + 'static {
    /// Consume `request.body` and store it, returning the stored digest.
    ///
    /// Must fail if the body stream yields an error.
    fn put_object(&self, request: PutObjectRequest) -> BoxFuture<'_, PutObjectOutput>;

    /// Remove an object. Deleting an absent key succeeds.
    fn delete_object(&self, bucket: &str, key: &str) -> BoxFuture<'_, ()>;
}
