// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-process storage realm.
//!
//! Implements both [`SourceRealm`] and [`DestinationRealm`] over a map held in
//! memory. Digests are the hex SHA-256 of the body, so two in-memory realms
//! holding the same bytes report the same digest. Bodies are served in
//! fixed-size chunks to exercise the streaming path.

use super::{
    BoxFuture, ByteStream, DestinationRealm, ObjectHead, PutObjectOutput, PutObjectRequest,
    RealmResult, SourceRealm, Tag,
};
use crate::error::RealmError;
use bytes::{Bytes, BytesMut};
use futures::{stream, TryStreamExt};
use percent_encoding::percent_decode_str;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Default chunk size for body streams (64 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// An object stored in an [`InMemoryRealm`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
    pub tags: Vec<Tag>,
    pub digest: String,
}

/// Storage realm backed by a `HashMap`.
#[derive(Debug)]
pub struct InMemoryRealm {
    name: String,
    chunk_size: usize,
    objects: RwLock<HashMap<(String, String), StoredObject>>,
}

impl InMemoryRealm {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_chunk_size(name, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(name: impl Into<String>, chunk_size: usize) -> Self {
        Self {
            name: name.into(),
            chunk_size: chunk_size.max(1),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store an object directly, bypassing the streaming path.
    pub async fn insert(
        &self,
        bucket: &str,
        key: &str,
        body: impl Into<Bytes>,
        content_type: &str,
        metadata: BTreeMap<String, String>,
        tags: Vec<Tag>,
    ) -> String {
        let body = body.into();
        let digest = content_digest(&body);
        let object = StoredObject {
            body,
            content_type: content_type.to_string(),
            metadata,
            tags,
            digest: digest.clone(),
        };
        self.objects
            .write()
            .await
            .insert((bucket.to_string(), key.to_string()), object);
        digest
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub async fn contains(&self, bucket: &str, key: &str) -> bool {
        self.get(bucket, key).await.is_some()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    async fn lookup(&self, bucket: &str, key: &str) -> Result<StoredObject, RealmError> {
        self.get(bucket, key)
            .await
            .ok_or_else(|| RealmError::not_found(bucket, key))
    }
}

/// Hex SHA-256 of a body.
pub fn content_digest(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(data))
}

/// Decode a `k=v&k=v` tagging string back into tags.
pub fn decode_tags(tagging: &str) -> Result<Vec<Tag>, RealmError> {
    let decode = |part: &str| {
        percent_decode_str(part)
            .decode_utf8()
            .map(|s| s.into_owned())
            .map_err(|_| RealmError::new("InvalidTag", "tag is not valid UTF-8").with_status(400))
    };

    let mut tags = Vec::new();
    for pair in tagging.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        tags.push(Tag::new(decode(key)?, decode(value)?));
    }
    Ok(tags)
}

impl SourceRealm for InMemoryRealm {
    fn head_object(&self, bucket: &str, key: &str) -> BoxFuture<'_, ObjectHead> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            let object = self.lookup(&bucket, &key).await?;
            Ok(ObjectHead {
                content_length: object.body.len() as u64,
                content_type: object.content_type,
                user_metadata: object.metadata,
                digest: object.digest,
            })
        })
    }

    fn get_object_tags(&self, bucket: &str, key: &str) -> BoxFuture<'_, Vec<Tag>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move { Ok(self.lookup(&bucket, &key).await?.tags) })
    }

    fn get_object_stream(&self, bucket: &str, key: &str) -> BoxFuture<'_, ByteStream> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            let body = self.lookup(&bucket, &key).await?.body;
            let chunks: Vec<RealmResult<Bytes>> = (0..body.len())
                .step_by(self.chunk_size)
                .map(|start| {
                    let end = (start + self.chunk_size).min(body.len());
                    Ok(body.slice(start..end))
                })
                .collect();
            tracing::trace!(realm = %self.name, key = %key, chunks = chunks.len(), "Serving body stream");
            Ok(Box::pin(stream::iter(chunks)) as ByteStream)
        })
    }
}

impl DestinationRealm for InMemoryRealm {
    fn put_object(&self, request: PutObjectRequest) -> BoxFuture<'_, PutObjectOutput> {
        Box::pin(async move {
            let PutObjectRequest {
                bucket,
                key,
                body,
                content_length,
                content_type,
                metadata,
                tagging,
            } = request;

            let body = body
                .try_fold(BytesMut::new(), |mut buf, chunk| async move {
                    buf.extend_from_slice(&chunk);
                    Ok::<_, RealmError>(buf)
                })
                .await?
                .freeze();

            if body.len() as u64 != content_length {
                return Err(RealmError::new(
                    "IncompleteBody",
                    format!("expected {} bytes, received {}", content_length, body.len()),
                )
                .with_status(400));
            }

            let tags = decode_tags(&tagging)?;
            let digest = self
                .insert(&bucket, &key, body, &content_type, metadata, tags)
                .await;
            tracing::debug!(realm = %self.name, bucket = %bucket, key = %key, digest = %digest, "Stored object");
            Ok(PutObjectOutput { digest })
        })
    }

    fn delete_object(&self, bucket: &str, key: &str) -> BoxFuture<'_, ()> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            let removed = self.objects.write().await.remove(&(bucket, key.clone()));
            tracing::debug!(realm = %self.name, key = %key, existed = removed.is_some(), "Deleted object");
            Ok(())
        })
    }
}
