//! Recording realms for testing.
//!
//! Both mocks delegate storage to an [`InMemoryRealm`] and record every call
//! for assertions. Faults are armed as countdowns: `fail_next_*(n)` makes the
//! next `n` matching calls fail, after which calls succeed again.

#![allow(dead_code)]

use bucket_replicator::error::RealmError;
use bucket_replicator::realm::memory::InMemoryRealm;
use bucket_replicator::realm::{
    BoxFuture, ByteStream, DestinationRealm, ObjectHead, PutObjectOutput, PutObjectRequest,
    SourceRealm, Tag,
};
use bytes::Bytes;
use futures::{stream, StreamExt};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Consume one armed fault, if any.
fn take_fault(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn unavailable() -> RealmError {
    RealmError::new("ServiceUnavailable", "simulated outage").with_status(503)
}

/// Kind of source realm call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOp {
    Head,
    Tags,
    Stream,
}

/// A recorded source realm call.
#[derive(Debug, Clone)]
pub struct SourceCall {
    pub op: SourceOp,
    pub bucket: String,
    pub key: String,
    pub at: Instant,
}

/// Source realm with call recording and fault injection.
pub struct MockSource {
    inner: InMemoryRealm,
    calls: RwLock<Vec<SourceCall>>,
    head_failures: AtomicU32,
    tag_failures: AtomicU32,
    stream_open_failures: AtomicU32,
    broken_streams: AtomicU32,
    truncated_streams: AtomicU32,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            inner: InMemoryRealm::with_chunk_size("mock-source", 4),
            calls: RwLock::new(Vec::new()),
            head_failures: AtomicU32::new(0),
            tag_failures: AtomicU32::new(0),
            stream_open_failures: AtomicU32::new(0),
            broken_streams: AtomicU32::new(0),
            truncated_streams: AtomicU32::new(0),
        }
    }

    pub async fn put(&self, bucket: &str, key: &str, body: &[u8]) -> String {
        self.put_with(bucket, key, body, "application/octet-stream", BTreeMap::new(), vec![])
            .await
    }

    pub async fn put_with(
        &self,
        bucket: &str,
        key: &str,
        body: &[u8],
        content_type: &str,
        metadata: BTreeMap<String, String>,
        tags: Vec<Tag>,
    ) -> String {
        self.inner
            .insert(bucket, key, Bytes::copy_from_slice(body), content_type, metadata, tags)
            .await
    }

    // =========================================================================
    // Fault Injection
    // =========================================================================

    /// Next `n` head_object calls fail with `ServiceUnavailable`.
    pub fn fail_next_heads(&self, n: u32) {
        self.head_failures.store(n, Ordering::SeqCst);
    }

    /// Next `n` get_object_tags calls fail with `SlowDown`.
    pub fn fail_next_tags(&self, n: u32) {
        self.tag_failures.store(n, Ordering::SeqCst);
    }

    /// Next `n` get_object_stream calls are refused before any body flows.
    pub fn fail_next_stream_opens(&self, n: u32) {
        self.stream_open_failures.store(n, Ordering::SeqCst);
    }

    /// Next `n` body streams yield one chunk, then an error.
    pub fn break_next_streams(&self, n: u32) {
        self.broken_streams.store(n, Ordering::SeqCst);
    }

    /// Next `n` body streams end cleanly after one chunk.
    pub fn truncate_next_streams(&self, n: u32) {
        self.truncated_streams.store(n, Ordering::SeqCst);
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    pub async fn calls(&self) -> Vec<SourceCall> {
        self.calls.read().await.clone()
    }

    pub async fn count(&self, op: SourceOp) -> usize {
        self.calls.read().await.iter().filter(|c| c.op == op).count()
    }

    /// Instants at which body streams were opened, one per attempt that got that far.
    pub async fn stream_opened_at(&self) -> Vec<Instant> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.op == SourceOp::Stream)
            .map(|c| c.at)
            .collect()
    }

    /// Instants of head_object calls, one per attempt.
    pub async fn head_at(&self) -> Vec<Instant> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.op == SourceOp::Head)
            .map(|c| c.at)
            .collect()
    }

    async fn record(&self, op: SourceOp, bucket: &str, key: &str) {
        self.calls.write().await.push(SourceCall {
            op,
            bucket: bucket.to_string(),
            key: key.to_string(),
            at: Instant::now(),
        });
    }
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceRealm for MockSource {
    fn head_object(&self, bucket: &str, key: &str) -> BoxFuture<'_, ObjectHead> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            self.record(SourceOp::Head, &bucket, &key).await;
            if take_fault(&self.head_failures) {
                return Err(unavailable());
            }
            self.inner.head_object(&bucket, &key).await
        })
    }

    fn get_object_tags(&self, bucket: &str, key: &str) -> BoxFuture<'_, Vec<Tag>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            self.record(SourceOp::Tags, &bucket, &key).await;
            if take_fault(&self.tag_failures) {
                return Err(RealmError::new("SlowDown", "simulated throttling").with_status(503));
            }
            self.inner.get_object_tags(&bucket, &key).await
        })
    }

    fn get_object_stream(&self, bucket: &str, key: &str) -> BoxFuture<'_, ByteStream> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            self.record(SourceOp::Stream, &bucket, &key).await;
            if take_fault(&self.stream_open_failures) {
                return Err(RealmError::new("AccessDenied", "body read refused").with_status(403));
            }
            let body = self.inner.get_object_stream(&bucket, &key).await?;

            if take_fault(&self.broken_streams) {
                let failing = body
                    .take(1)
                    .chain(stream::once(async {
                        Err(RealmError::new("RequestTimeout", "socket closed mid-body"))
                    }));
                return Ok(Box::pin(failing) as ByteStream);
            }
            if take_fault(&self.truncated_streams) {
                return Ok(Box::pin(body.take(1)) as ByteStream);
            }
            Ok(body)
        })
    }
}

/// A recorded put_object call.
#[derive(Debug, Clone)]
pub struct PutCall {
    pub bucket: String,
    pub key: String,
    pub content_length: u64,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
    pub tagging: String,
    pub at: Instant,
}

/// A recorded delete_object call.
#[derive(Debug, Clone)]
pub struct DeleteCall {
    pub bucket: String,
    pub key: String,
}

/// Destination realm with call recording and fault injection.
pub struct MockDestination {
    inner: Arc<InMemoryRealm>,
    puts: RwLock<Vec<PutCall>>,
    deletes: RwLock<Vec<DeleteCall>>,
    put_failures: AtomicU32,
    wrong_digests: AtomicU32,
    delete_failures: AtomicU32,
}

impl MockDestination {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(InMemoryRealm::new("mock-destination")),
            puts: RwLock::new(Vec::new()),
            deletes: RwLock::new(Vec::new()),
            put_failures: AtomicU32::new(0),
            wrong_digests: AtomicU32::new(0),
            delete_failures: AtomicU32::new(0),
        }
    }

    /// Backing store, for content assertions.
    pub fn store(&self) -> &InMemoryRealm {
        &self.inner
    }

    // =========================================================================
    // Fault Injection
    // =========================================================================

    /// Next `n` put_object calls drain the body, then fail.
    pub fn fail_next_puts(&self, n: u32) {
        self.put_failures.store(n, Ordering::SeqCst);
    }

    /// Next `n` put_object calls store the object but report a bogus digest.
    pub fn corrupt_next_digests(&self, n: u32) {
        self.wrong_digests.store(n, Ordering::SeqCst);
    }

    /// Next `n` delete_object calls fail.
    pub fn fail_next_deletes(&self, n: u32) {
        self.delete_failures.store(n, Ordering::SeqCst);
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    pub async fn puts(&self) -> Vec<PutCall> {
        self.puts.read().await.clone()
    }

    pub async fn deletes(&self) -> Vec<DeleteCall> {
        self.deletes.read().await.clone()
    }

    pub async fn put_count(&self) -> usize {
        self.puts.read().await.len()
    }

    pub async fn delete_count(&self) -> usize {
        self.deletes.read().await.len()
    }
}

impl Default for MockDestination {
    fn default() -> Self {
        Self::new()
    }
}

impl DestinationRealm for MockDestination {
    fn put_object(&self, request: PutObjectRequest) -> BoxFuture<'_, PutObjectOutput> {
        Box::pin(async move {
            self.puts.write().await.push(PutCall {
                bucket: request.bucket.clone(),
                key: request.key.clone(),
                content_length: request.content_length,
                content_type: request.content_type.clone(),
                metadata: request.metadata.clone(),
                tagging: request.tagging.clone(),
                at: Instant::now(),
            });

            if take_fault(&self.put_failures) {
                let _: Vec<_> = request.body.collect().await;
                return Err(RealmError::new("InternalError", "simulated write failure").with_status(500));
            }

            let output = self.inner.put_object(request).await?;
            if take_fault(&self.wrong_digests) {
                return Ok(PutObjectOutput {
                    digest: format!("corrupted-{}", output.digest),
                });
            }
            Ok(output)
        })
    }

    fn delete_object(&self, bucket: &str, key: &str) -> BoxFuture<'_, ()> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            self.deletes.write().await.push(DeleteCall {
                bucket: bucket.clone(),
                key: key.clone(),
            });
            if take_fault(&self.delete_failures) {
                return Err(RealmError::new("AccessDenied", "simulated denial").with_status(403));
            }
            self.inner.delete_object(&bucket, &key).await
        })
    }
}
