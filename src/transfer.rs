// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Object transfer: one object, source realm to destination realm.
//!
//! # Flow
//!
//! ```text
//! head_object ─┐
//!              ├─ try_join ─► ObjectMetadata snapshot
//! get_tags ────┘                    │
//!                                   ▼
//! get_object_stream ─► MonitoredStream ─► put_object ─► verify(digest)
//!                           │
//!                           └─ fault channel (oneshot)
//! ```
//!
//! The body is never buffered here: chunks flow from the source stream
//! straight into the destination write, so the destination's consumption
//! rate gates the source read rate.
//!
//! # Stream Faults
//!
//! A source stream error is reported twice: in-band as an `Err` item, so the
//! destination abandons the write, and on a oneshot fault channel. After the
//! write returns, a recorded fault wins over whatever the destination
//! reported, and the attempt fails with [`TransferError::Stream`]. A body that
//! ends shorter or runs longer than the captured content length is a fault
//! too.

use crate::error::{RealmError, TransferError};
use crate::integrity;
use crate::metrics;
use crate::realm::{
    ByteStream, DestinationRealm, ObjectMetadata, PutObjectRequest, RealmResult, SourceRealm,
};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, instrument, trace, warn};

/// Copies single objects from a source realm into the fixed destination bucket.
pub struct ObjectTransfer<S, D> {
    source: Arc<S>,
    destination: Arc<D>,
    destination_bucket: String,
}

impl<S: SourceRealm, D: DestinationRealm> ObjectTransfer<S, D> {
    pub fn new(source: Arc<S>, destination: Arc<D>, destination_bucket: impl Into<String>) -> Self {
        Self {
            source,
            destination,
            destination_bucket: destination_bucket.into(),
        }
    }

    pub fn destination_bucket(&self) -> &str {
        &self.destination_bucket
    }

    /// Run one complete transfer attempt.
    #[instrument(skip(self), fields(destination_bucket = %self.destination_bucket))]
    pub async fn transfer(&self, source_bucket: &str, key: &str) -> Result<(), TransferError> {
        let started = Instant::now();
        let metadata = self.capture_metadata(source_bucket, key).await?;

        let body = self
            .source
            .get_object_stream(source_bucket, key)
            .await
            .map_err(|source| TransferError::Stream {
                key: key.to_string(),
                source,
            })?;
        let (body, mut faults) = MonitoredStream::new(body, metadata.content_length);

        let request = PutObjectRequest {
            bucket: self.destination_bucket.clone(),
            key: key.to_string(),
            body: Box::pin(body),
            content_length: metadata.content_length,
            content_type: metadata.content_type.clone(),
            metadata: metadata.user_metadata.clone(),
            tagging: metadata.tagging(),
        };
        let written = self.destination.put_object(request).await;

        if let Ok(fault) = faults.try_recv() {
            warn!(key = %key, error = %fault, "Source stream failed, abandoning destination write");
            return Err(TransferError::Stream {
                key: key.to_string(),
                source: fault,
            });
        }

        let output = written.map_err(|source| TransferError::DestinationWrite {
            key: key.to_string(),
            source,
        })?;

        integrity::verify(&metadata.digest, &output.digest).map_err(|source| {
            metrics::record_integrity_mismatch();
            TransferError::Integrity {
                key: key.to_string(),
                source,
            }
        })?;

        metrics::record_object_replicated(metadata.content_length, started.elapsed());
        debug!(
            key = %key,
            bytes = metadata.content_length,
            digest = %output.digest,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Object copied and verified"
        );
        Ok(())
    }

    /// Fetch head metadata and tags concurrently.
    async fn capture_metadata(
        &self,
        source_bucket: &str,
        key: &str,
    ) -> Result<ObjectMetadata, TransferError> {
        let (head, tags) = tokio::try_join!(
            self.source.head_object(source_bucket, key),
            self.source.get_object_tags(source_bucket, key),
        )
        .map_err(|source| TransferError::SourceRead {
            key: key.to_string(),
            source,
        })?;

        trace!(
            key = %key,
            content_length = head.content_length,
            tags = tags.len(),
            digest = %head.digest,
            "Captured source snapshot"
        );
        Ok(ObjectMetadata::from_parts(head, tags))
    }
}

/// Source body wrapper that counts bytes and reports the first fault.
struct MonitoredStream {
    inner: ByteStream,
    expected_len: u64,
    received: u64,
    fault_tx: Option<oneshot::Sender<RealmError>>,
    done: bool,
}

impl MonitoredStream {
    fn new(inner: ByteStream, expected_len: u64) -> (Self, oneshot::Receiver<RealmError>) {
        let (fault_tx, fault_rx) = oneshot::channel();
        let stream = Self {
            inner,
            expected_len,
            received: 0,
            fault_tx: Some(fault_tx),
            done: false,
        };
        (stream, fault_rx)
    }

    fn fail(&mut self, err: RealmError) -> Poll<Option<RealmResult<Bytes>>> {
        self.done = true;
        if let Some(tx) = self.fault_tx.take() {
            let _ = tx.send(err.clone());
        }
        Poll::Ready(Some(Err(err)))
    }

    fn length_fault(&self) -> RealmError {
        RealmError::new(
            "BodyLengthMismatch",
            format!(
                "source body yielded {} bytes, expected {}",
                self.received, self.expected_len
            ),
        )
    }
}

impl Stream for MonitoredStream {
    type Item = RealmResult<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        match this.inner.poll_next_unpin(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(chunk))) => {
                this.received += chunk.len() as u64;
                if this.received > this.expected_len {
                    let fault = this.length_fault();
                    return this.fail(fault);
                }
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(err))) => this.fail(err),
            Poll::Ready(None) => {
                if this.received != this.expected_len {
                    let fault = this.length_fault();
                    return this.fail(fault);
                }
                this.done = true;
                Poll::Ready(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::realm::memory::{content_digest, InMemoryRealm};
    use crate::realm::{BoxFuture, ObjectHead, PutObjectOutput, Tag};
    use futures::stream;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn chunks(parts: Vec<RealmResult<Bytes>>) -> ByteStream {
        Box::pin(stream::iter(parts))
    }

    /// Source whose metadata is fine but whose body breaks after one chunk.
    struct BrokenBodySource(InMemoryRealm);

    impl SourceRealm for BrokenBodySource {
        fn head_object(&self, bucket: &str, key: &str) -> BoxFuture<'_, ObjectHead> {
            self.0.head_object(bucket, key)
        }

        fn get_object_tags(&self, bucket: &str, key: &str) -> BoxFuture<'_, Vec<Tag>> {
            self.0.get_object_tags(bucket, key)
        }

        fn get_object_stream(&self, _bucket: &str, _key: &str) -> BoxFuture<'_, ByteStream> {
            Box::pin(async {
                Ok(chunks(vec![
                    Ok(Bytes::from_static(b"hel")),
                    Err(RealmError::new("RequestTimeout", "connection reset")),
                ]))
            })
        }
    }

    /// Source whose head and tag calls both wait on one barrier, so neither
    /// completes unless the other is in flight at the same time.
    struct RendezvousSource {
        inner: InMemoryRealm,
        barrier: tokio::sync::Barrier,
    }

    impl SourceRealm for RendezvousSource {
        fn head_object(&self, bucket: &str, key: &str) -> BoxFuture<'_, ObjectHead> {
            let (bucket, key) = (bucket.to_string(), key.to_string());
            Box::pin(async move {
                self.barrier.wait().await;
                self.inner.head_object(&bucket, &key).await
            })
        }

        fn get_object_tags(&self, bucket: &str, key: &str) -> BoxFuture<'_, Vec<Tag>> {
            let (bucket, key) = (bucket.to_string(), key.to_string());
            Box::pin(async move {
                self.barrier.wait().await;
                self.inner.get_object_tags(&bucket, &key).await
            })
        }

        fn get_object_stream(&self, bucket: &str, key: &str) -> BoxFuture<'_, ByteStream> {
            self.inner.get_object_stream(bucket, key)
        }
    }

    /// Destination that swallows the body and reports a fixed digest.
    struct FixedDigestDestination(&'static str);

    impl DestinationRealm for FixedDigestDestination {
        fn put_object(&self, request: PutObjectRequest) -> BoxFuture<'_, PutObjectOutput> {
            Box::pin(async move {
                let _: Vec<_> = request.body.collect().await;
                Ok(PutObjectOutput { digest: self.0.to_string() })
            })
        }

        fn delete_object(&self, _bucket: &str, _key: &str) -> BoxFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }
    }

    async fn seeded_source() -> InMemoryRealm {
        let source = InMemoryRealm::with_chunk_size("source", 2);
        source
            .insert(
                "src",
                "dir/file.txt",
                &b"hello"[..],
                "text/plain",
                BTreeMap::from([("owner".to_string(), "ops".to_string())]),
                vec![Tag::new("env", "prod"), Tag::new("a b", "c&d")],
            )
            .await;
        source
    }

    #[tokio::test]
    async fn test_transfer_copies_body_metadata_and_tags() {
        let source = Arc::new(seeded_source().await);
        let destination = Arc::new(InMemoryRealm::new("destination"));
        let transfer = ObjectTransfer::new(source, destination.clone(), "dst");

        transfer.transfer("src", "dir/file.txt").await.unwrap();

        let stored = destination.get("dst", "dir/file.txt").await.unwrap();
        assert_eq!(&stored.body[..], b"hello");
        assert_eq!(stored.content_type, "text/plain");
        assert_eq!(stored.metadata["owner"], "ops");
        assert_eq!(stored.tags, vec![Tag::new("env", "prod"), Tag::new("a b", "c&d")]);
        assert_eq!(stored.digest, content_digest(b"hello"));
    }

    #[tokio::test]
    async fn test_head_and_tags_are_fetched_concurrently() {
        let source = Arc::new(RendezvousSource {
            inner: seeded_source().await,
            barrier: tokio::sync::Barrier::new(2),
        });
        let destination = Arc::new(InMemoryRealm::new("destination"));
        let transfer = ObjectTransfer::new(source, destination.clone(), "dst");

        // Sequential fetches would park forever on the barrier
        tokio::time::timeout(Duration::from_secs(5), transfer.transfer("src", "dir/file.txt"))
            .await
            .expect("head and tags were not in flight together")
            .unwrap();
        assert!(destination.contains("dst", "dir/file.txt").await);
    }

    #[tokio::test]
    async fn test_missing_source_object_is_source_read_error() {
        let source = Arc::new(InMemoryRealm::new("source"));
        let destination = Arc::new(InMemoryRealm::new("destination"));
        let transfer = ObjectTransfer::new(source, destination.clone(), "dst");

        let err = transfer.transfer("src", "ghost").await.unwrap_err();
        assert!(matches!(err, TransferError::SourceRead { .. }));
        assert_eq!(err.status_code(), Some("NoSuchKey"));
        assert!(destination.is_empty().await);
    }

    #[tokio::test]
    async fn test_stream_error_wins_over_destination_error() {
        let source = Arc::new(BrokenBodySource(seeded_source().await));
        let destination = Arc::new(InMemoryRealm::new("destination"));
        let transfer = ObjectTransfer::new(source, destination.clone(), "dst");

        let err = transfer.transfer("src", "dir/file.txt").await.unwrap_err();
        match err {
            TransferError::Stream { key, source } => {
                assert_eq!(key, "dir/file.txt");
                assert_eq!(source.code, "RequestTimeout");
            }
            other => panic!("expected stream error, got {other:?}"),
        }
        assert!(destination.is_empty().await);
    }

    #[tokio::test]
    async fn test_digest_mismatch_is_integrity_error() {
        let source = Arc::new(seeded_source().await);
        let destination = Arc::new(FixedDigestDestination("not-the-digest"));
        let transfer = ObjectTransfer::new(source, destination, "dst");

        let err = transfer.transfer("src", "dir/file.txt").await.unwrap_err();
        match err {
            TransferError::Integrity { source, .. } => {
                assert_eq!(source.expected, content_digest(b"hello"));
                assert_eq!(source.actual, "not-the-digest");
            }
            other => panic!("expected integrity error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_monitored_stream_passes_exact_body() {
        let (stream, mut faults) = MonitoredStream::new(
            chunks(vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"c"))]),
            3,
        );
        let collected: Vec<_> = stream.collect().await;
        assert_eq!(collected.len(), 2);
        assert!(collected.iter().all(|c| c.is_ok()));
        assert!(faults.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_monitored_stream_reports_short_body() {
        let (stream, mut faults) = MonitoredStream::new(chunks(vec![Ok(Bytes::from_static(b"ab"))]), 5);
        let collected: Vec<_> = stream.collect().await;
        assert!(collected.last().unwrap().is_err());
        assert_eq!(faults.try_recv().unwrap().code, "BodyLengthMismatch");
    }

    #[tokio::test]
    async fn test_monitored_stream_reports_long_body() {
        let (stream, mut faults) = MonitoredStream::new(
            chunks(vec![Ok(Bytes::from_static(b"ab")), Ok(Bytes::from_static(b"cd"))]),
            3,
        );
        let collected: Vec<_> = stream.collect().await;
        assert_eq!(collected.len(), 2);
        assert!(collected[1].is_err());
        assert_eq!(faults.try_recv().unwrap().code, "BodyLengthMismatch");
    }

    #[tokio::test]
    async fn test_monitored_stream_stops_after_fault() {
        let (stream, mut faults) = MonitoredStream::new(
            chunks(vec![
                Err(RealmError::new("InternalError", "boom")),
                Ok(Bytes::from_static(b"never")),
            ]),
            5,
        );
        let collected: Vec<_> = stream.collect().await;
        assert_eq!(collected.len(), 1);
        assert_eq!(faults.try_recv().unwrap().code, "InternalError");
    }
}
