// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replication dispatcher.
//!
//! The entry point the embedding process calls once per notification. It ties
//! together:
//! - Notification parsing via [`crate::event::parse_envelope`]
//! - The copy path: [`crate::retry::RetryController`] driving
//!   [`crate::transfer::ObjectTransfer`]
//! - The delete path: [`crate::deletion::DeletionPropagator`]
//!
//! Exactly one path runs per descriptor. Realm clients and configuration are
//! built once at process start and shared read-only by every invocation.

use crate::config::ReplicationConfig;
use crate::deletion::DeletionPropagator;
use crate::error::{ErrorResponse, ReplicationError, Result, TerminalError};
use crate::event::{parse_envelope, ChangeDescriptor};
use crate::metrics;
use crate::realm::{DestinationRealm, SourceRealm};
use crate::retry::RetryController;
use crate::transfer::ObjectTransfer;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Replicates source-realm changes into the destination realm.
///
/// # Example
///
/// ```rust,no_run
/// use bucket_replicator::{InMemoryRealm, ReplicationConfig, Replicator};
/// use std::sync::Arc;
///
/// # async fn example(payload: &str) -> Result<(), Box<dyn std::error::Error>> {
/// let config = ReplicationConfig::from_env()?;
/// let source = Arc::new(InMemoryRealm::new("source"));
/// let destination = Arc::new(InMemoryRealm::new("destination"));
/// let replicator = Replicator::new(config, source, destination)?;
///
/// // One call per incoming notification
/// replicator.handle_notification(payload).await?;
/// # Ok(())
/// # }
/// ```
pub struct Replicator<S, D> {
    config: Arc<ReplicationConfig>,
    transfer: ObjectTransfer<S, D>,
    deletion: DeletionPropagator<D>,
    retry: RetryController,
}

impl<S: SourceRealm, D: DestinationRealm> Replicator<S, D> {
    /// Build a replicator over already-constructed realm clients.
    ///
    /// The config is validated here; nothing is re-derived per invocation.
    pub fn new(config: ReplicationConfig, source: Arc<S>, destination: Arc<D>) -> Result<Self> {
        config.validate()?;
        let bucket = config.destination.bucket.clone();
        info!(
            destination_region = %config.destination.region,
            destination_bucket = %bucket,
            max_attempts = config.retry.max_attempts,
            "Replicator initialized"
        );

        Ok(Self {
            transfer: ObjectTransfer::new(source, Arc::clone(&destination), bucket.clone()),
            deletion: DeletionPropagator::new(destination, bucket),
            retry: RetryController::new(config.retry.clone()),
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    /// Route one descriptor to the copy or delete path.
    ///
    /// Errors from the chosen path are propagated unchanged.
    #[instrument(
        skip(self, descriptor),
        fields(
            event = %descriptor.event_name,
            bucket = %descriptor.source_bucket,
            key = %descriptor.object_key
        )
    )]
    pub async fn dispatch(&self, descriptor: &ChangeDescriptor) -> Result<()> {
        info!(
            kind = %descriptor.event_kind,
            "Processing {}/{}", descriptor.source_bucket, descriptor.object_key
        );
        metrics::record_event_received(descriptor.event_kind.as_str());

        if descriptor.event_kind.is_removal() {
            self.deletion.propagate_delete(&descriptor.object_key).await?;
        } else {
            self.replicate(&descriptor.source_bucket, &descriptor.object_key)
                .await?;
        }
        Ok(())
    }

    /// Copy one object under the retry policy. Returns the attempts used.
    pub async fn replicate(&self, source_bucket: &str, key: &str) -> std::result::Result<u32, TerminalError> {
        self.retry
            .run(key, |_attempt| self.transfer.transfer(source_bucket, key))
            .await
    }

    /// Handle one raw notification payload.
    ///
    /// Every storage record in the envelope is dispatched in order. All
    /// records are attempted even after a failure, including a sibling record
    /// that could not be parsed; the first failure is returned as the
    /// structured response and every failure is logged. Returns the number of
    /// records processed.
    pub async fn handle_notification(&self, payload: &str) -> std::result::Result<usize, ErrorResponse> {
        let records = parse_envelope(payload).map_err(|e| self.surface("event", e))?;

        let processed = records.len();
        let mut first_failure = None;
        for record in records {
            let outcome = match record {
                Ok(descriptor) => {
                    let path = if descriptor.event_kind.is_removal() { "delete" } else { "copy" };
                    self.dispatch(&descriptor).await.map_err(|e| (path, e))
                }
                Err(e) => Err(("event", e)),
            };
            if let Err((path, e)) = outcome {
                let response = self.surface(path, e);
                first_failure.get_or_insert(response);
            }
        }

        match first_failure {
            Some(response) => Err(response),
            None => Ok(processed),
        }
    }

    fn surface(&self, path: &str, e: ReplicationError) -> ErrorResponse {
        let response = e.to_response();
        metrics::record_terminal_failure(path);
        error!(
            path,
            key = %response.key,
            status_code = response.status_code.as_deref().unwrap_or("none"),
            error = %e,
            response = %response.to_json(),
            "Replication failed"
        );
        response
    }
}
