//! # Bucket Replicator
//!
//! Replicates objects from a source bucket into a destination bucket that
//! lives in a different storage realm (region/endpoint plus credential set),
//! driven by change notifications on the source.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                            bucket-replicator                             │
//! │                                                                          │
//! │  notification ──► parse_envelope ──► Replicator::dispatch                │
//! │                                        │                                 │
//! │                 ObjectRemoved:*  ◄─────┴─────►  anything else            │
//! │                        │                             │                   │
//! │                        ▼                             ▼                   │
//! │              ┌───────────────────┐        ┌─────────────────────┐        │
//! │              │ DeletionPropagator│        │ RetryController     │        │
//! │              │ (single attempt)  │        │ (n * 3s backoff)    │        │
//! │              └───────────────────┘        └─────────┬───────────┘        │
//! │                                                     ▼                    │
//! │                                           ┌─────────────────────┐        │
//! │                                           │ ObjectTransfer      │        │
//! │                                           │ head+tags ─► stream │        │
//! │                                           │ ─► put ─► verify    │        │
//! │                                           └─────────────────────┘        │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Unrecoverable failures leave [`Replicator::handle_notification`] as an
//! [`ErrorResponse`] serialized as `{statusCode, key, body}`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bucket_replicator::{InMemoryRealm, ReplicationConfig, Replicator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ReplicationConfig::from_env().expect("invalid configuration");
//!     let source = Arc::new(InMemoryRealm::new("source"));
//!     let destination = Arc::new(InMemoryRealm::new("destination"));
//!     let replicator = Replicator::new(config, source, destination).expect("Failed to start");
//!
//!     let payload = r#"{"Records":[{"eventName":"ObjectCreated:Put","s3":{"bucket":{"name":"src"},"object":{"key":"a.txt"}}}]}"#;
//!     if let Err(response) = replicator.handle_notification(payload).await {
//!         eprintln!("{}", response.to_json());
//!     }
//! }
//! ```

pub mod config;
pub mod deletion;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod integrity;
pub mod metrics;
pub mod realm;
pub mod resilience;
pub mod retry;
pub mod transfer;

// Re-exports for convenience
pub use config::{DestinationConfig, RealmCredentials, ReplicationConfig};
pub use dispatcher::Replicator;
pub use error::{
    DeleteError, ErrorResponse, IntegrityError, RealmError, ReplicationError, Result,
    TerminalError, TransferError,
};
pub use event::{ChangeDescriptor, EventKind};
pub use realm::memory::InMemoryRealm;
pub use realm::{DestinationRealm, ObjectMetadata, SourceRealm, Tag};
pub use resilience::RetryConfig;
