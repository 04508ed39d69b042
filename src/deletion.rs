//! Deletion propagation to the destination realm.
//!
//! A single delete call against the fixed destination bucket. No retry layer:
//! a failure propagates immediately. Deleting an absent key is already a
//! success at the realm level, so nothing extra is done for idempotence.

use crate::error::DeleteError;
use crate::metrics;
use crate::realm::DestinationRealm;
use std::sync::Arc;
use tracing::{error, info, instrument};

pub struct DeletionPropagator<D> {
    destination: Arc<D>,
    destination_bucket: String,
}

impl<D: DestinationRealm> DeletionPropagator<D> {
    pub fn new(destination: Arc<D>, destination_bucket: impl Into<String>) -> Self {
        Self {
            destination,
            destination_bucket: destination_bucket.into(),
        }
    }

    #[instrument(skip(self), fields(destination_bucket = %self.destination_bucket))]
    pub async fn propagate_delete(&self, key: &str) -> Result<(), DeleteError> {
        match self.destination.delete_object(&self.destination_bucket, key).await {
            Ok(()) => {
                metrics::record_delete(true);
                info!(key = %key, "Deleted replica");
                Ok(())
            }
            Err(source) => {
                metrics::record_delete(false);
                error!(key = %key, error = %source, "Failed to delete replica");
                Err(DeleteError {
                    key: key.to_string(),
                    source,
                })
            }
        }
    }
}
