// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Configuration for the replicator.
//!
//! Configuration is loaded once at process start, either from the environment
//! ([`ReplicationConfig::from_env`]) or deserialized from JSON, and is then
//! shared read-only by every invocation.
//!
//! # Configuration Structure
//!
//! ```text
//! ReplicationConfig
//! ├── destination: DestinationConfig
//! │   ├── region: String              # Destination realm region
//! │   ├── bucket: String              # Fixed destination bucket
//! │   └── credentials: RealmCredentials
//! └── retry: RetryConfig              # Attempt budget + backoff step
//! ```
//!
//! # Environment
//!
//! | Variable | Required | Meaning |
//! |----------|----------|---------|
//! | `DESTINATION_REGION` | yes | Destination region identifier |
//! | `DESTINATION_BUCKET` | yes | Destination bucket name |
//! | `DESTINATION_CREDENTIALS` | yes | `access_key_id:secret_access_key` |
//! | `REPLICATION_MAX_ATTEMPTS` | no | Attempt budget (default 5) |
//! | `REPLICATION_BACKOFF_STEP_MS` | no | Linear backoff step (default 3000) |

use crate::error::{ReplicationError, Result};
use crate::resilience::RetryConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const ENV_DESTINATION_REGION: &str = "DESTINATION_REGION";
pub const ENV_DESTINATION_BUCKET: &str = "DESTINATION_BUCKET";
pub const ENV_DESTINATION_CREDENTIALS: &str = "DESTINATION_CREDENTIALS";
pub const ENV_MAX_ATTEMPTS: &str = "REPLICATION_MAX_ATTEMPTS";
pub const ENV_BACKOFF_STEP_MS: &str = "REPLICATION_BACKOFF_STEP_MS";

// ═══════════════════════════════════════════════════════════════════════════════
// Top-level config
// ═══════════════════════════════════════════════════════════════════════════════

/// The top-level config object passed to [`Replicator::new()`](crate::Replicator::new).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Where replicas are written.
    pub destination: DestinationConfig,

    /// Transfer attempt budget and backoff.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl ReplicationConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ReplicationError::Config(format!("{} is not set", name)))
        };

        let credentials = RealmCredentials::parse(&required(ENV_DESTINATION_CREDENTIALS)?)?;
        let mut retry = RetryConfig::default();
        if let Some(raw) = lookup(ENV_MAX_ATTEMPTS) {
            retry.max_attempts = parse_var(ENV_MAX_ATTEMPTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_BACKOFF_STEP_MS) {
            retry.backoff_step_ms = parse_var(ENV_BACKOFF_STEP_MS, &raw)?;
        }

        let config = Self {
            destination: DestinationConfig {
                region: required(ENV_DESTINATION_REGION)?,
                bucket: required(ENV_DESTINATION_BUCKET)?,
                credentials,
            },
            retry,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document into a validated config.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| ReplicationError::Config(format!("invalid JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.destination.region.trim().is_empty() {
            return Err(ReplicationError::Config("destination region is empty".into()));
        }
        if self.destination.bucket.trim().is_empty() {
            return Err(ReplicationError::Config("destination bucket is empty".into()));
        }
        if self.destination.credentials.access_key_id.is_empty() {
            return Err(ReplicationError::Config("destination access key id is empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ReplicationError::Config("max_attempts must be at least 1".into()));
        }
        Ok(())
    }

    /// Create a minimal config for testing.
    pub fn for_testing(bucket: &str) -> Self {
        Self {
            destination: DestinationConfig {
                region: "test-region-1".to_string(),
                bucket: bucket.to_string(),
                credentials: RealmCredentials::new("TESTKEY", "testsecret"),
            },
            retry: RetryConfig::testing(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, raw: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ReplicationError::Config(format!("{} = {:?}: {}", name, raw, e)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Destination realm
// ═══════════════════════════════════════════════════════════════════════════════

/// The destination realm: a different region with its own identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub region: String,
    pub bucket: String,
    pub credentials: RealmCredentials,
}

/// Explicit identity for a storage realm.
///
/// The source realm uses the ambient identity of the process; only the
/// destination carries explicit credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealmCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl RealmCredentials {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// Parse a `id:secret` pair delivered as one secret string.
    ///
    /// Splits on the first colon only; the secret keeps any further colons.
    /// Stricter than a bare first-colon split: input with no colon, or with
    /// an empty id, is rejected instead of producing an empty access key id.
    pub fn parse(raw: &str) -> Result<Self> {
        let (id, secret) = raw.split_once(':').ok_or_else(|| {
            ReplicationError::Config("credentials must be formatted as id:secret".into())
        })?;
        if id.is_empty() {
            return Err(ReplicationError::Config("credentials have an empty access key id".into()));
        }
        Ok(Self::new(id, secret))
    }
}

impl std::fmt::Debug for RealmCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealmCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}
