//! Shared test utilities for integration and chaos tests.
//!
//! This module provides:
//! - Recording source/destination realms with fault injection
//! - Notification payload builders

pub mod mock_realm;

pub use mock_realm::*;

use serde_json::json;

/// A pub/sub-wrapped notification carrying the given storage records.
#[allow(dead_code)]
pub fn notification(records: &[(&str, &str, &str)]) -> String {
    let records: Vec<_> = records
        .iter()
        .map(|(event, bucket, key)| {
            json!({
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "eventName": event,
                "s3": {
                    "bucket": { "name": bucket },
                    "object": { "key": key }
                }
            })
        })
        .collect();
    let message = json!({ "Records": records }).to_string();
    json!({
        "Records": [{
            "EventSource": "aws:sns",
            "Sns": { "Type": "Notification", "Message": message }
        }]
    })
    .to_string()
}
