//! Copy integrity verification.
//!
//! Digests are opaque realm-issued tokens. Comparison is exact: no case
//! folding, no quote stripping, no recomputation on our side.

use crate::error::IntegrityError;

/// Check that the destination stored exactly what the source snapshot held.
pub fn verify(expected: &str, actual: &str) -> Result<(), IntegrityError> {
    if expected == actual {
        Ok(())
    } else {
        Err(IntegrityError {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}
