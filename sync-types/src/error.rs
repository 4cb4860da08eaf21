//! Error types for tandem-sync.

use thiserror::Error;

/// Errors that can occur in tandem-sync data handling.
#[derive(Debug, Error)]
pub enum SyncError {
    /// MessagePack serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] rmp_serde::encode::Error),

    /// MessagePack deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] rmp_serde::decode::Error),

    /// Interval outside the accepted 1..=60 minute range
    #[error("interval out of range: {0} (expected 1..=60 minutes)")]
    IntervalOutOfRange(i64),
}
