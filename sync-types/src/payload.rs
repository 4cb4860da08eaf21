//! Context payload exchanged between the two endpoints.
//!
//! The transport treats the payload as opaque bytes and delivers it with
//! most-recent-wins semantics: a newer payload supersedes any undelivered one.

use serde::{Deserialize, Serialize};

use crate::{IntervalMinutes, SyncError};

/// Key under which the interval travels and is persisted.
pub const INTERVAL_KEY: &str = "hapticIntervalMinutes";

/// Single-key context mapping `{ "hapticIntervalMinutes": <int> }`.
///
/// The value is kept raw so that a counterpart sending an out-of-range value
/// can be decoded and then rejected by the receiver instead of failing to
/// decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPayload {
    /// Minutes between crossings, unvalidated.
    #[serde(rename = "hapticIntervalMinutes")]
    pub interval_minutes: i64,
}

impl ContextPayload {
    /// Build the payload announcing a local value.
    pub fn new(interval: IntervalMinutes) -> Self {
        Self {
            interval_minutes: i64::from(interval),
        }
    }

    /// Build a payload from an arbitrary raw value.
    pub fn raw(interval_minutes: i64) -> Self {
        Self { interval_minutes }
    }

    /// Validate the carried value.
    pub fn interval(&self) -> Result<IntervalMinutes, SyncError> {
        IntervalMinutes::new(self.interval_minutes)
    }

    /// Serialize to MessagePack bytes (map encoding, so the key is on the wire).
    pub fn to_bytes(&self) -> Result<Vec<u8>, SyncError> {
        rmp_serde::to_vec_named(self).map_err(SyncError::Serialization)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SyncError> {
        rmp_serde::from_slice(bytes).map_err(SyncError::Deserialization)
    }
}
