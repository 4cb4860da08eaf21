//! # sync-types
//!
//! Data types shared by every tandem-sync crate:
//! - [`IntervalMinutes`] - the synchronized setting (minutes between crossings)
//! - [`ContextPayload`] - the most-recent-wins context exchanged between endpoints
//! - [`Role`], [`CounterpartStatus`] - endpoint identity and counterpart visibility
//! - [`SyncError`] - error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod endpoint;
mod error;
mod interval;
mod payload;

pub use endpoint::{CounterpartStatus, Role};
pub use error::SyncError;
pub use interval::IntervalMinutes;
pub use payload::{ContextPayload, INTERVAL_KEY};
