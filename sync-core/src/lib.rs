//! # sync-core
//!
//! Pure logic for tandem-sync (no I/O, instant tests).
//!
//! This crate implements the state machines behind the settings
//! synchronizer and the interval timer without any transport, disk or clock
//! access of its own. Callers pass in the current instant and the
//! counterpart status, and execute the returned actions.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects. This enables:
//! - Instant unit tests (no mocks, no async)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (transport, persistence, scheduling) is performed by
//! `sync-client`, which interprets the actions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod format;
pub mod link;
pub mod settings;
pub mod timer;

pub use format::format_elapsed;
pub use link::{LinkSignal, LinkState};
pub use settings::{Action, DeferReason, Event, SyncState};
pub use timer::{crossing_index, Crossing, TimerState};
