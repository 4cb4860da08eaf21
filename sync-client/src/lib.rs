//! # sync-client
//!
//! Endpoint runtime for tandem-sync.
//!
//! This crate wires the pure state machines from `sync-core` to storage, a
//! transport and a tokio clock.
//!
//! ## Features
//!
//! - **Synchronizer**: keeps the interval equal on both endpoints with echo
//!   suppression and pending-sync retry
//! - **TimerEngine**: pause/resume timer emitting interval crossings
//! - **Transport Abstraction**: pluggable link (loopback, mock)
//! - **Pulse Output**: crossings played as spaced pulses
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tandem_sync_client::{
//!     pump_link_events, LoopbackLink, MemoryStore, Synchronizer, TimerEngine,
//! };
//! use tandem_sync_types::Role;
//!
//! let ((link, events), _companion) = LoopbackLink::pair();
//! let sync = Arc::new(Synchronizer::new(Role::Primary, MemoryStore::new(), link));
//! tokio::spawn(pump_link_events(events, Arc::clone(&sync)));
//! sync.initialize().await;
//!
//! let timer = TimerEngine::new(sync.subscribe());
//! timer.start().await;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod pulse;
pub mod store;
pub mod synchronizer;
pub mod timer;
pub mod transport;

pub use pulse::{spawn_pulse_forwarder, EventSink, PulseConfig, PulseDevice, PulseSequencer};
pub use store::{FileStore, MemoryStore, SettingStore, StoreError};
pub use synchronizer::Synchronizer;
pub use timer::{
    BackgroundExtension, ExtensionUnavailable, NoExtension, TimerConfig, TimerEngine,
    TimerSnapshot,
};
pub use transport::{
    pump_link_events, LinkDelegate, LinkError, LinkEvent, LoopbackLink, MockLink, TransportLink,
};
