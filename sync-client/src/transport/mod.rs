//! Transport abstraction for tandem-sync.
//!
//! The transport is the platform session that connects the two endpoints.
//! It is not request/response: the endpoint asks for activation and hands
//! over context updates, and the transport reports lifecycle changes back as
//! [`LinkEvent`]s on a channel.
//!
//! # Design
//!
//! - `activate()` requests activation; completion arrives later as
//!   [`LinkEvent::ActivationCompleted`]
//! - `update_context()` replaces the context delivered to the counterpart
//!   (most-recent-wins, not a queue)
//! - `counterpart()` reports pairing, installation and reachability
//!
//! [`pump_link_events`] drains the event channel into a [`LinkDelegate`] one
//! event at a time, so callbacks never interleave.
//!
//! # Example
//!
//! ```ignore
//! let ((primary_link, primary_events), (companion_link, companion_events)) = LoopbackLink::pair();
//! let primary = Arc::new(Synchronizer::new(Role::Primary, MemoryStore::new(), primary_link));
//! tokio::spawn(pump_link_events(primary_events, Arc::clone(&primary)));
//! primary.initialize().await;
//! ```

mod loopback;
mod mock;

pub use loopback::LoopbackLink;
pub use mock::MockLink;

use std::sync::Arc;

use async_trait::async_trait;
use tandem_sync_types::CounterpartStatus;
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport errors.
///
/// Classified structurally so callers can tell an absent counterpart apart
/// from a real failure without inspecting message text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The session is not activated.
    #[error("session not activated")]
    NotActivated,

    /// No counterpart device is paired.
    #[error("counterpart not paired")]
    NotPaired,

    /// The counterpart application is not installed.
    #[error("counterpart application not installed")]
    CounterpartNotInstalled,

    /// The counterpart cannot be reached right now.
    #[error("counterpart unreachable")]
    Unreachable,

    /// Activation could not be started.
    #[error("activation failed: {0}")]
    ActivationFailed(String),

    /// The transport failed to accept the update.
    #[error("transmission failed: {0}")]
    Transmission(String),
}

impl LinkError {
    /// Whether this error only means the counterpart is not available yet.
    ///
    /// These are expected conditions, retried on the next lifecycle signal
    /// and not reported as failures.
    pub fn is_expected_unavailability(&self) -> bool {
        matches!(
            self,
            Self::NotActivated | Self::NotPaired | Self::CounterpartNotInstalled | Self::Unreachable
        )
    }
}

/// Lifecycle notifications reported by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Activation finished, successfully or with an error message.
    ActivationCompleted(Result<(), String>),
    /// The session is about to deactivate.
    BecameInactive,
    /// The session was deactivated (e.g. the counterpart device changed).
    Deactivated,
    /// Counterpart reachability changed.
    ReachabilityChanged(bool),
    /// Counterpart application install state changed.
    InstalledChanged(bool),
    /// A context payload arrived from the counterpart.
    ContextReceived(Vec<u8>),
}

/// Transport trait for the session between the two endpoints.
///
/// Implementations wrap the platform session (or a loopback/mock in tests).
#[async_trait]
pub trait TransportLink: Send + Sync {
    /// Request activation of the session.
    ///
    /// Returning `Ok` only means the request was accepted; the outcome is
    /// reported as [`LinkEvent::ActivationCompleted`].
    async fn activate(&self) -> Result<(), LinkError>;

    /// Replace the context delivered to the counterpart.
    ///
    /// `Ok` means the transport accepted the payload for delivery. A newer
    /// payload supersedes an undelivered older one.
    async fn update_context(&self, payload: &[u8]) -> Result<(), LinkError>;

    /// Current view of the counterpart.
    fn counterpart(&self) -> CounterpartStatus;
}

/// Callbacks an endpoint registers to receive transport lifecycle changes.
#[async_trait]
pub trait LinkDelegate: Send + Sync {
    /// Activation finished.
    async fn on_activation_complete(&self, result: Result<(), String>);

    /// The session is about to deactivate.
    async fn on_became_inactive(&self);

    /// The session was deactivated.
    async fn on_deactivated(&self);

    /// Counterpart reachability changed.
    async fn on_reachability_changed(&self, reachable: bool);

    /// Counterpart application install state changed.
    async fn on_installed_changed(&self, installed: bool);

    /// A context payload arrived.
    async fn on_context_received(&self, payload: Vec<u8>);
}

/// Route one event to the matching delegate callback.
pub async fn dispatch<D: LinkDelegate + ?Sized>(delegate: &D, event: LinkEvent) {
    match event {
        LinkEvent::ActivationCompleted(result) => delegate.on_activation_complete(result).await,
        LinkEvent::BecameInactive => delegate.on_became_inactive().await,
        LinkEvent::Deactivated => delegate.on_deactivated().await,
        LinkEvent::ReachabilityChanged(reachable) => {
            delegate.on_reachability_changed(reachable).await
        }
        LinkEvent::InstalledChanged(installed) => delegate.on_installed_changed(installed).await,
        LinkEvent::ContextReceived(payload) => delegate.on_context_received(payload).await,
    }
}

/// Drain transport events into a delegate, in order, until the channel closes.
pub async fn pump_link_events<D: LinkDelegate + ?Sized>(
    mut events: mpsc::UnboundedReceiver<LinkEvent>,
    delegate: Arc<D>,
) {
    while let Some(event) = events.recv().await {
        dispatch(delegate.as_ref(), event).await;
    }
    tracing::debug!("Link event channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl LinkDelegate for Recorder {
        async fn on_activation_complete(&self, result: Result<(), String>) {
            self.record(format!("activation:{}", result.is_ok()));
        }
        async fn on_became_inactive(&self) {
            self.record("inactive".into());
        }
        async fn on_deactivated(&self) {
            self.record("deactivated".into());
        }
        async fn on_reachability_changed(&self, reachable: bool) {
            self.record(format!("reachable:{reachable}"));
        }
        async fn on_installed_changed(&self, installed: bool) {
            self.record(format!("installed:{installed}"));
        }
        async fn on_context_received(&self, payload: Vec<u8>) {
            self.record(format!("context:{}", payload.len()));
        }
    }

    #[test]
    fn unavailability_is_classified_structurally() {
        assert!(LinkError::NotActivated.is_expected_unavailability());
        assert!(LinkError::NotPaired.is_expected_unavailability());
        assert!(LinkError::CounterpartNotInstalled.is_expected_unavailability());
        assert!(LinkError::Unreachable.is_expected_unavailability());
        assert!(!LinkError::Transmission("payload too large".into()).is_expected_unavailability());
        assert!(!LinkError::ActivationFailed("unsupported".into()).is_expected_unavailability());
    }

    #[tokio::test]
    async fn pump_dispatches_in_order_until_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        let recorder = Arc::new(Recorder::default());

        tx.send(LinkEvent::ActivationCompleted(Ok(()))).unwrap();
        tx.send(LinkEvent::ReachabilityChanged(true)).unwrap();
        tx.send(LinkEvent::InstalledChanged(false)).unwrap();
        tx.send(LinkEvent::ContextReceived(vec![1, 2, 3])).unwrap();
        tx.send(LinkEvent::BecameInactive).unwrap();
        tx.send(LinkEvent::Deactivated).unwrap();
        drop(tx);

        pump_link_events(rx, Arc::clone(&recorder)).await;

        let calls = recorder.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                "activation:true",
                "reachable:true",
                "installed:false",
                "context:3",
                "inactive",
                "deactivated",
            ]
        );
    }
}
