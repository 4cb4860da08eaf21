//! In-process paired transport.
//!
//! Connects a primary and a companion endpoint inside one process and
//! reproduces the session behaviors the synchronizer depends on:
//! activation completes asynchronously, contexts are held most-recent-wins
//! while the counterpart is unreachable or not activated, and reachability,
//! installation and deactivation changes are reported as events.

use super::{LinkError, LinkEvent, TransportLink};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tandem_sync_types::{CounterpartStatus, Role};
use tokio::sync::mpsc;

/// One end of a loopback pair.
#[derive(Debug, Clone)]
pub struct LoopbackLink {
    role: Role,
    shared: Arc<Mutex<Shared>>,
}

#[derive(Debug)]
struct Shared {
    primary: End,
    companion: End,
    /// Both ends can currently reach each other.
    connected: bool,
}

#[derive(Debug)]
struct End {
    events: mpsc::UnboundedSender<LinkEvent>,
    activated: bool,
    installed: bool,
    fail_activation: Option<String>,
    /// Latest context addressed to this end and not yet delivered.
    inbox: Option<Vec<u8>>,
    accepted: usize,
}

impl End {
    fn new(events: mpsc::UnboundedSender<LinkEvent>) -> Self {
        Self {
            events,
            activated: false,
            installed: true,
            fail_activation: None,
            inbox: None,
            accepted: 0,
        }
    }

    fn emit(&self, event: LinkEvent) {
        // A dropped receiver means the endpoint is gone; nothing to notify.
        let _ = self.events.send(event);
    }

    fn flush_inbox(&mut self, connected: bool) {
        if connected && self.activated {
            if let Some(payload) = self.inbox.take() {
                self.emit(LinkEvent::ContextReceived(payload));
            }
        }
    }
}

impl Shared {
    fn end_mut(&mut self, role: Role) -> &mut End {
        match role {
            Role::Primary => &mut self.primary,
            Role::Companion => &mut self.companion,
        }
    }

    fn end(&self, role: Role) -> &End {
        match role {
            Role::Primary => &self.primary,
            Role::Companion => &self.companion,
        }
    }
}

fn peer_of(role: Role) -> Role {
    match role {
        Role::Primary => Role::Companion,
        Role::Companion => Role::Primary,
    }
}

impl LoopbackLink {
    /// Create a connected pair: `(primary, companion)`, each with the
    /// receiver for its own lifecycle events.
    ///
    /// Both ends start unactivated and out of reach, with the companion
    /// application installed.
    #[allow(clippy::type_complexity)]
    pub fn pair() -> (
        (Self, mpsc::UnboundedReceiver<LinkEvent>),
        (Self, mpsc::UnboundedReceiver<LinkEvent>),
    ) {
        let (primary_tx, primary_rx) = mpsc::unbounded_channel();
        let (companion_tx, companion_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Mutex::new(Shared {
            primary: End::new(primary_tx),
            companion: End::new(companion_tx),
            connected: false,
        }));

        let primary = Self {
            role: Role::Primary,
            shared: Arc::clone(&shared),
        };
        let companion = Self {
            role: Role::Companion,
            shared,
        };
        ((primary, primary_rx), (companion, companion_rx))
    }

    /// Bring both ends in or out of reach of each other.
    ///
    /// Both ends are notified, and held contexts are delivered on connect.
    pub fn set_connected(&self, connected: bool) {
        let mut shared = self.lock();
        if shared.connected == connected {
            return;
        }
        shared.connected = connected;
        for role in [Role::Primary, Role::Companion] {
            let end = shared.end_mut(role);
            end.emit(LinkEvent::ReachabilityChanged(connected));
            end.flush_inbox(connected);
        }
    }

    /// Install or remove the companion application.
    ///
    /// Only the primary end observes install state.
    pub fn set_companion_installed(&self, installed: bool) {
        let mut shared = self.lock();
        if shared.companion.installed == installed {
            return;
        }
        shared.companion.installed = installed;
        shared.primary.emit(LinkEvent::InstalledChanged(installed));
    }

    /// Make the next activation of this end report an error.
    pub fn fail_next_activation(&self, error: &str) {
        self.lock().end_mut(self.role).fail_activation = Some(error.to_string());
    }

    /// Deactivate this end, as when the counterpart device is switched.
    pub fn deactivate(&self) {
        let mut shared = self.lock();
        let end = shared.end_mut(self.role);
        end.activated = false;
        end.emit(LinkEvent::BecameInactive);
        end.emit(LinkEvent::Deactivated);
    }

    /// Number of context updates this end has accepted.
    pub fn accepted_count(&self) -> usize {
        self.lock().end(self.role).accepted
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl TransportLink for LoopbackLink {
    async fn activate(&self) -> Result<(), LinkError> {
        let mut shared = self.lock();
        let connected = shared.connected;
        let end = shared.end_mut(self.role);

        if let Some(error) = end.fail_activation.take() {
            end.emit(LinkEvent::ActivationCompleted(Err(error)));
            return Ok(());
        }

        end.activated = true;
        end.emit(LinkEvent::ActivationCompleted(Ok(())));
        end.flush_inbox(connected);
        Ok(())
    }

    async fn update_context(&self, payload: &[u8]) -> Result<(), LinkError> {
        let mut shared = self.lock();
        if !shared.end(self.role).activated {
            return Err(LinkError::NotActivated);
        }

        let peer_role = peer_of(self.role);
        if !shared.end(peer_role).installed {
            return Err(LinkError::CounterpartNotInstalled);
        }

        shared.end_mut(self.role).accepted += 1;
        let connected = shared.connected;
        let peer = shared.end_mut(peer_role);
        peer.inbox = Some(payload.to_vec());
        peer.flush_inbox(connected);
        Ok(())
    }

    fn counterpart(&self) -> CounterpartStatus {
        let shared = self.lock();
        CounterpartStatus {
            paired: true,
            installed: shared.end(peer_of(self.role)).installed,
            reachable: shared.connected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<LinkEvent>) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn activation_reports_completion() {
        let ((primary, mut primary_rx), _) = LoopbackLink::pair();
        primary.activate().await.unwrap();
        assert_eq!(
            drain(&mut primary_rx),
            vec![LinkEvent::ActivationCompleted(Ok(()))]
        );
    }

    #[tokio::test]
    async fn failed_activation_is_reported_as_event() {
        let ((primary, mut primary_rx), _) = LoopbackLink::pair();
        primary.fail_next_activation("unsupported");
        primary.activate().await.unwrap();
        assert_eq!(
            drain(&mut primary_rx),
            vec![LinkEvent::ActivationCompleted(Err("unsupported".into()))]
        );
    }

    #[tokio::test]
    async fn update_requires_activation() {
        let ((primary, _), _) = LoopbackLink::pair();
        assert_eq!(
            primary.update_context(b"x").await,
            Err(LinkError::NotActivated)
        );
    }

    #[tokio::test]
    async fn context_is_held_until_reachable_and_latest_wins() {
        let ((primary, _primary_rx), (companion, mut companion_rx)) = LoopbackLink::pair();
        primary.activate().await.unwrap();
        companion.activate().await.unwrap();
        drain(&mut companion_rx);

        primary.update_context(b"first").await.unwrap();
        primary.update_context(b"second").await.unwrap();
        assert!(drain(&mut companion_rx).is_empty());
        assert_eq!(primary.accepted_count(), 2);

        primary.set_connected(true);
        assert_eq!(
            drain(&mut companion_rx),
            vec![
                LinkEvent::ReachabilityChanged(true),
                LinkEvent::ContextReceived(b"second".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn context_waits_for_peer_activation() {
        let ((primary, _primary_rx), (companion, mut companion_rx)) = LoopbackLink::pair();
        primary.set_connected(true);
        primary.activate().await.unwrap();
        primary.update_context(b"value").await.unwrap();
        assert_eq!(
            drain(&mut companion_rx),
            vec![LinkEvent::ReachabilityChanged(true)]
        );

        companion.activate().await.unwrap();
        assert_eq!(
            drain(&mut companion_rx),
            vec![
                LinkEvent::ActivationCompleted(Ok(())),
                LinkEvent::ContextReceived(b"value".to_vec()),
            ]
        );
    }

    #[tokio::test]
    async fn uninstalled_companion_rejects_updates() {
        let ((primary, mut primary_rx), _) = LoopbackLink::pair();
        primary.activate().await.unwrap();
        primary.set_companion_installed(false);
        assert_eq!(
            primary.update_context(b"x").await,
            Err(LinkError::CounterpartNotInstalled)
        );
        assert!(!primary.counterpart().installed);

        primary.set_companion_installed(true);
        assert!(drain(&mut primary_rx).contains(&LinkEvent::InstalledChanged(true)));
    }

    #[tokio::test]
    async fn deactivation_emits_inactive_then_deactivated() {
        let ((primary, mut primary_rx), _) = LoopbackLink::pair();
        primary.activate().await.unwrap();
        drain(&mut primary_rx);

        primary.deactivate();
        assert_eq!(
            drain(&mut primary_rx),
            vec![LinkEvent::BecameInactive, LinkEvent::Deactivated]
        );
        assert_eq!(
            primary.update_context(b"x").await,
            Err(LinkError::NotActivated)
        );
    }
}
