//! Synchronizer - keeps one endpoint's interval in step with its counterpart.
//!
//! The [`Synchronizer`] owns the canonical local value. It feeds every input
//! (user changes, transport callbacks, send outcomes) through the pure
//! [`SyncState`] machine from sync-core and performs the resulting actions
//! against the [`SettingStore`] and the [`TransportLink`].
//!
//! ```text
//! UI ──set_local_value──┐
//!                       ▼
//! LinkEvent ──pump──▶ Synchronizer ──▶ sync-core SyncState ──▶ Actions
//!                       │                                        │
//!                       ├── SettingStore (persist) ◀─────────────┤
//!                       ├── watch channel (publish) ◀────────────┤
//!                       └── TransportLink (activate, send) ◀─────┘
//! ```
//!
//! All state changes happen under a single async mutex, so UI commands and
//! transport callbacks arriving concurrently are applied one at a time.
//! Nothing here returns an error to the caller: an unavailable counterpart
//! leaves the update pending and it is retried on the next lifecycle signal.

use std::collections::VecDeque;

use async_trait::async_trait;
use tandem_sync_core::{Action, Event, LinkState, SyncState};
use tandem_sync_types::{ContextPayload, IntervalMinutes, Role, INTERVAL_KEY};
use tokio::sync::{watch, Mutex};

use crate::store::SettingStore;
use crate::transport::{LinkDelegate, TransportLink};

/// Settings synchronizer for one endpoint.
pub struct Synchronizer<S: SettingStore, L: TransportLink> {
    role: Role,
    store: S,
    link: L,
    state: Mutex<SyncState>,
    value_tx: watch::Sender<IntervalMinutes>,
}

impl<S: SettingStore, L: TransportLink> Synchronizer<S, L> {
    /// Create a synchronizer holding the default interval.
    ///
    /// Call [`initialize`](Self::initialize) to load the persisted value and
    /// activate the link.
    pub fn new(role: Role, store: S, link: L) -> Self {
        let (value_tx, _) = watch::channel(IntervalMinutes::DEFAULT);
        Self {
            role,
            store,
            link,
            state: Mutex::new(SyncState::new(role, IntervalMinutes::DEFAULT)),
            value_tx,
        }
    }

    /// Load the persisted interval and request link activation.
    ///
    /// A missing, non-positive or out-of-range stored value loads as the
    /// default. Loading never originates an outbound sync.
    pub async fn initialize(&self) {
        let stored = match self.store.get(INTERVAL_KEY).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Failed to read stored interval, using default: {}", e);
                None
            }
        };
        let value = IntervalMinutes::from_stored(stored);

        let mut state = self.state.lock().await;
        *state = SyncState::new(self.role, value);
        self.value_tx.send_replace(value);
        tracing::info!("Loaded interval {} ({} endpoint)", value, self.role);

        self.process_locked(&mut state, Event::ActivationRequested).await;
    }

    /// Set the interval from the local user.
    ///
    /// Setting the current value is a no-op. Otherwise the value is
    /// persisted, published, and sent to the counterpart if possible; if not,
    /// the send stays pending.
    pub async fn set_local_value(&self, value: IntervalMinutes) {
        self.process(Event::LocalValueSet { value }).await;
    }

    /// Subscribe to interval changes.
    ///
    /// The receiver always holds the current value, so the timer can read it
    /// on every tick.
    pub fn subscribe(&self) -> watch::Receiver<IntervalMinutes> {
        self.value_tx.subscribe()
    }

    /// The current interval.
    pub fn current_value(&self) -> IntervalMinutes {
        *self.value_tx.borrow()
    }

    /// The endpoint role.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Current link state.
    pub async fn link_state(&self) -> LinkState {
        self.state.lock().await.link()
    }

    /// Whether a local change is waiting to be sent.
    pub async fn is_pending(&self) -> bool {
        self.state.lock().await.is_pending()
    }

    /// The setting store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The transport link.
    pub fn link(&self) -> &L {
        &self.link
    }

    async fn process(&self, event: Event) {
        let mut state = self.state.lock().await;
        self.process_locked(&mut state, event).await;
    }

    /// Run an event and every follow-up event its actions produce.
    async fn process_locked(&self, state: &mut SyncState, event: Event) {
        let mut queue = VecDeque::from([event]);
        while let Some(event) = queue.pop_front() {
            let actions = state.on_event(event, self.link.counterpart());
            for action in actions {
                if let Some(follow_up) = self.execute(action).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    /// Perform one action, returning the event that reports its outcome.
    async fn execute(&self, action: Action) -> Option<Event> {
        match action {
            Action::Persist { value } => {
                if let Err(e) = self.store.set(INTERVAL_KEY, value.into()).await {
                    tracing::warn!("Failed to persist interval {}: {}", value, e);
                }
                None
            }
            Action::Publish { value } => {
                self.value_tx.send_replace(value);
                None
            }
            Action::RequestActivation => {
                tracing::debug!("Requesting link activation");
                match self.link.activate().await {
                    Ok(()) => None,
                    Err(e) => Some(Event::ActivationFailed {
                        error: e.to_string(),
                    }),
                }
            }
            Action::Send { payload } => Some(self.send(payload).await),
            Action::SyncDeferred { reason } => {
                tracing::debug!("Sync deferred ({:?}), update pending", reason);
                None
            }
            Action::RemoteRejected { value } => {
                tracing::debug!("Ignoring out-of-range interval from counterpart: {}", value);
                None
            }
        }
    }

    async fn send(&self, payload: ContextPayload) -> Event {
        let bytes = match payload.to_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Failed to encode context: {}", e);
                return Event::SendFailed {
                    error: e.to_string(),
                    expected: false,
                };
            }
        };

        match self.link.update_context(&bytes).await {
            Ok(()) => match payload.interval() {
                Ok(sent) => {
                    tracing::info!("Synced interval {} to counterpart", sent);
                    Event::SendSucceeded { sent }
                }
                Err(e) => Event::SendFailed {
                    error: e.to_string(),
                    expected: false,
                },
            },
            Err(e) if e.is_expected_unavailability() => {
                tracing::debug!("Counterpart unavailable, update pending: {}", e);
                Event::SendFailed {
                    error: e.to_string(),
                    expected: true,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to send context: {}", e);
                Event::SendFailed {
                    error: e.to_string(),
                    expected: false,
                }
            }
        }
    }
}

#[async_trait]
impl<S: SettingStore, L: TransportLink> LinkDelegate for Synchronizer<S, L> {
    async fn on_activation_complete(&self, result: Result<(), String>) {
        match result {
            Ok(()) => {
                tracing::info!("Link activated ({} endpoint)", self.role);
                if self.role.requires_counterpart_checks() {
                    let counterpart = self.link.counterpart();
                    tracing::debug!(
                        "Counterpart paired: {}, installed: {}, reachable: {}",
                        counterpart.paired,
                        counterpart.installed,
                        counterpart.reachable
                    );
                    if !counterpart.accepts_context(self.role) {
                        tracing::info!("Counterpart not ready, syncing later");
                    }
                }
                self.process(Event::ActivationCompleted).await;
            }
            Err(error) => {
                tracing::warn!("Link activation failed, continuing locally: {}", error);
                self.process(Event::ActivationFailed { error }).await;
            }
        }
    }

    async fn on_became_inactive(&self) {
        tracing::debug!("Link became inactive");
    }

    async fn on_deactivated(&self) {
        tracing::info!("Link deactivated, reactivating");
        self.process(Event::Deactivated).await;
    }

    async fn on_reachability_changed(&self, reachable: bool) {
        tracing::debug!("Counterpart reachable: {}", reachable);
        self.process(Event::ReachabilityChanged { reachable }).await;
    }

    async fn on_installed_changed(&self, installed: bool) {
        tracing::debug!("Counterpart installed: {}", installed);
        self.process(Event::InstalledChanged { installed }).await;
    }

    async fn on_context_received(&self, payload: Vec<u8>) {
        let payload = match ContextPayload::from_bytes(&payload) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Dropping undecodable context: {}", e);
                return;
            }
        };

        // Applying and clearing echo suppression must not interleave with a
        // local change, so both run under one lock.
        let mut state = self.state.lock().await;
        self.process_locked(&mut state, Event::RemoteContextReceived { payload }).await;
        self.process_locked(&mut state, Event::RemoteApplied).await;
        tracing::debug!("Applied interval {} from counterpart", state.value());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::transport::{LinkError, MockLink};
    use tandem_sync_types::CounterpartStatus;

    type TestSync = Synchronizer<MemoryStore, MockLink>;

    fn minutes(n: i64) -> IntervalMinutes {
        IntervalMinutes::new(n).unwrap()
    }

    fn payload(n: i64) -> Vec<u8> {
        ContextPayload::raw(n).to_bytes().unwrap()
    }

    async fn active(role: Role, store: MemoryStore, link: MockLink) -> TestSync {
        let sync = Synchronizer::new(role, store, link);
        sync.initialize().await;
        sync.on_activation_complete(Ok(())).await;
        sync
    }

    #[tokio::test]
    async fn initialize_loads_value_and_activates() {
        let store = MemoryStore::with_value(INTERVAL_KEY, 17);
        let link = MockLink::new();
        let sync = Synchronizer::new(Role::Companion, store.clone(), link.clone());

        sync.initialize().await;

        assert_eq!(sync.current_value(), minutes(17));
        assert_eq!(sync.link_state().await, LinkState::Activating);
        assert_eq!(link.activation_count(), 1);
        assert_eq!(link.send_count(), 0);
        assert_eq!(store.write_count(), 0);
        assert!(!sync.is_pending().await);
    }

    #[tokio::test]
    async fn initialize_defaults_when_unset_or_invalid() {
        for stored in [None, Some(0), Some(-3), Some(61)] {
            let store = match stored {
                Some(v) => MemoryStore::with_value(INTERVAL_KEY, v),
                None => MemoryStore::new(),
            };
            let sync = Synchronizer::new(Role::Primary, store, MockLink::new());
            sync.initialize().await;
            assert_eq!(sync.current_value(), IntervalMinutes::DEFAULT);
        }
    }

    #[tokio::test]
    async fn set_local_value_is_idempotent() {
        let store = MemoryStore::new();
        let link = MockLink::new();
        let sync = active(Role::Companion, store.clone(), link.clone()).await;

        sync.set_local_value(minutes(12)).await;
        sync.set_local_value(minutes(12)).await;

        assert_eq!(store.write_count(), 1);
        assert_eq!(link.send_count(), 1);
        assert_eq!(store.value(INTERVAL_KEY), Some(12));
        assert!(!sync.is_pending().await);
    }

    #[tokio::test]
    async fn subscribers_observe_local_changes() {
        let sync = active(Role::Companion, MemoryStore::new(), MockLink::new()).await;
        let mut rx = sync.subscribe();

        sync.set_local_value(minutes(30)).await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), minutes(30));
    }

    #[tokio::test]
    async fn pending_changes_send_latest_on_activation() {
        let link = MockLink::new();
        let sync = Synchronizer::new(Role::Companion, MemoryStore::new(), link.clone());
        sync.initialize().await;

        for n in [8, 9, 10] {
            sync.set_local_value(minutes(n)).await;
        }
        assert!(sync.is_pending().await);
        assert_eq!(link.send_count(), 0);

        sync.on_activation_complete(Ok(())).await;

        assert_eq!(link.sent_payloads(), vec![ContextPayload::raw(10)]);
        assert!(!sync.is_pending().await);
    }

    #[tokio::test]
    async fn remote_value_is_applied_without_echo() {
        let store = MemoryStore::new();
        let link = MockLink::new();
        let sync = active(Role::Companion, store.clone(), link.clone()).await;
        let mut rx = sync.subscribe();

        sync.on_context_received(payload(25)).await;

        assert_eq!(sync.current_value(), minutes(25));
        assert_eq!(*rx.borrow_and_update(), minutes(25));
        assert_eq!(store.value(INTERVAL_KEY), Some(25));
        assert_eq!(link.send_count(), 0);
        assert!(!sync.is_pending().await);

        // Later local changes still sync normally.
        sync.set_local_value(minutes(26)).await;
        assert_eq!(link.sent_payloads(), vec![ContextPayload::raw(26)]);
    }

    #[tokio::test]
    async fn invalid_inbound_values_are_ignored() {
        let store = MemoryStore::new();
        let sync = active(Role::Companion, store.clone(), MockLink::new()).await;

        sync.on_context_received(payload(0)).await;
        sync.on_context_received(payload(61)).await;
        sync.on_context_received(vec![0xc1]).await;

        assert_eq!(sync.current_value(), IntervalMinutes::DEFAULT);
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn deactivation_requests_reactivation() {
        let link = MockLink::new();
        let sync = active(Role::Companion, MemoryStore::new(), link.clone()).await;
        assert_eq!(link.activation_count(), 1);

        sync.on_became_inactive().await;
        assert_eq!(sync.link_state().await, LinkState::Active);

        sync.on_deactivated().await;
        assert_eq!(sync.link_state().await, LinkState::Deactivated);
        assert_eq!(link.activation_count(), 2);

        sync.set_local_value(minutes(40)).await;
        assert_eq!(link.send_count(), 0);

        sync.on_activation_complete(Ok(())).await;
        assert_eq!(link.sent_payloads(), vec![ContextPayload::raw(40)]);
    }

    #[tokio::test]
    async fn activation_failure_keeps_local_mode() {
        let store = MemoryStore::new();
        let link = MockLink::new();
        let sync = Synchronizer::new(Role::Companion, store.clone(), link.clone());
        sync.initialize().await;

        sync.on_activation_complete(Err("unsupported".into())).await;
        assert_eq!(sync.link_state().await, LinkState::Inactive);

        sync.set_local_value(minutes(15)).await;
        assert_eq!(store.value(INTERVAL_KEY), Some(15));
        assert!(sync.is_pending().await);
        assert_eq!(link.activation_count(), 1, "no automatic retry");
    }

    #[tokio::test]
    async fn rejected_activation_request_falls_back_to_local() {
        let link = MockLink::new();
        link.fail_next_activate(LinkError::ActivationFailed("no session".into()));
        let sync = Synchronizer::new(Role::Companion, MemoryStore::new(), link.clone());

        sync.initialize().await;

        assert_eq!(sync.link_state().await, LinkState::Inactive);
    }

    #[tokio::test]
    async fn failed_sends_stay_pending_and_retry_on_reachability() {
        let link = MockLink::new();
        let sync = active(Role::Companion, MemoryStore::new(), link.clone()).await;

        link.fail_next_update(LinkError::Unreachable);
        sync.set_local_value(minutes(7)).await;
        assert!(sync.is_pending().await);

        link.fail_next_update(LinkError::Transmission("payload rejected".into()));
        sync.on_reachability_changed(true).await;
        assert!(sync.is_pending().await);
        assert_eq!(link.send_count(), 0);

        sync.on_reachability_changed(true).await;
        assert_eq!(link.sent_payloads(), vec![ContextPayload::raw(7)]);
        assert!(!sync.is_pending().await);
    }

    #[tokio::test]
    async fn primary_waits_for_installed_companion() {
        let link = MockLink::with_counterpart(CounterpartStatus {
            paired: true,
            installed: false,
            reachable: true,
        });
        let sync = active(Role::Primary, MemoryStore::new(), link.clone()).await;

        sync.set_local_value(minutes(20)).await;
        assert_eq!(link.send_count(), 0);
        assert!(sync.is_pending().await);

        link.set_counterpart(CounterpartStatus::available());
        sync.on_installed_changed(true).await;

        assert_eq!(link.sent_payloads(), vec![ContextPayload::raw(20)]);
        assert!(!sync.is_pending().await);
    }

    #[tokio::test]
    async fn remote_value_cancels_stale_pending_change() {
        let link = MockLink::new();
        let sync = Synchronizer::new(Role::Companion, MemoryStore::new(), link.clone());
        sync.initialize().await;

        sync.set_local_value(minutes(9)).await;
        sync.on_context_received(payload(33)).await;
        sync.on_activation_complete(Ok(())).await;

        assert_eq!(sync.current_value(), minutes(33));
        assert_eq!(link.send_count(), 0);
    }
}
