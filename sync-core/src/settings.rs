//! Settings synchronizer state machine.
//!
//! Owns the canonical local interval and decides, for every input, what the
//! client must do: persist, publish to observers, request activation or send
//! a context update. The two write paths are distinct events:
//! [`Event::LocalValueSet`] may originate an outbound sync,
//! [`Event::RemoteContextReceived`] never does.
//!
//! Pending sync is a single flag, not a queue. Whatever value is current when
//! a retry fires is the value that gets sent, so intermediate values set while
//! the link was down are never transmitted.

use tandem_sync_types::{ContextPayload, CounterpartStatus, IntervalMinutes, Role};

use crate::link::{LinkSignal, LinkState};

/// Synchronizer state for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncState {
    role: Role,
    value: IntervalMinutes,
    link: LinkState,
    /// A local change has not yet been confirmed as sent.
    pending: bool,
    /// Set while an inbound value is being applied.
    suppress_echo: bool,
}

/// Inputs to the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The endpoint asks the transport to activate.
    ActivationRequested,
    /// The transport reported successful activation.
    ActivationCompleted,
    /// The transport reported an activation error.
    ActivationFailed {
        /// Error message from the transport.
        error: String,
    },
    /// The transport deactivated the session.
    Deactivated,
    /// Counterpart reachability changed.
    ReachabilityChanged {
        /// Whether the counterpart is now reachable.
        reachable: bool,
    },
    /// Counterpart application install state changed.
    InstalledChanged {
        /// Whether the counterpart application is now installed.
        installed: bool,
    },
    /// The local user picked a new interval.
    LocalValueSet {
        /// The chosen interval.
        value: IntervalMinutes,
    },
    /// A context payload arrived from the counterpart.
    RemoteContextReceived {
        /// The received payload, not yet validated.
        payload: ContextPayload,
    },
    /// The actions for an inbound value have been executed.
    RemoteApplied,
    /// The transport accepted a context update.
    SendSucceeded {
        /// The value that was sent.
        sent: IntervalMinutes,
    },
    /// The transport rejected a context update.
    SendFailed {
        /// Error message from the transport.
        error: String,
        /// The counterpart is simply unavailable (not paired, not installed,
        /// unreachable), as opposed to a genuine transmission failure.
        expected: bool,
    },
}

/// Why an outbound sync was deferred instead of attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferReason {
    /// The link is not active.
    LinkNotActive,
    /// No counterpart is paired.
    NotPaired,
    /// The counterpart application is not installed.
    NotInstalled,
}

/// Instructions to be executed by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write the value to the setting store.
    Persist {
        /// Value to store.
        value: IntervalMinutes,
    },
    /// Notify observers of the new value.
    Publish {
        /// Value to publish.
        value: IntervalMinutes,
    },
    /// Ask the transport to (re)activate the session.
    RequestActivation,
    /// Transmit a context update to the counterpart.
    Send {
        /// Payload to transmit.
        payload: ContextPayload,
    },
    /// An outbound sync was deferred; the pending flag is set.
    SyncDeferred {
        /// Why the send was not attempted.
        reason: DeferReason,
    },
    /// An inbound value was outside 1..=60 and was dropped.
    RemoteRejected {
        /// The rejected raw value.
        value: i64,
    },
}

impl SyncState {
    /// Create the state for an endpoint with its loaded value.
    ///
    /// Loading does not originate a sync: the pending flag starts clear.
    pub fn new(role: Role, value: IntervalMinutes) -> Self {
        Self {
            role,
            value,
            link: LinkState::new(),
            pending: false,
            suppress_echo: false,
        }
    }

    /// The canonical local value.
    pub fn value(&self) -> IntervalMinutes {
        self.value
    }

    /// Current link state.
    pub fn link(&self) -> LinkState {
        self.link
    }

    /// Whether a local change is waiting to be sent.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether an inbound value is currently being applied.
    pub fn is_suppressing_echo(&self) -> bool {
        self.suppress_echo
    }

    /// Process an event and return the actions to execute.
    ///
    /// `counterpart` is the transport's current view of the other endpoint,
    /// consulted only when an outbound send is considered.
    pub fn on_event(&mut self, event: Event, counterpart: CounterpartStatus) -> Vec<Action> {
        match event {
            Event::ActivationRequested => {
                let previous = self.link;
                self.link = self.link.on_signal(LinkSignal::ActivationRequested);
                if previous == self.link {
                    vec![]
                } else {
                    vec![Action::RequestActivation]
                }
            }
            Event::ActivationCompleted => {
                self.link = self.link.on_signal(LinkSignal::ActivationSucceeded);
                if self.pending {
                    self.attempt_send(counterpart)
                } else {
                    vec![]
                }
            }
            Event::ActivationFailed { .. } => {
                // Local-only mode until the host activates again.
                self.link = self.link.on_signal(LinkSignal::ActivationFailed);
                vec![]
            }
            Event::Deactivated => {
                self.link = self.link.on_signal(LinkSignal::Deactivated);
                vec![Action::RequestActivation]
            }
            Event::ReachabilityChanged { reachable } => {
                if reachable && self.pending {
                    self.attempt_send(counterpart)
                } else {
                    vec![]
                }
            }
            Event::InstalledChanged { installed } => {
                if installed && self.pending {
                    self.attempt_send(counterpart)
                } else {
                    vec![]
                }
            }
            Event::LocalValueSet { value } => {
                if value == self.value {
                    return vec![];
                }
                self.value = value;
                let mut actions = vec![Action::Persist { value }, Action::Publish { value }];
                if !self.suppress_echo {
                    actions.extend(self.attempt_send(counterpart));
                }
                actions
            }
            Event::RemoteContextReceived { payload } => {
                let value = match payload.interval() {
                    Ok(value) => value,
                    Err(_) => {
                        return vec![Action::RemoteRejected {
                            value: payload.interval_minutes,
                        }]
                    }
                };
                // The current value is about to be the counterpart's own, so
                // a later attempt would only send it back.
                self.pending = false;
                if value == self.value {
                    return vec![];
                }
                self.suppress_echo = true;
                self.value = value;
                vec![Action::Persist { value }, Action::Publish { value }]
            }
            Event::RemoteApplied => {
                self.suppress_echo = false;
                vec![]
            }
            Event::SendSucceeded { sent } => {
                if sent == self.value {
                    self.pending = false;
                }
                vec![]
            }
            Event::SendFailed { .. } => {
                self.pending = true;
                vec![]
            }
        }
    }

    /// Decide whether the current value can be sent right now.
    ///
    /// The pending flag is raised before the attempt and only cleared by
    /// [`Event::SendSucceeded`].
    fn attempt_send(&mut self, counterpart: CounterpartStatus) -> Vec<Action> {
        self.pending = true;

        if !self.link.is_active() {
            return vec![Action::SyncDeferred {
                reason: DeferReason::LinkNotActive,
            }];
        }
        if self.role.requires_counterpart_checks() {
            if !counterpart.paired {
                return vec![Action::SyncDeferred {
                    reason: DeferReason::NotPaired,
                }];
            }
            if !counterpart.installed {
                return vec![Action::SyncDeferred {
                    reason: DeferReason::NotInstalled,
                }];
            }
        }

        vec![Action::Send {
            payload: ContextPayload::new(self.value),
        }]
    }
}
