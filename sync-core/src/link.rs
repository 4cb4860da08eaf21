//! Link lifecycle state machine.
//!
//! Tracks whether the transport session to the counterpart is usable. The
//! state only changes in response to signals reported by the transport; no
//! I/O happens here.

/// Transport session state as seen by the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkState {
    /// Never activated, or activation failed.
    #[default]
    Inactive,
    /// Activation requested, completion not yet reported.
    Activating,
    /// Activated; outbound sends may be attempted.
    Active,
    /// The transport deactivated the session (e.g. the counterpart changed).
    Deactivated,
}

/// Signals that drive [`LinkState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSignal {
    /// Activation was requested from the transport.
    ActivationRequested,
    /// The transport reported successful activation.
    ActivationSucceeded,
    /// The transport reported an activation error.
    ActivationFailed,
    /// The transport deactivated the session.
    Deactivated,
}

impl LinkState {
    /// Create a new link in the Inactive state.
    pub fn new() -> Self {
        Self::Inactive
    }

    /// Apply a signal and return the resulting state.
    pub fn on_signal(self, signal: LinkSignal) -> Self {
        match (self, signal) {
            (Self::Inactive | Self::Deactivated, LinkSignal::ActivationRequested) => {
                Self::Activating
            }
            // Completion can be reported for an activation the host started
            // on its own, so accept it from any state.
            (_, LinkSignal::ActivationSucceeded) => Self::Active,
            (Self::Activating | Self::Deactivated, LinkSignal::ActivationFailed) => Self::Inactive,
            (Self::Activating | Self::Active, LinkSignal::Deactivated) => Self::Deactivated,

            // Invalid transitions - stay in current state
            (state, _) => state,
        }
    }

    /// Check if outbound sends may be attempted.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_inactive() {
        assert_eq!(LinkState::new(), LinkState::Inactive);
        assert!(!LinkState::new().is_active());
    }

    #[test]
    fn full_activation_flow() {
        let state = LinkState::Inactive.on_signal(LinkSignal::ActivationRequested);
        assert_eq!(state, LinkState::Activating);

        let state = state.on_signal(LinkSignal::ActivationSucceeded);
        assert_eq!(state, LinkState::Active);
        assert!(state.is_active());
    }

    #[test]
    fn activation_failure_returns_to_inactive() {
        let state = LinkState::Activating.on_signal(LinkSignal::ActivationFailed);
        assert_eq!(state, LinkState::Inactive);
    }

    #[test]
    fn deactivation_then_reactivation() {
        let state = LinkState::Active.on_signal(LinkSignal::Deactivated);
        assert_eq!(state, LinkState::Deactivated);

        let state = state.on_signal(LinkSignal::ActivationRequested);
        assert_eq!(state, LinkState::Activating);
    }

    #[test]
    fn deactivated_link_activates_without_passing_through_activating() {
        let state = LinkState::Deactivated.on_signal(LinkSignal::ActivationSucceeded);
        assert_eq!(state, LinkState::Active);

        let state = LinkState::Deactivated.on_signal(LinkSignal::ActivationFailed);
        assert_eq!(state, LinkState::Inactive);
    }

    #[test]
    fn request_while_active_is_ignored() {
        let state = LinkState::Active.on_signal(LinkSignal::ActivationRequested);
        assert_eq!(state, LinkState::Active);
    }

    #[test]
    fn failure_after_activation_is_ignored() {
        let state = LinkState::Active.on_signal(LinkSignal::ActivationFailed);
        assert_eq!(state, LinkState::Active);
    }

    #[test]
    fn unsolicited_success_activates() {
        assert_eq!(
            LinkState::Inactive.on_signal(LinkSignal::ActivationSucceeded),
            LinkState::Active
        );
    }
}
