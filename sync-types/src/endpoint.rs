//! Endpoint identity and counterpart visibility.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the pair this endpoint is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The host device. It can observe whether the counterpart is paired
    /// and whether the companion application is installed.
    Primary,
    /// The companion device. It only knows whether its link is active.
    Companion,
}

impl Role {
    /// Whether outbound sends must wait for pairing and installation.
    pub fn requires_counterpart_checks(self) -> bool {
        matches!(self, Self::Primary)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Companion => f.write_str("companion"),
        }
    }
}

/// What the transport currently knows about the other endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CounterpartStatus {
    /// A counterpart device is paired with this one.
    pub paired: bool,
    /// The counterpart application is installed.
    pub installed: bool,
    /// The counterpart is reachable right now.
    pub reachable: bool,
}

impl CounterpartStatus {
    /// Status of a counterpart that is paired, installed and reachable.
    pub fn available() -> Self {
        Self {
            paired: true,
            installed: true,
            reachable: true,
        }
    }

    /// Whether an outbound send may be attempted for the given role.
    ///
    /// Reachability is not required: a context update is delivered later if
    /// the counterpart is currently out of range.
    pub fn accepts_context(&self, role: Role) -> bool {
        !role.requires_counterpart_checks() || (self.paired && self.installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn companion_never_checks_counterpart() {
        assert!(CounterpartStatus::default().accepts_context(Role::Companion));
    }

    #[test]
    fn primary_needs_paired_and_installed() {
        let mut status = CounterpartStatus::default();
        assert!(!status.accepts_context(Role::Primary));
        status.paired = true;
        assert!(!status.accepts_context(Role::Primary));
        status.installed = true;
        assert!(status.accepts_context(Role::Primary));
    }

    #[test]
    fn role_display_is_lowercase() {
        assert_eq!(Role::Primary.to_string(), "primary");
        assert_eq!(Role::Companion.to_string(), "companion");
    }
}
