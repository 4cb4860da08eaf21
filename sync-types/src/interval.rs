//! The synchronized setting: minutes between interval crossings.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::SyncError;

/// Minutes between notification events, always within `1..=60`.
///
/// Construction validates the range, so a value of this type can be applied
/// locally without further checks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct IntervalMinutes(u32);

impl IntervalMinutes {
    /// Smallest accepted interval.
    pub const MIN: u32 = 1;

    /// Largest accepted interval.
    pub const MAX: u32 = 60;

    /// Value used when nothing valid has been persisted yet.
    pub const DEFAULT: Self = Self(5);

    /// Validate a raw minute count.
    pub fn new(minutes: i64) -> Result<Self, SyncError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&minutes) {
            Ok(Self(minutes as u32))
        } else {
            Err(SyncError::IntervalOutOfRange(minutes))
        }
    }

    /// Interpret a value read back from persistent storage.
    ///
    /// Absent or non-positive values fall back to [`IntervalMinutes::DEFAULT`].
    /// Values above the maximum are never applied and also fall back.
    pub fn from_stored(stored: Option<i64>) -> Self {
        stored
            .and_then(|minutes| Self::new(minutes).ok())
            .unwrap_or(Self::DEFAULT)
    }

    /// Check whether a raw minute count is acceptable.
    pub fn is_valid(minutes: i64) -> bool {
        Self::new(minutes).is_ok()
    }

    /// The minute count.
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for IntervalMinutes {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for IntervalMinutes {
    type Error = SyncError;

    fn try_from(minutes: i64) -> Result<Self, Self::Error> {
        Self::new(minutes)
    }
}

impl From<IntervalMinutes> for i64 {
    fn from(value: IntervalMinutes) -> Self {
        i64::from(value.0)
    }
}

impl fmt::Display for IntervalMinutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} min", self.0)
    }
}

impl fmt::Debug for IntervalMinutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IntervalMinutes({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_bounds() {
        assert_eq!(IntervalMinutes::new(1).unwrap().get(), 1);
        assert_eq!(IntervalMinutes::new(60).unwrap().get(), 60);
    }

    #[test]
    fn rejects_zero_and_above_max() {
        assert!(matches!(
            IntervalMinutes::new(0),
            Err(SyncError::IntervalOutOfRange(0))
        ));
        assert!(IntervalMinutes::new(61).is_err());
        assert!(IntervalMinutes::new(-5).is_err());
    }

    #[test]
    fn stored_value_floor_defaults_to_five() {
        assert_eq!(IntervalMinutes::from_stored(None).get(), 5);
        assert_eq!(IntervalMinutes::from_stored(Some(0)).get(), 5);
        assert_eq!(IntervalMinutes::from_stored(Some(-3)).get(), 5);
        assert_eq!(IntervalMinutes::from_stored(Some(12)).get(), 12);
    }

    #[test]
    fn serde_rejects_out_of_range() {
        let ok: IntervalMinutes = serde_json::from_str("12").unwrap();
        assert_eq!(ok.get(), 12);
        assert!(serde_json::from_str::<IntervalMinutes>("0").is_err());
        assert!(serde_json::from_str::<IntervalMinutes>("61").is_err());
    }

    #[test]
    fn display_shows_minutes() {
        assert_eq!(IntervalMinutes::DEFAULT.to_string(), "5 min");
    }

    proptest! {
        #[test]
        fn out_of_range_never_constructs(minutes in any::<i64>()) {
            prop_assume!(!(1..=60).contains(&minutes));
            prop_assert!(IntervalMinutes::new(minutes).is_err());
        }

        #[test]
        fn in_range_always_constructs(minutes in 1i64..=60) {
            prop_assert_eq!(i64::from(IntervalMinutes::new(minutes).unwrap()), minutes);
        }
    }
}
