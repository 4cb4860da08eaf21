//! Elapsed-time display formatting.

use std::time::Duration;

const HOUR_SECS: u64 = 3600;

/// Format elapsed time for display.
///
/// - `HH:MM:SS` once an hour has passed (never with sub-second digits)
/// - `MM:SS.cc` below an hour when `show_subsecond` is set
/// - `MM:SS` otherwise
pub fn format_elapsed(elapsed: Duration, show_subsecond: bool) -> String {
    let total_secs = elapsed.as_secs();
    let hours = total_secs / HOUR_SECS;
    let minutes = (total_secs % HOUR_SECS) / 60;
    let seconds = total_secs % 60;

    if total_secs >= HOUR_SECS {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else if show_subsecond {
        let centis = elapsed.subsec_millis() / 10;
        format!("{minutes:02}:{seconds:02}.{centis:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
