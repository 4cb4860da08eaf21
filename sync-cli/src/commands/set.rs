//! Set the interval on this endpoint.

use anyhow::{Context, Result};
use std::path::Path;
use tandem_sync_types::IntervalMinutes;

use super::offline_synchronizer;
use crate::config::Config;

/// Run the set command.
///
/// The value goes through the synchronizer like any local change, so it is
/// validated and persisted. No counterpart is attached here, so the update
/// is left pending.
pub async fn run(data_dir: &Path, config: &Config, minutes: i64) -> Result<()> {
    let value = IntervalMinutes::new(minutes).context("Invalid interval")?;

    let sync = offline_synchronizer(config.endpoint.role, data_dir);
    sync.initialize().await;
    let previous = sync.current_value();
    sync.set_local_value(value).await;

    if previous == value {
        println!("Interval already {}", value);
    } else {
        println!("Interval set to {} (was {})", value, previous);
    }
    if sync.is_pending().await {
        println!("Counterpart not connected; the change will sync later.");
    }
    Ok(())
}
