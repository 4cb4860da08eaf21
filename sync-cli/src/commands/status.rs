//! Show the persisted interval and the active configuration.

use anyhow::{Context, Result};
use std::path::Path;
use tandem_sync_client::{FileStore, SettingStore};
use tandem_sync_types::{IntervalMinutes, INTERVAL_KEY};

use crate::config::Config;

/// Run the status command.
pub async fn run(data_dir: &Path, config: &Config) -> Result<()> {
    let store = FileStore::in_dir(data_dir);
    let stored = store
        .get(INTERVAL_KEY)
        .await
        .context("Failed to read settings")?;

    println!("=== tandem status ===");
    println!();
    println!("Interval:");
    println!("  Value:    {}", describe(stored));
    println!("  Settings: {}", store.path().display());
    println!();
    println!("Endpoint:");
    println!("  Role:     {}", config.endpoint.role);
    println!();
    println!("Timer:");
    println!("  Tick:     {} ms", config.timer.tick_ms);
    println!("  Spacing:  {} ms", config.pulse.spacing_ms);

    Ok(())
}

/// Describe the stored value, noting when the default applies.
fn describe(stored: Option<i64>) -> String {
    let value = IntervalMinutes::from_stored(stored);
    match stored {
        Some(raw) if IntervalMinutes::is_valid(raw) => value.to_string(),
        Some(raw) => format!("{} (stored {} is invalid, using default)", value, raw),
        None => format!("{} (default)", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn status_without_settings() {
        let dir = tempdir().unwrap();
        assert!(run(dir.path(), &Config::default()).await.is_ok());
    }

    #[tokio::test]
    async fn status_with_settings() {
        let dir = tempdir().unwrap();
        FileStore::in_dir(dir.path())
            .set(INTERVAL_KEY, 12)
            .await
            .unwrap();
        assert!(run(dir.path(), &Config::default()).await.is_ok());
    }

    #[tokio::test]
    async fn status_with_corrupt_settings_fails() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(FileStore::FILE_NAME), "{").unwrap();
        assert!(run(dir.path(), &Config::default()).await.is_err());
    }

    #[test]
    fn describe_marks_defaults() {
        assert_eq!(describe(Some(12)), "12 min");
        assert_eq!(describe(None), "5 min (default)");
        assert_eq!(
            describe(Some(0)),
            "5 min (stored 0 is invalid, using default)"
        );
    }
}
