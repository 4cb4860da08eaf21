//! Run the interval timer against the persisted interval.

use anyhow::Result;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tandem_sync_client::{
    spawn_pulse_forwarder, NoExtension, PulseDevice, PulseSequencer, TimerEngine, TimerSnapshot,
};
use tandem_sync_core::format_elapsed;
use tandem_sync_types::IntervalMinutes;
use tokio::sync::watch;

use super::offline_synchronizer;
use crate::config::Config;

const REPORT_EVERY: Duration = Duration::from_secs(1);

/// Pulse device that writes to the terminal.
#[derive(Debug, Default)]
struct ConsolePulse;

impl PulseDevice for ConsolePulse {
    fn play(&self) {
        println!("  * pulse");
    }
}

/// Run the run command: time for `seconds`, or until Ctrl-C.
pub async fn run(data_dir: &Path, config: &Config, seconds: u64) -> Result<()> {
    let sync = offline_synchronizer(config.endpoint.role, data_dir);
    sync.initialize().await;
    println!(
        "Running for {}s, interval {}",
        seconds,
        sync.current_value()
    );

    let interrupted = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => println!("Interrupted"),
            Err(e) => {
                tracing::debug!("Ctrl-C handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    let snapshot = run_timer(
        &sync.subscribe(),
        config,
        Duration::from_secs(seconds),
        interrupted,
    )
    .await;

    println!(
        "Stopped at {} after {} crossing(s)",
        format_elapsed(snapshot.elapsed, true),
        snapshot.last_crossed
    );
    Ok(())
}

/// Run a timer for `duration` or until `interrupt` resolves, reporting
/// elapsed time and playing crossings.
async fn run_timer(
    interval: &watch::Receiver<IntervalMinutes>,
    config: &Config,
    duration: Duration,
    interrupt: impl Future<Output = ()>,
) -> TimerSnapshot {
    let timer = TimerEngine::with_extension(config.timer_config(), interval.clone(), NoExtension);
    let sink = Arc::new(PulseSequencer::with_config(
        ConsolePulse,
        config.pulse_config(),
    ));
    let forwarder = spawn_pulse_forwarder(timer.subscribe_crossings(), sink);

    tokio::pin!(interrupt);
    timer.start().await;
    let deadline = tokio::time::Instant::now() + duration;
    loop {
        let now = tokio::time::Instant::now();
        if now >= deadline {
            break;
        }
        tokio::select! {
            _ = tokio::time::sleep(REPORT_EVERY.min(deadline - now)) => {}
            _ = &mut interrupt => break,
        }
        let snapshot = timer.snapshot().await;
        println!("  {}", format_elapsed(snapshot.elapsed, false));
    }
    timer.stop().await;

    let snapshot = timer.snapshot().await;
    drop(timer);
    // The forwarder ends once the crossing channel closes.
    let _ = forwarder.await;
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;

    #[tokio::test(start_paused = true)]
    async fn timer_runs_for_requested_duration() {
        let (_tx, rx) = watch::channel(IntervalMinutes::new(1).unwrap());
        let config = Config::default();

        let snapshot = run_timer(&rx, &config, Duration::from_secs(125), pending()).await;

        assert!(!snapshot.running);
        assert_eq!(snapshot.last_crossed, 2);
        assert!(snapshot.elapsed >= Duration::from_secs(125));
        assert!(snapshot.elapsed < Duration::from_secs(126));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_duration_stops_immediately() {
        let (_tx, rx) = watch::channel(IntervalMinutes::DEFAULT);
        let snapshot = run_timer(&rx, &Config::default(), Duration::ZERO, pending()).await;
        assert_eq!(snapshot.elapsed, Duration::ZERO);
        assert_eq!(snapshot.last_crossed, 0);
    }
}
