//! Pulse output for interval crossings.
//!
//! A crossing carrying `count = n` is played as `n` discrete pulses, spaced
//! so each one is felt separately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tandem_sync_core::Crossing;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::{JoinHandle, JoinSet};

/// Default gap between consecutive pulses.
pub const DEFAULT_SPACING: Duration = Duration::from_millis(500);

/// Consumer of crossing counts.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Play `count` pulses.
    async fn pulse(&self, count: u64);
}

/// A physical output that fires one pulse per call.
pub trait PulseDevice: Send + Sync {
    /// Fire a single pulse.
    fn play(&self);
}

/// Pulse sequencing configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseConfig {
    /// Delay between consecutive pulses.
    pub spacing: Duration,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            spacing: DEFAULT_SPACING,
        }
    }
}

/// [`EventSink`] that plays pulses on a [`PulseDevice`] one after another.
#[derive(Debug)]
pub struct PulseSequencer<D: PulseDevice> {
    device: D,
    config: PulseConfig,
}

impl<D: PulseDevice> PulseSequencer<D> {
    /// Create a sequencer with the default spacing.
    pub fn new(device: D) -> Self {
        Self::with_config(device, PulseConfig::default())
    }

    /// Create a sequencer with explicit configuration.
    pub fn with_config(device: D, config: PulseConfig) -> Self {
        Self { device, config }
    }
}

#[async_trait]
impl<D: PulseDevice> EventSink for PulseSequencer<D> {
    async fn pulse(&self, count: u64) {
        for i in 0..count {
            if i > 0 {
                tokio::time::sleep(self.config.spacing).await;
            }
            self.device.play();
        }
    }
}

/// Forward crossings from a timer to a sink until the timer goes away.
///
/// Each crossing plays in its own task, so a long sequence never delays the
/// next crossing; sequences may overlap once they outlast the interval. A
/// receiver that falls behind skips the missed crossings and keeps going.
/// The returned task finishes after the last sequence has played.
pub fn spawn_pulse_forwarder<S>(
    mut crossings: broadcast::Receiver<Crossing>,
    sink: Arc<S>,
) -> JoinHandle<()>
where
    S: EventSink + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut playing = JoinSet::new();
        loop {
            match crossings.recv().await {
                Ok(crossing) => {
                    while playing.try_join_next().is_some() {}
                    let sink = Arc::clone(&sink);
                    playing.spawn(async move { sink.pulse(crossing.count).await });
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("Pulse output lagged, skipped {} crossings", missed);
                }
                Err(RecvError::Closed) => break,
            }
        }
        while playing.join_next().await.is_some() {}
        tracing::debug!("Pulse forwarder stopped");
    })
}
