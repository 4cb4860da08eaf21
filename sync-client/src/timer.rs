//! TimerEngine - scheduled ticks over the sync-core timer state.
//!
//! The engine runs a tokio interval task while the timer is running. Each
//! tick samples the clock, reads the live interval from the synchronizer's
//! watch channel and broadcasts a [`Crossing`] when a new boundary is
//! passed. Ticks only sample time, so late or coalesced ticks never skew the
//! elapsed value.
//!
//! Stopping folds elapsed time and cancels the tick task under the same
//! lock the task takes before touching state, so no tick can land after
//! `stop()` returns.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tandem_sync_core::{Crossing, TimerState};
use tandem_sync_types::IntervalMinutes;
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Default tick resolution, fine enough for centisecond display.
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

const CROSSING_CAPACITY: usize = 16;

/// Timer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    /// Period of the scheduled tick.
    pub tick: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self { tick: DEFAULT_TICK }
    }
}

impl TimerConfig {
    /// Set the tick period.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

/// Point-in-time view of the timer for presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSnapshot {
    /// Elapsed run time.
    pub elapsed: Duration,
    /// Whether the timer is running.
    pub running: bool,
    /// Number of boundaries already crossed in this run.
    pub last_crossed: u64,
}

/// The host refused to extend background execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("background execution unavailable: {0}")]
pub struct ExtensionUnavailable(pub String);

/// Optional host capability that keeps ticks flowing while backgrounded.
///
/// Requested on start and released on stop. Whether it is granted only
/// affects how promptly ticks arrive, never the elapsed-time accounting.
pub trait BackgroundExtension: Send + Sync + 'static {
    /// Ask the host to keep the process running.
    fn request(&self) -> Result<(), ExtensionUnavailable>;

    /// Give the extension back.
    fn release(&self);
}

/// Host without a background-execution capability.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoExtension;

impl BackgroundExtension for NoExtension {
    fn request(&self) -> Result<(), ExtensionUnavailable> {
        Ok(())
    }

    fn release(&self) {}
}

struct Inner {
    state: TimerState,
    ticker: Option<JoinHandle<()>>,
    /// Bumped on every stop/reset so a superseded tick task exits.
    generation: u64,
    /// Whether the host granted background execution for this run.
    extension_held: bool,
}

/// Drift-free interval timer.
pub struct TimerEngine<X: BackgroundExtension = NoExtension> {
    config: TimerConfig,
    interval: watch::Receiver<IntervalMinutes>,
    crossings: broadcast::Sender<Crossing>,
    extension: Arc<X>,
    inner: Arc<Mutex<Inner>>,
}

fn now() -> std::time::Instant {
    Instant::now().into_std()
}

impl TimerEngine {
    /// Create a timer with the default configuration and no background
    /// extension, reading its interval from `interval`.
    pub fn new(interval: watch::Receiver<IntervalMinutes>) -> Self {
        Self::with_extension(TimerConfig::default(), interval, NoExtension)
    }
}

impl<X: BackgroundExtension> TimerEngine<X> {
    /// Create a timer with explicit configuration and background capability.
    pub fn with_extension(
        config: TimerConfig,
        interval: watch::Receiver<IntervalMinutes>,
        extension: X,
    ) -> Self {
        let (crossings, _) = broadcast::channel(CROSSING_CAPACITY);
        Self {
            config,
            interval,
            crossings,
            extension: Arc::new(extension),
            inner: Arc::new(Mutex::new(Inner {
                state: TimerState::new(),
                ticker: None,
                generation: 0,
                extension_held: false,
            })),
        }
    }

    /// Subscribe to crossing events.
    pub fn subscribe_crossings(&self) -> broadcast::Receiver<Crossing> {
        self.crossings.subscribe()
    }

    /// Start or resume the timer. No-op while running.
    ///
    /// The background extension is requested and released under the same
    /// lock as the run state, so it is never left held by a stopped timer.
    pub async fn start(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.state.start(now()) {
            return;
        }
        let generation = inner.generation;
        inner.ticker = Some(self.spawn_ticker(generation));
        tracing::debug!("Timer started");

        match self.extension.request() {
            Ok(()) => inner.extension_held = true,
            Err(e) => tracing::debug!("Continuing without background extension: {}", e),
        }
    }

    /// Pause the timer, banking elapsed time. No-op while stopped.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        if !inner.state.stop(now()) {
            return;
        }
        Self::cancel_ticker(&mut inner);
        self.release_extension(&mut inner);
        tracing::debug!("Timer stopped");
    }

    /// Stop and zero elapsed time and the crossing counter.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.state.reset(now());
        Self::cancel_ticker(&mut inner);
        self.release_extension(&mut inner);
        tracing::debug!("Timer reset");
    }

    /// Current elapsed time, running flag and crossing counter.
    pub async fn snapshot(&self) -> TimerSnapshot {
        let inner = self.inner.lock().await;
        TimerSnapshot {
            elapsed: inner.state.elapsed(now()),
            running: inner.state.is_running(),
            last_crossed: inner.state.last_crossed(),
        }
    }

    /// Whether the timer is running.
    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.state.is_running()
    }

    fn release_extension(&self, inner: &mut Inner) {
        if std::mem::take(&mut inner.extension_held) {
            self.extension.release();
        }
    }

    fn cancel_ticker(inner: &mut Inner) {
        inner.generation = inner.generation.wrapping_add(1);
        if let Some(handle) = inner.ticker.take() {
            handle.abort();
        }
    }

    fn spawn_ticker(&self, generation: u64) -> JoinHandle<()> {
        let inner = Arc::downgrade(&self.inner);
        let interval = self.interval.clone();
        let crossings = self.crossings.clone();
        let period = self.config.tick;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                if !tick_once(&inner, generation, &interval, &crossings).await {
                    break;
                }
            }
        })
    }
}

/// Run one tick. Returns `false` once the task should exit.
async fn tick_once(
    inner: &Weak<Mutex<Inner>>,
    generation: u64,
    interval: &watch::Receiver<IntervalMinutes>,
    crossings: &broadcast::Sender<Crossing>,
) -> bool {
    let Some(inner) = inner.upgrade() else {
        return false;
    };
    let mut inner = inner.lock().await;
    if inner.generation != generation || !inner.state.is_running() {
        return false;
    }

    let minutes = i64::from(interval.borrow().get());
    if let Some(crossing) = inner.state.tick(now(), minutes) {
        tracing::info!(
            "Interval crossed: count {} at {:?} ({} min)",
            crossing.count,
            crossing.elapsed,
            crossing.interval_minutes
        );
        // Nobody listening is fine; the counter still advances.
        let _ = crossings.send(crossing);
    }
    true
}

impl<X: BackgroundExtension> Drop for TimerEngine<X> {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_lock() {
            if let Some(handle) = inner.ticker.take() {
                handle.abort();
            }
            if inner.extension_held {
                self.extension.release();
            }
        }
    }
}
