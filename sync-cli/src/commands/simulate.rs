//! Simulate a primary and a companion converging over a loopback link.

use anyhow::{bail, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tandem_sync_client::{pump_link_events, LinkEvent, LoopbackLink, MemoryStore, Synchronizer};
use tandem_sync_core::LinkState;
use tandem_sync_types::{IntervalMinutes, Role};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

/// How long to wait for the link or a delivery before giving up.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);
const POLL: Duration = Duration::from_millis(5);

type Endpoint = Arc<Synchronizer<MemoryStore, LoopbackLink>>;

/// Final state of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Interval held by the primary.
    pub primary: IntervalMinutes,
    /// Interval held by the companion.
    pub companion: IntervalMinutes,
    /// Context updates accepted from the primary.
    pub primary_sends: usize,
    /// Context updates accepted from the companion.
    pub companion_sends: usize,
}

/// Run the simulate command and print the result.
pub async fn run(origin: Role, minutes: i64) -> Result<()> {
    let value = IntervalMinutes::new(minutes).context("Invalid interval")?;
    let outcome = simulate(origin, value).await?;

    println!();
    println!("Converged:");
    println!("  primary:   {}", outcome.primary);
    println!("  companion: {}", outcome.companion);
    println!(
        "Context updates sent: primary {}, companion {}",
        outcome.primary_sends, outcome.companion_sends
    );
    Ok(())
}

fn endpoint(
    role: Role,
    link: LoopbackLink,
    events: UnboundedReceiver<LinkEvent>,
) -> (Endpoint, JoinHandle<()>) {
    let sync = Arc::new(Synchronizer::new(role, MemoryStore::new(), link));
    let pump = tokio::spawn(pump_link_events(events, Arc::clone(&sync)));
    (sync, pump)
}

async fn wait_active(endpoint: &Endpoint) -> Result<()> {
    let active = tokio::time::timeout(SETTLE_TIMEOUT, async {
        while endpoint.link_state().await != LinkState::Active {
            tokio::time::sleep(POLL).await;
        }
    })
    .await;
    if active.is_err() {
        bail!("{} link did not activate", endpoint.role());
    }
    Ok(())
}

/// Set `value` on `origin` while the link is down, then connect and wait
/// for the other endpoint to pick it up.
pub async fn simulate(origin: Role, value: IntervalMinutes) -> Result<Outcome> {
    let ((primary_link, primary_events), (companion_link, companion_events)) =
        LoopbackLink::pair();
    let link = primary_link.clone();
    let (primary, primary_pump) = endpoint(Role::Primary, primary_link, primary_events);
    let (companion, companion_pump) = endpoint(Role::Companion, companion_link, companion_events);

    let outcome = converge(origin, value, &link, &primary, &companion).await;
    // Each pump holds its endpoint, which holds the other end's sender.
    primary_pump.abort();
    companion_pump.abort();
    outcome
}

async fn converge(
    origin: Role,
    value: IntervalMinutes,
    link: &LoopbackLink,
    primary: &Endpoint,
    companion: &Endpoint,
) -> Result<Outcome> {
    primary.initialize().await;
    companion.initialize().await;
    wait_active(primary).await?;
    wait_active(companion).await?;

    let (source, target) = match origin {
        Role::Primary => (primary, companion),
        Role::Companion => (companion, primary),
    };

    println!("Link down; setting {} on the {}", value, origin);
    source.set_local_value(value).await;
    println!(
        "  primary: {}, companion: {}",
        primary.current_value(),
        companion.current_value()
    );

    println!("Bringing the link up");
    let mut observed = target.subscribe();
    link.set_connected(true);
    let delivered = tokio::time::timeout(SETTLE_TIMEOUT, async {
        observed.wait_for(|v| *v == value).await.map(|_| ())
    })
    .await;
    match delivered {
        Ok(Ok(_)) => {}
        Ok(Err(_)) => bail!("{} endpoint went away", target.role()),
        Err(_) => bail!("{} never received {}", target.role(), value),
    }

    // Give a bounce the chance to show up before reporting.
    tokio::time::sleep(POLL).await;

    Ok(Outcome {
        primary: primary.current_value(),
        companion: companion.current_value(),
        primary_sends: primary.link().accepted_count(),
        companion_sends: companion.link().accepted_count(),
    })
}
