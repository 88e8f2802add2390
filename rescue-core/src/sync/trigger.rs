//! Background trigger that runs drain passes on reconnect and on a timer.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::engine::{DrainOutcome, SyncEngine};

/// Spawns a task that drains on every offline→online edge of the engine's
/// gate and, when `interval` is set, on each tick while online.
///
/// The engine keeps its gate alive, so the task runs until the returned
/// handle is aborted.
pub fn spawn_auto_drain(engine: Arc<SyncEngine>, interval: Option<Duration>) -> JoinHandle<()> {
    let mut online = engine.connectivity().subscribe();

    tokio::spawn(async move {
        let mut ticker = interval.map(|period| {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        // Items may already be waiting from a previous session.
        if *online.borrow_and_update() {
            report(engine.drain().await);
        }

        loop {
            tokio::select! {
                changed = online.changed() => {
                    if changed.is_err() {
                        tracing::debug!("Connectivity gate closed, stopping auto-drain");
                        break;
                    }
                    if *online.borrow_and_update() {
                        report(engine.drain().await);
                    }
                }
                _ = tick(&mut ticker) => {
                    report(engine.drain().await);
                }
            }
        }
    })
}

async fn tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn report(outcome: DrainOutcome) {
    match &outcome {
        DrainOutcome::Drained { .. } => tracing::info!("Auto-sync: {}", outcome),
        DrainOutcome::Halted { .. } => tracing::warn!("Auto-sync: {}", outcome),
        _ => tracing::debug!("Auto-sync: {}", outcome),
    }
}
