//! Auto-sync after write commands.
//!
//! Runs one drain pass when `auto_sync` is enabled and the server answered
//! its health probe. Anything that goes wrong leaves the items queued; the
//! CLI keeps working offline.

use rescue_core::DrainOutcome;

use crate::app::App;
use crate::config::Config;

pub async fn try_auto_sync(app: &App, config: &Config) {
    if !config.sync.auto_sync {
        return;
    }
    let Some(engine) = app.engine.as_ref() else {
        return;
    };

    if !engine.connectivity().is_online() {
        eprintln!("Auto-sync: server unreachable, changes kept pending");
        return;
    }

    match engine.drain().await {
        outcome @ DrainOutcome::Halted { .. } => eprintln!("Auto-sync: {}", outcome),
        outcome => tracing::debug!("Auto-sync: {}", outcome),
    }
}
