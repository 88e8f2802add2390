//! Connectivity gate fed by an external presence signal.

use std::sync::Arc;
use tokio::sync::watch;

/// Boolean online/offline signal with edge notifications.
///
/// The gate does not detect connectivity itself; whoever owns detection
/// calls [`ConnectivityGate::set_online`]. Clones share the same signal.
#[derive(Debug, Clone)]
pub struct ConnectivityGate {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectivityGate {
    pub fn new(online: bool) -> Self {
        let (tx, _rx) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Updates the signal. Subscribers are only woken on an actual change.
    ///
    /// Returns true if the value changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            tracing::info!(
                "Connectivity changed: {}",
                if online { "online" } else { "offline" }
            );
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityGate {
    fn default() -> Self {
        Self::new(false)
    }
}
