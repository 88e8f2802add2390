use rescue_core::{check_server, ConnectivityGate};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Probes the server once and feeds the result into the gate.
pub async fn probe(gate: &ConnectivityGate, server_url: &str) -> bool {
    let online = check_server(server_url).await;
    gate.set_online(online);
    online
}

/// Keeps the gate current by probing every `period`.
pub fn spawn_presence_monitor(
    gate: ConnectivityGate,
    server_url: String,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            probe(&gate, &server_url).await;
            tokio::time::sleep(period).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_probe_unreachable_sets_offline() {
        let gate = ConnectivityGate::new(true);
        assert!(!probe(&gate, "http://127.0.0.1:9").await);
        assert!(!gate.is_online());
    }
}
