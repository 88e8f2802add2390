use rescue_core::{
    init_db, ConnectivityGate, HttpAuthority, HttpClassifier, OutboxQueue, RescueService,
    StoreError, SyncEngine, User,
};
use std::sync::Arc;

use crate::config::Config;
use crate::sync::probe;

/// Everything a command needs, wired from the configuration.
pub struct App {
    pub user: User,
    pub service: RescueService,
    pub outbox: OutboxQueue,
    pub gate: ConnectivityGate,
    /// Present only when a sync server is configured.
    pub engine: Option<Arc<SyncEngine>>,
}

impl App {
    pub async fn open(config: &Config) -> Result<Self, StoreError> {
        let pool = init_db(&config.database_path.value).await?;
        let gate = ConnectivityGate::new(false);

        let mut service = RescueService::new(pool.clone(), gate.clone());
        if let Some(url) = &config.classifier_url {
            service = service.with_classifier(Arc::new(HttpClassifier::new(url.clone())));
        }

        let engine = config.sync.server_url.as_ref().map(|url| {
            let authority = Arc::new(HttpAuthority::new(url.clone()));
            Arc::new(
                SyncEngine::new(pool.clone(), authority, gate.clone())
                    .with_config(config.sync.engine_config()),
            )
        });

        Ok(Self {
            user: config.user.user(),
            service,
            outbox: OutboxQueue::new(pool),
            gate,
            engine,
        })
    }

    /// Probes the configured server so the gate reflects reality. Without a
    /// server the device is treated as offline.
    pub async fn detect_connectivity(&self, config: &Config) -> bool {
        match &config.sync.server_url {
            Some(url) => probe(&self.gate, url).await,
            None => false,
        }
    }
}
