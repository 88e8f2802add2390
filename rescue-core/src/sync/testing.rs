//! In-process authorities for exercising the engine without a network.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

use super::error::RemoteError;
use super::remote::{Ack, RemoteAuthority};
use crate::models::SyncQueueItem;

/// Answers from a script, then acks everything once the script runs out.
#[derive(Default)]
pub(crate) struct ScriptedAuthority {
    script: Mutex<VecDeque<Result<Ack, RemoteError>>>,
    submitted: Mutex<Vec<Uuid>>,
}

impl ScriptedAuthority {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_script(script: Vec<Result<Ack, RemoteError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn submitted_ids(&self) -> Vec<Uuid> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteAuthority for ScriptedAuthority {
    async fn submit(&self, item: &SyncQueueItem) -> Result<Ack, RemoteError> {
        self.submitted.lock().unwrap().push(item.id);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Ack::default()))
    }
}

/// Parks every submission until the test releases it.
#[derive(Default)]
pub(crate) struct BlockingAuthority {
    entered: Notify,
    gate: Notify,
    submitted: Mutex<Vec<Uuid>>,
}

impl BlockingAuthority {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn wait_until_entered(&self) {
        self.entered.notified().await;
    }

    pub(crate) fn release(&self) {
        self.gate.notify_one();
    }

    pub(crate) fn submitted_ids(&self) -> Vec<Uuid> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl RemoteAuthority for BlockingAuthority {
    async fn submit(&self, item: &SyncQueueItem) -> Result<Ack, RemoteError> {
        self.submitted.lock().unwrap().push(item.id);
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(Ack::default())
    }
}

/// Takes `delay` to answer.
pub(crate) struct SlowAuthority {
    delay: Duration,
}

impl SlowAuthority {
    pub(crate) fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl RemoteAuthority for SlowAuthority {
    async fn submit(&self, _item: &SyncQueueItem) -> Result<Ack, RemoteError> {
        tokio::time::sleep(self.delay).await;
        Ok(Ack::default())
    }
}
