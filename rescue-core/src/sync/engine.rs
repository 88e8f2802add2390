//! Sync engine: drains the outbox against the remote authority.
//!
//! A pass snapshots the queue, submits items strictly in order and, for each
//! acknowledged item, applies the result to the local store before removing
//! the item. The first failure halts the pass so that no later item is ever
//! confirmed while an earlier one is still pending.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

use super::connectivity::ConnectivityGate;
use super::error::{DrainError, RemoteError};
use super::remote::RemoteAuthority;
use crate::db::{OutboxQueue, RequestStore, SyncStateRepo, TaskStore};
use crate::error::StoreError;
use crate::models::{SyncAction, SyncQueueItem};

/// Default bound on a single submission.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Slack added to the submit timeout when sizing the drain lease. The lease
/// is renewed before every item, so it only has to outlive one submission.
const LEASE_SLACK: Duration = Duration::from_secs(30);

/// What to do with an item the authority explicitly refused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionPolicy {
    /// Halt the pass and retry on the next trigger, like any other failure.
    #[default]
    Retry,
    /// Park the item in the dead-letter table and carry on.
    DeadLetter,
}

impl fmt::Display for RejectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionPolicy::Retry => write!(f, "retry"),
            RejectionPolicy::DeadLetter => write!(f, "dead-letter"),
        }
    }
}

impl FromStr for RejectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "retry" => Ok(RejectionPolicy::Retry),
            "dead-letter" | "dead_letter" => Ok(RejectionPolicy::DeadLetter),
            _ => Err(format!(
                "Invalid rejection policy '{}'. Valid options: retry, dead-letter",
                s
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub submit_timeout: Duration,
    pub on_rejection: RejectionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            on_rejection: RejectionPolicy::Retry,
        }
    }
}

/// Summary of one `drain` call, for whatever triggered it.
#[derive(Debug)]
pub enum DrainOutcome {
    /// Connectivity gate is offline; nothing attempted.
    Offline,
    /// Another pass is running; nothing attempted.
    AlreadyRunning,
    /// Queue was empty.
    Empty,
    /// Every item in the snapshot was handled.
    Drained {
        submitted: usize,
        dead_lettered: usize,
    },
    /// Stopped at the first failure; `remaining` items (starting with the
    /// failing one) are still queued.
    Halted {
        submitted: usize,
        remaining: usize,
        error: DrainError,
    },
}

impl DrainOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, DrainOutcome::Halted { .. })
    }
}

impl fmt::Display for DrainOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DrainOutcome::Offline => write!(f, "offline, nothing sent"),
            DrainOutcome::AlreadyRunning => write!(f, "a sync pass is already running"),
            DrainOutcome::Empty => write!(f, "nothing to sync"),
            DrainOutcome::Drained {
                submitted,
                dead_lettered: 0,
            } => write!(f, "synced {} item(s)", submitted),
            DrainOutcome::Drained {
                submitted,
                dead_lettered,
            } => write!(
                f,
                "synced {} item(s), {} rejected and set aside",
                submitted, dead_lettered
            ),
            DrainOutcome::Halted {
                submitted,
                remaining,
                error,
            } => write!(
                f,
                "synced {} item(s), {} still pending ({})",
                submitted, remaining, error
            ),
        }
    }
}

enum ItemOutcome {
    Applied,
    DeadLettered,
}

/// Clears the busy flag when a pass ends, however it ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncEngine {
    requests: RequestStore,
    tasks: TaskStore,
    outbox: OutboxQueue,
    state: SyncStateRepo,
    remote: Arc<dyn RemoteAuthority>,
    connectivity: ConnectivityGate,
    config: EngineConfig,
    busy: AtomicBool,
    lease_owner: String,
}

impl SyncEngine {
    pub fn new(
        pool: SqlitePool,
        remote: Arc<dyn RemoteAuthority>,
        connectivity: ConnectivityGate,
    ) -> Self {
        Self {
            requests: RequestStore::new(pool.clone()),
            tasks: TaskStore::new(pool.clone()),
            outbox: OutboxQueue::new(pool.clone()),
            state: SyncStateRepo::new(pool),
            remote,
            connectivity,
            config: EngineConfig::default(),
            busy: AtomicBool::new(false),
            lease_owner: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn connectivity(&self) -> &ConnectivityGate {
        &self.connectivity
    }

    pub fn is_draining(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn pending(&self) -> Result<usize, StoreError> {
        self.outbox.len().await
    }

    pub async fn last_drain_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.state.last_drain_at().await
    }

    /// Runs one drain pass if online and no other pass is running, in this
    /// process or another one sharing the database.
    ///
    /// Never panics or returns an error: failures are reported through the
    /// outcome and the affected items stay queued for the next trigger.
    pub async fn drain(&self) -> DrainOutcome {
        if !self.connectivity.is_online() {
            return DrainOutcome::Offline;
        }

        match self.outbox.is_empty().await {
            Ok(true) => return DrainOutcome::Empty,
            Ok(false) => {}
            Err(e) => return self.halted(0, 0, e.into()),
        }

        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            tracing::debug!("Drain requested while another pass is running");
            return DrainOutcome::AlreadyRunning;
        };

        // Other processes on the same database drain the same queue.
        match self.renew_lease().await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("Drain lease held by another process");
                return DrainOutcome::AlreadyRunning;
            }
            Err(e) => return self.halted(0, 0, e.into()),
        }

        let outcome = self.run_pass().await;

        if let Err(e) = self.state.release_drain_lease(&self.lease_owner).await {
            tracing::warn!("Failed to release drain lease: {}", e);
        }
        outcome
    }

    /// Takes the lease, or extends it when this engine already holds it.
    async fn renew_lease(&self) -> Result<bool, StoreError> {
        let ttl = chrono::Duration::from_std(self.config.submit_timeout + LEASE_SLACK)
            .unwrap_or_else(|_| chrono::Duration::seconds(LEASE_SLACK.as_secs() as i64));
        self.state
            .try_acquire_drain_lease(&self.lease_owner, Utc::now(), ttl)
            .await
    }

    async fn run_pass(&self) -> DrainOutcome {
        let snapshot = match self.outbox.snapshot().await {
            Ok(items) => items,
            Err(e) => return self.halted(0, 0, e.into()),
        };
        if snapshot.is_empty() {
            return DrainOutcome::Empty;
        }

        tracing::info!("Syncing {} item(s) to remote authority", snapshot.len());

        let total = snapshot.len();
        let mut submitted = 0;
        let mut dead_lettered = 0;

        for (index, item) in snapshot.iter().enumerate() {
            if index > 0 {
                match self.renew_lease().await {
                    Ok(true) => {}
                    Ok(false) => {
                        return self.halted(submitted, total - index, DrainError::LeaseLost)
                    }
                    Err(e) => return self.halted(submitted, total - index, e.into()),
                }
            }
            match self.process(item).await {
                Ok(ItemOutcome::Applied) => submitted += 1,
                Ok(ItemOutcome::DeadLettered) => dead_lettered += 1,
                Err(error) => return self.halted(submitted, total - index, error),
            }
        }

        if let Err(e) = self.state.record_drain(Utc::now()).await {
            tracing::warn!("Failed to record last sync time: {}", e);
        }

        tracing::info!(
            "Sync pass complete: {} submitted, {} dead-lettered",
            submitted,
            dead_lettered
        );
        DrainOutcome::Drained {
            submitted,
            dead_lettered,
        }
    }

    fn halted(&self, submitted: usize, remaining: usize, error: DrainError) -> DrainOutcome {
        tracing::warn!(
            "Sync pass halted after {} item(s), {} pending: {}",
            submitted,
            remaining,
            error
        );
        DrainOutcome::Halted {
            submitted,
            remaining,
            error,
        }
    }

    async fn process(&self, item: &SyncQueueItem) -> Result<ItemOutcome, DrainError> {
        let result = match timeout(self.config.submit_timeout, self.remote.submit(item)).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Unavailable(format!(
                "no response within {:?}",
                self.config.submit_timeout
            ))),
        };

        match result {
            Ok(ack) => {
                if ack.duplicate {
                    tracing::debug!("Item {} was already accepted remotely", item.id);
                }
                self.apply_ack(item).await?;
                self.outbox.remove(item.id).await?;
                Ok(ItemOutcome::Applied)
            }
            Err(e) if e.is_rejection() && self.config.on_rejection == RejectionPolicy::DeadLetter => {
                tracing::warn!("Item {} ({}) dead-lettered: {}", item.id, item.action.tag(), e);
                self.outbox.dead_letter(item, &e.to_string()).await?;
                Ok(ItemOutcome::DeadLettered)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Applies an acknowledged item to the local store. Re-applying the same
    /// item is harmless, which keeps crash-and-resubmit safe.
    async fn apply_ack(&self, item: &SyncQueueItem) -> Result<(), StoreError> {
        let found = match &item.action {
            SyncAction::CreateRequest(request) => self.requests.mark_synced(request.id).await?,
            SyncAction::UpdateStatus { request_id, status } => {
                // A newer queued status already sits in the record; don't roll it back.
                if self.outbox.has_later_status_update(item).await? {
                    self.requests.mark_synced(*request_id).await?
                } else {
                    self.requests.apply_status(*request_id, *status).await?
                }
            }
            SyncAction::AssignTask(task) => self.tasks.mark_synced(task.id).await?,
        };

        if !found {
            tracing::debug!(
                "No local record {} for acknowledged {} item {}",
                item.action.target_id(),
                item.action.tag(),
                item.id
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_db, RequestStore};
    use crate::models::{RequestStatus, RescueRequest, Role, Urgency, User, VolunteerTask};
    use crate::sync::testing::{BlockingAuthority, ScriptedAuthority, SlowAuthority};
    use crate::sync::Ack;
    use tempfile::TempDir;

    struct TestContext {
        pool: SqlitePool,
        requests: RequestStore,
        outbox: OutboxQueue,
        gate: ConnectivityGate,
        _temp_dir: TempDir,
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(temp_dir.path().join("test.db")).await.unwrap();
        TestContext {
            requests: RequestStore::new(pool.clone()),
            outbox: OutboxQueue::new(pool.clone()),
            pool,
            gate: ConnectivityGate::new(true),
            _temp_dir: temp_dir,
        }
    }

    impl TestContext {
        fn engine(&self, remote: Arc<dyn RemoteAuthority>) -> SyncEngine {
            SyncEngine::new(self.pool.clone(), remote, self.gate.clone())
        }

        /// Stores a request and queues its create item, like the service does.
        async fn create(&self, description: &str) -> (RescueRequest, SyncQueueItem) {
            let user = User::new("u-1", Role::Citizen).with_name("Mina");
            let request = RescueRequest::new(&user, description, Urgency::Medium);
            self.requests.put(&request).await.unwrap();
            let item = SyncQueueItem::new(SyncAction::CreateRequest(request.clone()));
            self.outbox.enqueue(&item).await.unwrap();
            (request, item)
        }
    }

    #[tokio::test]
    async fn test_drain_marks_synced_and_empties_queue() {
        let ctx = setup().await;
        let (request, item) = ctx.create("Flooded basement").await;
        let remote = Arc::new(ScriptedAuthority::new());
        let engine = ctx.engine(remote.clone());

        let outcome = engine.drain().await;

        assert!(matches!(
            outcome,
            DrainOutcome::Drained {
                submitted: 1,
                dead_lettered: 0
            }
        ));
        assert_eq!(remote.submitted_ids(), vec![item.id]);
        assert!(ctx.requests.get(request.id).await.unwrap().unwrap().synced);
        assert!(ctx.outbox.is_empty().await.unwrap());
        assert!(engine.last_drain_at().await.unwrap().is_some());
        assert!(!engine.is_draining());
    }

    #[tokio::test]
    async fn test_failure_halts_in_fifo_order() {
        let ctx = setup().await;
        let (r1, i1) = ctx.create("first").await;
        let (r2, i2) = ctx.create("second").await;
        let (r3, i3) = ctx.create("third").await;

        let remote = Arc::new(ScriptedAuthority::with_script(vec![
            Ok(Ack::default()),
            Err(RemoteError::Unavailable("connection reset".into())),
        ]));
        let engine = ctx.engine(remote.clone());

        let outcome = engine.drain().await;

        match outcome {
            DrainOutcome::Halted {
                submitted,
                remaining,
                error,
            } => {
                assert_eq!(submitted, 1);
                assert_eq!(remaining, 2);
                assert!(matches!(
                    error,
                    DrainError::Remote(RemoteError::Unavailable(_))
                ));
            }
            other => panic!("expected halted pass, got {:?}", other),
        }

        // i3 was never attempted
        assert_eq!(remote.submitted_ids(), vec![i1.id, i2.id]);
        assert!(ctx.requests.get(r1.id).await.unwrap().unwrap().synced);
        assert!(!ctx.requests.get(r2.id).await.unwrap().unwrap().synced);
        assert!(!ctx.requests.get(r3.id).await.unwrap().unwrap().synced);
        assert_eq!(ctx.outbox.snapshot().await.unwrap(), vec![i2, i3]);
        assert!(engine.last_drain_at().await.unwrap().is_none());
        assert!(!engine.is_draining());
    }

    #[tokio::test]
    async fn test_rejection_retries_by_default() {
        let ctx = setup().await;
        let (_, item) = ctx.create("bad payload").await;
        let remote = Arc::new(ScriptedAuthority::with_script(vec![Err(
            RemoteError::Rejected("people_count must be positive".into()),
        )]));
        let engine = ctx.engine(remote);

        assert!(engine.drain().await.is_failure());
        assert_eq!(ctx.outbox.snapshot().await.unwrap(), vec![item]);

        // next trigger retries and succeeds
        assert!(matches!(
            engine.drain().await,
            DrainOutcome::Drained { submitted: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_dead_letter_policy_skips_rejected_item() {
        let ctx = setup().await;
        let (r1, i1) = ctx.create("rejected").await;
        let (r2, _) = ctx.create("accepted").await;
        let remote = Arc::new(ScriptedAuthority::with_script(vec![Err(
            RemoteError::Rejected("invalid".into()),
        )]));
        let engine = ctx.engine(remote).with_config(EngineConfig {
            on_rejection: RejectionPolicy::DeadLetter,
            ..EngineConfig::default()
        });

        let outcome = engine.drain().await;

        assert!(matches!(
            outcome,
            DrainOutcome::Drained {
                submitted: 1,
                dead_lettered: 1
            }
        ));
        assert!(!ctx.requests.get(r1.id).await.unwrap().unwrap().synced);
        assert!(ctx.requests.get(r2.id).await.unwrap().unwrap().synced);
        assert!(ctx.outbox.is_empty().await.unwrap());
        let parked = ctx.outbox.dead_letters().await.unwrap();
        assert_eq!(parked.len(), 1);
        assert_eq!(parked[0].item.id, i1.id);
    }

    #[tokio::test]
    async fn test_dead_letter_policy_still_halts_on_unavailable() {
        let ctx = setup().await;
        ctx.create("one").await;
        let remote = Arc::new(ScriptedAuthority::with_script(vec![Err(
            RemoteError::Unavailable("down".into()),
        )]));
        let engine = ctx.engine(remote).with_config(EngineConfig {
            on_rejection: RejectionPolicy::DeadLetter,
            ..EngineConfig::default()
        });

        assert!(engine.drain().await.is_failure());
        assert_eq!(ctx.outbox.len().await.unwrap(), 1);
        assert!(ctx.outbox.dead_letters().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_drain_is_noop() {
        let ctx = setup().await;
        ctx.create("offline").await;
        ctx.gate.set_online(false);
        let remote = Arc::new(ScriptedAuthority::new());
        let engine = ctx.engine(remote.clone());

        assert!(matches!(engine.drain().await, DrainOutcome::Offline));
        assert!(remote.submitted_ids().is_empty());
        assert_eq!(ctx.outbox.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_queue_is_noop() {
        let ctx = setup().await;
        let remote = Arc::new(ScriptedAuthority::new());
        let engine = ctx.engine(remote.clone());

        assert!(matches!(engine.drain().await, DrainOutcome::Empty));
        assert!(remote.submitted_ids().is_empty());
        assert!(engine.last_drain_at().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_drain_is_single_flight() {
        let ctx = setup().await;
        let (_, item) = ctx.create("only one pass").await;
        let remote = Arc::new(BlockingAuthority::new());
        let engine = Arc::new(ctx.engine(remote.clone()));

        let first = tokio::spawn({
            let engine = engine.clone();
            async move { engine.drain().await }
        });
        remote.wait_until_entered().await;
        assert!(engine.is_draining());

        let second = engine.drain().await;
        assert!(matches!(second, DrainOutcome::AlreadyRunning));

        remote.release();
        let first = first.await.unwrap();
        assert!(matches!(first, DrainOutcome::Drained { submitted: 1, .. }));
        assert_eq!(remote.submitted_ids(), vec![item.id]);
        assert!(!engine.is_draining());
    }

    #[tokio::test]
    async fn test_drain_is_single_flight_across_processes() {
        let ctx = setup().await;
        let (_, item) = ctx.create("one pass per device").await;
        let path = ctx._temp_dir.path().join("test.db");

        // a second process opens its own pool on the same file
        let other_pool = init_db(&path).await.unwrap();
        let remote = Arc::new(BlockingAuthority::new());
        let first = Arc::new(ctx.engine(remote.clone()));
        let second = SyncEngine::new(other_pool, remote.clone(), ctx.gate.clone());

        let pass = tokio::spawn({
            let first = first.clone();
            async move { first.drain().await }
        });
        remote.wait_until_entered().await;

        assert!(matches!(second.drain().await, DrainOutcome::AlreadyRunning));
        assert_eq!(remote.submitted_ids(), vec![item.id]);

        remote.release();
        assert!(matches!(
            pass.await.unwrap(),
            DrainOutcome::Drained { submitted: 1, .. }
        ));

        // lease released: the other process can drain once there is work
        let (_, next) = ctx.create("after the first pass").await;
        let drained = tokio::spawn(async move { second.drain().await });
        remote.wait_until_entered().await;
        remote.release();
        assert!(matches!(
            drained.await.unwrap(),
            DrainOutcome::Drained { submitted: 1, .. }
        ));
        assert_eq!(remote.submitted_ids(), vec![item.id, next.id]);
    }

    #[tokio::test]
    async fn test_enqueue_during_drain_is_kept() {
        let ctx = setup().await;
        ctx.create("before").await;
        let remote = Arc::new(BlockingAuthority::new());
        let engine = Arc::new(ctx.engine(remote.clone()));

        let pass = tokio::spawn({
            let engine = engine.clone();
            async move { engine.drain().await }
        });
        remote.wait_until_entered().await;
        let (_, late) = ctx.create("during").await;
        remote.release();
        pass.await.unwrap();

        // the late item was not part of the snapshot and waits for the next pass
        assert_eq!(ctx.outbox.snapshot().await.unwrap(), vec![late]);
    }

    #[tokio::test]
    async fn test_submit_timeout_is_unavailable() {
        let ctx = setup().await;
        ctx.create("slow").await;
        let engine = ctx
            .engine(Arc::new(SlowAuthority::new(Duration::from_secs(5))))
            .with_config(EngineConfig {
                submit_timeout: Duration::from_millis(50),
                ..EngineConfig::default()
            });

        match engine.drain().await {
            DrainOutcome::Halted { error, .. } => assert!(matches!(
                error,
                DrainError::Remote(RemoteError::Unavailable(_))
            )),
            other => panic!("expected timeout to halt the pass, got {:?}", other),
        }
        assert_eq!(ctx.outbox.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_resubmission_after_crash_is_harmless() {
        let ctx = setup().await;
        let (request, item) = ctx.create("crash between ack and remove").await;
        let remote = Arc::new(ScriptedAuthority::new());
        let engine = ctx.engine(remote.clone());

        // the authority accepted it and the store was updated, but the
        // process died before the item was removed
        remote.submit(&item).await.unwrap();
        ctx.requests.mark_synced(request.id).await.unwrap();
        let before = ctx.requests.get(request.id).await.unwrap().unwrap();

        let outcome = engine.drain().await;

        assert!(matches!(outcome, DrainOutcome::Drained { submitted: 1, .. }));
        assert_eq!(remote.submitted_ids(), vec![item.id, item.id]);
        assert_eq!(ctx.requests.get(request.id).await.unwrap().unwrap(), before);
        assert!(ctx.outbox.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_status_ack_does_not_roll_back_newer_local_status() {
        let ctx = setup().await;
        let (request, _) = ctx.create("accept then complete").await;

        let mut local = request.clone();
        local.status = RequestStatus::Completed;
        ctx.requests.put(&local).await.unwrap();
        for status in [RequestStatus::InProgress, RequestStatus::Completed] {
            ctx.outbox
                .enqueue(&SyncQueueItem::new(SyncAction::UpdateStatus {
                    request_id: request.id,
                    status,
                }))
                .await
                .unwrap();
        }

        // create and first status ack, then the authority goes away
        let remote = Arc::new(ScriptedAuthority::with_script(vec![
            Ok(Ack::default()),
            Ok(Ack::default()),
            Err(RemoteError::Unavailable("gone".into())),
        ]));
        let engine = ctx.engine(remote);
        assert!(engine.drain().await.is_failure());

        let stored = ctx.requests.get(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Completed);
        assert!(stored.synced);

        assert!(matches!(
            engine.drain().await,
            DrainOutcome::Drained { submitted: 1, .. }
        ));
        let stored = ctx.requests.get(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, RequestStatus::Completed);
    }

    #[tokio::test]
    async fn test_missing_record_is_tolerated() {
        let ctx = setup().await;
        let task = VolunteerTask::new(uuid::Uuid::now_v7(), "v-9");
        ctx.outbox
            .enqueue(&SyncQueueItem::new(SyncAction::AssignTask(task)))
            .await
            .unwrap();
        ctx.outbox
            .enqueue(&SyncQueueItem::new(SyncAction::UpdateStatus {
                request_id: uuid::Uuid::now_v7(),
                status: RequestStatus::Assigned,
            }))
            .await
            .unwrap();
        let engine = ctx.engine(Arc::new(ScriptedAuthority::new()));

        assert!(matches!(
            engine.drain().await,
            DrainOutcome::Drained { submitted: 2, .. }
        ));
        assert!(ctx.outbox.is_empty().await.unwrap());
    }

    #[test]
    fn test_rejection_policy_parse() {
        assert_eq!(
            "dead-letter".parse::<RejectionPolicy>().unwrap(),
            RejectionPolicy::DeadLetter
        );
        assert_eq!(
            "RETRY".parse::<RejectionPolicy>().unwrap(),
            RejectionPolicy::Retry
        );
        assert!("drop".parse::<RejectionPolicy>().is_err());
    }
}
