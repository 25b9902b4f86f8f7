//! Sync engine.
//!
//! `SyncCore` owns the cache, both queues and the connectivity flags. Every
//! change to them happens inside one short critical section on a std mutex
//! that is never held across an await. Draining replays the queues against
//! the server one call at a time and is guarded against re-entrancy.

use crate::cache::CacheSnapshot;
use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{SyncError, SyncResult};
use crate::operation::{OneOffOp, StatusOp};
use crate::persist;
use crate::queue::{CreateResolution, OneOffQueue, StatusQueue};
use crate::status::{ConnectionStatus, SyncActivity, SyncStatus};
use api_client::{ApiError, TaskApi};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use task_model::{EntityId, OneOffTodo, TaskStatus};
use tokio::sync::Notify;

/// Why a drain request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Offline,
    Unreachable,
    AlreadyRunning,
    NothingToDo,
}

/// Summary of one drain cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    /// Operations the server accepted
    pub applied: usize,
    /// Operations that failed and stay queued
    pub failed: usize,
    /// Operations not attempted: connectivity dropped, or a direct call
    /// for the same entity was still on the wire
    pub skipped: usize,
    /// Whether the cycle stopped early
    pub interrupted: bool,
    /// Temporary ids replaced by server ids, as `(temporary, server)`
    pub remapped: Vec<(EntityId, EntityId)>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl DrainReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && !self.interrupted
    }
}

/// Result of a drain request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrainOutcome {
    Skipped(SkipReason),
    Completed(DrainReport),
}

impl DrainOutcome {
    pub fn report(&self) -> Option<&DrainReport> {
        match self {
            DrainOutcome::Completed(report) => Some(report),
            DrainOutcome::Skipped(_) => None,
        }
    }
}

/// Mutable sync state, guarded by `SyncCore::state`.
#[derive(Debug, Default)]
pub(crate) struct SyncState {
    pub cache: Arc<CacheSnapshot>,
    pub status_queue: StatusQueue,
    pub oneoff_queue: OneOffQueue,
    /// Temporary ids whose create request is on the wire
    pub in_flight_creates: HashSet<EntityId>,
    /// Direct (non-queued) todo status calls on the wire
    pub direct_todos: HashMap<EntityId, TaskStatus>,
    /// Direct (non-queued) one-off calls on the wire
    pub direct_oneoffs: HashMap<EntityId, OneOffOp>,
    pub last_sync: Option<DateTime<Utc>>,
    pub load_error: Option<String>,
    pub last_drain: Option<DrainReport>,
}

impl SyncState {
    /// Next temporary id: one below every temporary id still alive.
    pub fn next_temp_id(&self) -> EntityId {
        let lowest = [
            self.cache.min_temp_id(),
            self.oneoff_queue.min_temp_id(),
            self.in_flight_creates.iter().copied().min(),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(0);
        lowest.min(0) - 1
    }

    pub fn pending_count(&self) -> usize {
        self.status_queue.len() + self.oneoff_queue.len()
    }

    pub fn has_pending(&self) -> bool {
        !self.status_queue.is_empty() || !self.oneoff_queue.is_empty()
    }

    pub fn set_cache(&mut self, cache: CacheSnapshot) {
        self.cache = Arc::new(cache);
    }

    /// Server data with local intent on top: direct calls still on the wire
    /// first, then the queues, which are newer.
    fn overlay_local(&self, fresh: CacheSnapshot) -> CacheSnapshot {
        let direct_statuses =
            StatusQueue::from_ops(self.direct_todos.iter().map(|(&id, &status)| StatusOp::new(id, status)).collect());
        let direct_oneoffs = OneOffQueue::from_ops(self.direct_oneoffs.values().cloned().collect());
        fresh
            .overlay_pending(&direct_statuses, &direct_oneoffs)
            .overlay_pending(&self.status_queue, &self.oneoff_queue)
    }
}

/// Clears the re-entrancy flag when a drain ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Shared core behind `TaskClient` and the scheduler.
pub struct SyncCore<A> {
    pub(crate) api: A,
    store: Arc<dyn store::KeyValueStore>,
    pub(crate) config: SyncConfig,
    pub(crate) monitor: ConnectivityMonitor,
    state: Mutex<SyncState>,
    draining: AtomicBool,
    pub(crate) wake: Notify,
}

impl<A: TaskApi> SyncCore<A> {
    pub fn new(api: A, store: Arc<dyn store::KeyValueStore>, config: SyncConfig) -> Self {
        let monitor = ConnectivityMonitor::new(config.health_check_timeout);
        Self {
            api,
            store,
            config,
            monitor,
            state: Mutex::new(SyncState::default()),
            draining: AtomicBool::new(false),
            wake: Notify::new(),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SyncState> {
        // A panic inside a critical section leaves plain data behind
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Persist queues, then cache.
    pub(crate) fn persist(&self, state: &SyncState) {
        persist::save_queues(self.store.as_ref(), &state.status_queue, &state.oneoff_queue);
        persist::save_cache(self.store.as_ref(), &state.cache);
    }

    pub(crate) fn persist_queues(&self, state: &SyncState) {
        persist::save_queues(self.store.as_ref(), &state.status_queue, &state.oneoff_queue);
    }

    /// Ask the scheduler to run a sync soon.
    pub(crate) fn request_sync(&self) {
        self.wake.notify_one();
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub fn cache(&self) -> Arc<CacheSnapshot> {
        Arc::clone(&self.lock().cache)
    }

    pub fn has_pending(&self) -> bool {
        self.lock().has_pending()
    }

    /// Replace in-memory state with what the store holds.
    pub fn restore(&self) {
        let restored = persist::restore(self.store.as_ref());
        let mut state = self.lock();
        state.set_cache(restored.cache);
        state.status_queue = restored.status_queue;
        state.oneoff_queue = restored.oneoff_queue;
    }

    /// Fetch server state and make it the cache, with pending work overlaid.
    ///
    /// On failure the cached data stays and the error is kept as the load
    /// error until a later refresh succeeds.
    pub async fn refresh(&self) -> SyncResult<()> {
        let fetched = tokio::try_join!(
            self.api.list_categories(),
            self.api.list_recommended_todos(),
            self.api.list_oneoffs(),
        );

        let (categories, recommended, oneoffs) = match fetched {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Failed to load tasks from server: {}", e);
                if matches!(e, ApiError::Transport(_) | ApiError::Timeout) {
                    self.monitor.set_server_reachable(false);
                }
                self.lock().load_error = Some(e.to_string());
                return Err(SyncError::Api(e));
            }
        };

        let mut state = self.lock();
        let merged = state.overlay_local(CacheSnapshot::new(categories, recommended, oneoffs));
        state.set_cache(merged);
        state.load_error = None;
        persist::save_cache(self.store.as_ref(), &state.cache);
        tracing::debug!(
            categories = state.cache.categories.len(),
            oneoffs = state.cache.oneoffs.len(),
            "Refreshed cache from server"
        );
        Ok(())
    }

    /// Probe the server, then drain if allowed.
    pub async fn sync_now(&self) -> DrainOutcome {
        if !self.monitor.browser_online() {
            return DrainOutcome::Skipped(SkipReason::Offline);
        }
        if !self.monitor.probe(&self.api).await {
            return DrainOutcome::Skipped(SkipReason::Unreachable);
        }
        self.drain().await
    }

    /// Sleep between remote calls and confirm connectivity before the next.
    async fn pace(&self, first: &mut bool) -> bool {
        if !*first && !self.config.drain_delay.is_zero() {
            tokio::time::sleep(self.config.drain_delay).await;
        }
        *first = false;
        self.monitor.can_sync()
    }

    /// Replay both queues against the server.
    pub async fn drain(&self) -> DrainOutcome {
        if !self.monitor.browser_online() {
            return DrainOutcome::Skipped(SkipReason::Offline);
        }
        if !self.monitor.server_reachable() {
            return DrainOutcome::Skipped(SkipReason::Unreachable);
        }
        if self.draining.swap(true, Ordering::SeqCst) {
            return DrainOutcome::Skipped(SkipReason::AlreadyRunning);
        }
        let _guard = DrainGuard(&self.draining);

        let status_ops = {
            let mut state = self.lock();
            if !state.has_pending() {
                return DrainOutcome::Skipped(SkipReason::NothingToDo);
            }
            state.status_queue.compress();
            self.persist_queues(&state);
            state.status_queue.ops().to_vec()
        };

        let mut report = DrainReport::default();
        let mut first = true;
        tracing::debug!(status_ops = status_ops.len(), "Drain started");

        for (index, op) in status_ops.iter().enumerate() {
            // Stays queued behind the direct call; sent on a later drain
            if self.lock().direct_todos.contains_key(&op.id) {
                tracing::debug!(id = op.id, "Direct call in flight, leaving status queued");
                report.skipped += 1;
                continue;
            }
            if !self.pace(&mut first).await {
                report.interrupted = true;
                report.skipped += status_ops.len() - index;
                break;
            }
            self.send_status(*op, &mut report).await;
        }

        if report.interrupted {
            report.skipped += self.lock().oneoff_queue.len();
        } else {
            self.drain_oneoffs(&mut first, &mut report).await;
        }

        report.finished_at = Some(Utc::now());
        {
            let mut state = self.lock();
            if report.is_clean() {
                state.last_sync = report.finished_at;
            }
            state.last_drain = Some(report.clone());
            self.persist(&state);
        }

        tracing::info!(
            applied = report.applied,
            failed = report.failed,
            skipped = report.skipped,
            interrupted = report.interrupted,
            "Drain finished"
        );
        DrainOutcome::Completed(report)
    }

    async fn send_status(&self, op: StatusOp, report: &mut DrainReport) {
        match self.api.update_todo_status(op.id, op.status).await {
            Ok(()) => {
                report.applied += 1;
                let mut state = self.lock();
                state.status_queue.remove_if_matches(op.id, op.status);
                self.persist_queues(&state);
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(id = op.id, "Status update failed, keeping it queued: {}", e);
            }
        }
    }

    async fn drain_oneoffs(&self, first: &mut bool, report: &mut DrainReport) {
        let ops = {
            let mut state = self.lock();
            state.oneoff_queue.compress();
            self.persist_queues(&state);
            state.oneoff_queue.ops().to_vec()
        };
        tracing::debug!(oneoff_ops = ops.len(), "Replaying one-off operations");

        for (index, op) in ops.iter().enumerate() {
            if !op.is_create() && self.lock().direct_oneoffs.contains_key(&op.target_id()) {
                tracing::debug!(id = op.target_id(), "Direct call in flight, leaving operation queued");
                report.skipped += 1;
                continue;
            }
            if !self.pace(first).await {
                report.interrupted = true;
                report.skipped += ops.len() - index;
                break;
            }
            match op {
                OneOffOp::Create { .. } => self.send_create(op, report).await,
                _ => self.send_oneoff_change(op, report).await,
            }
        }
    }

    async fn send_create(&self, op: &OneOffOp, report: &mut DrainReport) {
        let client_id = op.target_id();
        if !self.lock().in_flight_creates.insert(client_id) {
            tracing::debug!(client_id, "Create already on the wire");
            report.skipped += 1;
            return;
        }

        match self.submit_create(op).await {
            Some(Ok(created)) => {
                report.applied += 1;
                report.remapped.push((client_id, created.id));
            }
            Some(Err(e)) => {
                report.failed += 1;
                tracing::warn!(client_id, "Create failed, keeping it queued: {}", e);
            }
            None => {}
        }
    }

    /// Send a queued create whose temporary id is already in flight, then
    /// settle it: resolve the queue entry and swap the cached placeholder.
    ///
    /// Returns the entity as cached, or `None` if `sent` is not a create.
    /// On failure the create stays queued.
    pub(crate) async fn submit_create(&self, sent: &OneOffOp) -> Option<Result<OneOffTodo, ApiError>> {
        let client_id = sent.target_id();
        let (OneOffOp::Create { status, .. }, Some(payload)) = (sent, sent.create_payload()) else {
            self.lock().in_flight_creates.remove(&client_id);
            return None;
        };

        let mut created = match self.api.create_oneoff(&payload).await {
            Ok(created) => created,
            Err(e) => {
                self.lock().in_flight_creates.remove(&client_id);
                return Some(Err(e));
            }
        };

        // The create endpoint ignores status; apply a requested one after.
        if let Some(wanted) = (*status).filter(|s| *s != TaskStatus::Incomplete) {
            match self.api.update_oneoff_status(created.id, wanted).await {
                Ok(()) => created.status = wanted,
                Err(e) => tracing::warn!(id = created.id, "Follow-up status for created one-off failed: {}", e),
            }
        }

        let mut state = self.lock();
        let resolution = state.oneoff_queue.resolve_create(sent, created.id);
        let entity = match &resolution {
            CreateResolution::Amended(patch) => created.patched(patch),
            _ => created,
        };
        let next = state.cache.with_created_oneoff(client_id, entity.clone());
        state.set_cache(next);
        state.in_flight_creates.remove(&client_id);
        self.persist(&state);

        tracing::debug!(client_id, id = entity.id, ?resolution, "Create confirmed");
        Some(Ok(entity))
    }

    async fn send_oneoff_change(&self, op: &OneOffOp, report: &mut DrainReport) {
        let result = match op {
            OneOffOp::Status { id, status } => self.api.update_oneoff_status(*id, *status).await,
            OneOffOp::Update { id, patch } => self.api.update_oneoff(*id, patch).await.map(|_| ()),
            // Already gone server-side counts as done
            OneOffOp::Delete { id } => match self.api.delete_oneoff(*id).await {
                Err(e) if e.is_not_found() => Ok(()),
                other => other,
            },
            OneOffOp::Create { .. } => return,
        };

        match result {
            Ok(()) => {
                report.applied += 1;
                let mut state = self.lock();
                state.oneoff_queue.remove_exact(op);
                self.persist_queues(&state);
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(id = op.target_id(), "One-off operation failed, keeping it queued: {}", e);
            }
        }
    }

    pub fn sync_status(&self) -> SyncStatus {
        let state = self.lock();
        let activity = if self.is_draining() {
            SyncActivity::Syncing
        } else {
            SyncActivity::Idle
        };
        let browser_online = self.monitor.browser_online();
        let server_reachable = self.monitor.server_reachable();
        SyncStatus {
            state: activity,
            connection: ConnectionStatus::derive(browser_online, server_reachable, activity),
            pending_operations: state.pending_count(),
            browser_online,
            server_reachable,
            last_sync: state.last_sync,
            load_error: state.load_error.clone(),
        }
    }

    pub fn last_drain(&self) -> Option<DrainReport> {
        self.lock().last_drain.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::fake::{ApiCall, FakeTaskApi};
    use std::time::Duration;
    use store::MemoryStore;
    use task_model::{Category, OneOffTodo, Todo};

    fn core(api: FakeTaskApi) -> SyncCore<FakeTaskApi> {
        let config = SyncConfig::default().with_drain_delay(Duration::ZERO);
        SyncCore::new(api, Arc::new(MemoryStore::new()), config)
    }

    #[test]
    fn test_next_temp_id() {
        let mut state = SyncState::default();
        assert_eq!(state.next_temp_id(), -1);

        state.set_cache(CacheSnapshot::new(vec![], vec![], vec![OneOffTodo::new(-2, "a")]));
        assert_eq!(state.next_temp_id(), -3);

        state.oneoff_queue.push(OneOffOp::create(-5, "b", None));
        assert_eq!(state.next_temp_id(), -6);

        state.in_flight_creates.insert(-9);
        assert_eq!(state.next_temp_id(), -10);
    }

    #[tokio::test]
    async fn test_drain_skips() {
        let sync = core(FakeTaskApi::new());
        assert_eq!(sync.drain().await, DrainOutcome::Skipped(SkipReason::NothingToDo));

        sync.monitor.set_server_reachable(false);
        assert_eq!(sync.drain().await, DrainOutcome::Skipped(SkipReason::Unreachable));

        sync.monitor.set_browser_online(false);
        assert_eq!(sync.drain().await, DrainOutcome::Skipped(SkipReason::Offline));
    }

    #[tokio::test]
    async fn test_drain_reentrancy_guard() {
        let sync = core(FakeTaskApi::new());
        sync.draining.store(true, Ordering::SeqCst);
        assert_eq!(sync.drain().await, DrainOutcome::Skipped(SkipReason::AlreadyRunning));
    }

    #[tokio::test]
    async fn test_drain_status_queue() {
        let api = FakeTaskApi::new().with_categories(vec![Category::new(1, "Home")
            .with_todo(Todo::new(7, "Dishes", 1))
            .with_todo(Todo::new(8, "Laundry", 1))]);
        let sync = core(api);
        {
            let mut state = sync.lock();
            state.status_queue.push(StatusOp::new(7, TaskStatus::InProgress));
            state.status_queue.push(StatusOp::new(8, TaskStatus::Skipped));
            state.status_queue.push(StatusOp::new(7, TaskStatus::Complete));
        }

        let outcome = sync.drain().await;
        let report = outcome.report().unwrap();
        assert_eq!(report.applied, 2);
        assert!(report.is_clean());
        assert!(!sync.has_pending());
        assert!(sync.sync_status().last_sync.is_some());
        assert_eq!(sync.api.todo_status(7), Some(TaskStatus::Complete));
        assert!(!sync.is_draining());
    }

    #[tokio::test]
    async fn test_create_with_status_uses_follow_up_call() {
        let sync = core(FakeTaskApi::new());
        let create = OneOffOp::Create {
            client_id: -1,
            title: "Buy milk".into(),
            description: None,
            status: Some(TaskStatus::InProgress),
        };
        {
            let mut state = sync.lock();
            let placeholder = create.placeholder().unwrap();
            state.set_cache(CacheSnapshot::default().with_oneoff(placeholder));
            state.oneoff_queue.push(create);
        }

        let outcome = sync.drain().await;
        let report = outcome.report().unwrap();
        assert_eq!(report.remapped, vec![(-1, 100)]);

        let calls = sync.api.mutation_calls();
        assert!(matches!(calls[0], ApiCall::CreateOneOff(_)));
        assert_eq!(
            calls[1],
            ApiCall::UpdateOneOffStatus {
                id: 100,
                status: TaskStatus::InProgress
            }
        );

        let cache = sync.cache();
        assert_eq!(cache.find_oneoff(100).map(|o| o.status), Some(TaskStatus::InProgress));
        assert!(cache.find_oneoff(-1).is_none());
    }

    #[tokio::test]
    async fn test_follow_up_status_failure_is_swallowed() {
        let api = FakeTaskApi::new();
        api.fail_oneoff_status(true);
        let sync = core(api);
        sync.lock().oneoff_queue.push(OneOffOp::Create {
            client_id: -1,
            title: "Buy milk".into(),
            description: None,
            status: Some(TaskStatus::Complete),
        });

        let outcome = sync.drain().await;
        assert!(outcome.report().unwrap().is_clean());
        assert!(!sync.has_pending());
    }

    #[tokio::test]
    async fn test_delete_of_missing_entity_counts_as_done() {
        let sync = core(FakeTaskApi::new());
        sync.lock().oneoff_queue.push(OneOffOp::Delete { id: 55 });

        let outcome = sync.drain().await;
        assert_eq!(outcome.report().unwrap().applied, 1);
        assert!(!sync.has_pending());
    }

    #[tokio::test]
    async fn test_refresh_failure_records_load_error() {
        let api = FakeTaskApi::new();
        api.set_down(true);
        let sync = core(api);

        assert!(sync.refresh().await.is_err());
        let status = sync.sync_status();
        assert!(status.load_error.is_some());
        assert!(!status.server_reachable);

        sync.api.set_down(false);
        sync.refresh().await.unwrap();
        assert!(sync.sync_status().load_error.is_none());
    }
}
