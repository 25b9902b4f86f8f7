//! Task client facade.
//!
//! Every mutation updates the local cache first, then either sends the
//! change straight to the server or queues it. Remote failures never
//! surface to the caller; they demote the change to the queue.

use crate::cache::CacheSnapshot;
use crate::config::SyncConfig;
use crate::engine::{DrainOutcome, DrainReport, SyncCore, SyncState};
use crate::error::{SyncError, SyncResult};
use crate::operation::{OneOffOp, StatusOp};
use crate::scheduler::{self, SchedulerHandle};
use crate::status::SyncStatus;
use api_client::TaskApi;
use std::sync::Arc;
use store::KeyValueStore;
use task_model::{
    is_temporary_id, Category, EntityId, NewOneOff, OneOffPatch, OneOffTodo, TaskStatus, TodoWithCategory,
};

/// How a mutation reached (or will reach) the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The server accepted the change directly.
    Applied,
    /// The change is queued for the next drain.
    Queued,
}

/// Entry point for the presentation layer.
///
/// Cheap to clone; clones share the same state.
pub struct TaskClient<A> {
    core: Arc<SyncCore<A>>,
}

impl<A> Clone for TaskClient<A> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<A: TaskApi + 'static> TaskClient<A> {
    pub fn new(api: A, store: Arc<dyn KeyValueStore>, config: SyncConfig) -> Self {
        Self {
            core: Arc::new(SyncCore::new(api, store, config)),
        }
    }

    pub fn api(&self) -> &A {
        &self.core.api
    }

    pub fn config(&self) -> &SyncConfig {
        &self.core.config
    }

    // ========== Loading ==========

    /// Restore persisted state, then fetch fresh data from the server.
    ///
    /// A fetch failure leaves the restored data in place and is recorded as
    /// the load error; the error is also returned.
    pub async fn load(&self) -> SyncResult<()> {
        self.core.restore();
        self.core.refresh().await
    }

    /// Restore persisted state only, without contacting the server.
    pub fn load_cached(&self) {
        self.core.restore();
    }

    pub async fn retry_load(&self) -> SyncResult<()> {
        self.core.refresh().await
    }

    pub async fn refresh(&self) -> SyncResult<()> {
        self.core.refresh().await
    }

    // ========== Reads ==========

    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        self.core.cache()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.core.cache().sorted_categories()
    }

    pub fn recommended_todos(&self) -> Vec<TodoWithCategory> {
        self.core.cache().sorted_recommended()
    }

    pub fn oneoffs(&self) -> Vec<OneOffTodo> {
        self.core.cache().sorted_oneoffs()
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.core.sync_status()
    }

    pub fn pending_status_ops(&self) -> Vec<StatusOp> {
        self.core.lock().status_queue.ops().to_vec()
    }

    pub fn pending_oneoff_ops(&self) -> Vec<OneOffOp> {
        self.core.lock().oneoff_queue.ops().to_vec()
    }

    pub fn last_drain(&self) -> Option<DrainReport> {
        self.core.last_drain()
    }

    // ========== Connectivity and sync ==========

    /// Record the host's network state; going online requests a sync.
    pub fn set_browser_online(&self, online: bool) {
        if self.core.monitor.set_browser_online(online) {
            self.core.request_sync();
        }
    }

    /// Probe the server and drain the queues if it answers.
    pub async fn sync_now(&self) -> DrainOutcome {
        self.core.sync_now().await
    }

    /// Start the background scheduler for this client.
    pub fn start_scheduler(&self) -> SchedulerHandle {
        scheduler::spawn(Arc::clone(&self.core))
    }

    // ========== Mutations ==========

    /// Change the status of a regular todo.
    pub async fn change_todo_status(&self, id: EntityId, status: TaskStatus) -> SyncResult<MutationOutcome> {
        let direct = {
            let mut state = self.core.lock();
            if state.cache.todo_status(id).is_none() {
                return Err(SyncError::NotFound(id));
            }
            let next = state.cache.with_todo_status(id, status);
            state.set_cache(next);

            let direct = self.core.monitor.can_sync()
                && !state.status_queue.contains(id)
                && !state.direct_todos.contains_key(&id);
            if direct {
                state.direct_todos.insert(id, status);
            } else {
                state.status_queue.push(StatusOp::new(id, status));
                state.status_queue.compress();
            }
            self.core.persist(&state);
            direct
        };
        tracing::debug!(id, %status, direct, "Todo status changed");

        if !direct {
            return Ok(self.queued());
        }

        let result = self.core.api.update_todo_status(id, status).await;
        let mut state = self.core.lock();
        state.direct_todos.remove(&id);
        match result {
            Ok(()) => {
                // Changes queued behind this call can go now
                if state.status_queue.contains(id) {
                    drop(state);
                    self.queued();
                }
                Ok(MutationOutcome::Applied)
            }
            Err(e) => {
                tracing::warn!(id, "Status update failed, queueing it: {}", e);
                // Queue ahead of anything that arrived meanwhile
                let mut ops = vec![StatusOp::new(id, status)];
                ops.extend_from_slice(state.status_queue.ops());
                state.status_queue = crate::queue::StatusQueue::from_ops(ops);
                state.status_queue.compress();
                self.core.persist_queues(&state);
                drop(state);
                Ok(self.queued())
            }
        }
    }

    /// Create a one-off todo. It is visible at once under a temporary id.
    ///
    /// When the server is reachable the create is sent straight away and the
    /// server entity is returned; otherwise, or if the call fails, the
    /// placeholder is returned and the create stays queued.
    pub async fn create_oneoff(&self, title: &str, description: Option<String>) -> SyncResult<OneOffTodo> {
        let new = NewOneOff::new(title, description);
        new.validate()?;

        let (placeholder, sent) = {
            let mut state = self.core.lock();
            let client_id = state.next_temp_id();
            let placeholder = OneOffTodo {
                id: client_id,
                title: new.title.clone(),
                description: new.description.clone(),
                status: TaskStatus::Incomplete,
            };
            let op = OneOffOp::create(client_id, new.title, new.description);

            let next = state.cache.with_oneoff(placeholder.clone());
            state.set_cache(next);
            state.oneoff_queue.push(op);
            state.oneoff_queue.compress();
            self.core.persist(&state);

            let sent = if self.core.monitor.can_sync() {
                let sent = state
                    .oneoff_queue
                    .ops()
                    .iter()
                    .find(|op| op.is_create() && op.target_id() == client_id)
                    .cloned();
                if sent.is_some() {
                    state.in_flight_creates.insert(client_id);
                }
                sent
            } else {
                None
            };
            (placeholder, sent)
        };
        tracing::debug!(client_id = placeholder.id, direct = sent.is_some(), "One-off created locally");

        let Some(sent) = sent else {
            self.queued();
            return Ok(placeholder);
        };

        match self.core.submit_create(&sent).await {
            Some(Ok(created)) => {
                if self.core.lock().oneoff_queue.has_pending_for(created.id) {
                    self.queued();
                }
                Ok(created)
            }
            Some(Err(e)) => {
                tracing::warn!(client_id = placeholder.id, "Create failed, queueing it: {}", e);
                self.queued();
                Ok(placeholder)
            }
            None => Ok(placeholder),
        }
    }

    /// Apply a partial update to a one-off todo.
    pub async fn update_oneoff(&self, id: EntityId, patch: OneOffPatch) -> SyncResult<MutationOutcome> {
        patch.validate()?;
        if patch.is_empty() {
            return Ok(MutationOutcome::Applied);
        }

        let direct = self.apply_oneoff_locally(id, OneOffOp::update(id, patch.clone()), |cache| {
            cache.with_oneoff_patched(id, &patch)
        })?;
        if !direct {
            return Ok(self.queued());
        }

        let result = self.core.api.update_oneoff(id, &patch).await;
        let outcome = self.finish_direct(id, result.as_ref().map(|_| ()), OneOffOp::update(id, patch.clone()));
        if let Ok(server) = result {
            let mut state = self.core.lock();
            if !state.oneoff_queue.has_pending_for(id) && state.cache.find_oneoff(id).is_some() {
                let next = state.cache.with_oneoff(server);
                state.set_cache(next);
                self.core.persist(&state);
            }
        }
        Ok(outcome)
    }

    /// Change the status of a one-off todo.
    pub async fn set_oneoff_status(&self, id: EntityId, status: TaskStatus) -> SyncResult<MutationOutcome> {
        let op = OneOffOp::Status { id, status };
        let direct = self.apply_oneoff_locally(id, op.clone(), |cache| {
            cache.with_oneoff_patched(id, &OneOffPatch::status(status))
        })?;
        if !direct {
            return Ok(self.queued());
        }

        let result = self.core.api.update_oneoff_status(id, status).await;
        Ok(self.finish_direct(id, result, op))
    }

    /// Delete a one-off todo. It disappears from the cache at once.
    pub async fn delete_oneoff(&self, id: EntityId) -> SyncResult<MutationOutcome> {
        let op = OneOffOp::Delete { id };
        let direct = self.apply_oneoff_locally(id, op.clone(), |cache| cache.without_oneoff(id))?;
        if !direct {
            return Ok(self.queued());
        }

        let result = match self.core.api.delete_oneoff(id).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        };
        Ok(self.finish_direct(id, result, op))
    }

    /// Update the cache for a one-off mutation and decide whether to call
    /// the server directly. When not direct, `op` is queued.
    fn apply_oneoff_locally(
        &self,
        id: EntityId,
        op: OneOffOp,
        apply: impl FnOnce(&CacheSnapshot) -> CacheSnapshot,
    ) -> SyncResult<bool> {
        let mut state = self.core.lock();
        if state.cache.find_oneoff(id).is_none() {
            return Err(SyncError::NotFound(id));
        }
        let next = apply(&state.cache);
        state.set_cache(next);

        let direct = self.can_send_directly(&state, id);
        if direct {
            state.direct_oneoffs.insert(id, op);
        } else {
            state.oneoff_queue.push(op);
            state.oneoff_queue.compress();
        }
        self.core.persist(&state);
        tracing::debug!(id, direct, "One-off changed locally");
        Ok(direct)
    }

    fn can_send_directly(&self, state: &SyncState, id: EntityId) -> bool {
        self.core.monitor.can_sync()
            && !is_temporary_id(id)
            && !state.oneoff_queue.has_pending_for(id)
            && !state.direct_oneoffs.contains_key(&id)
    }

    /// Settle a direct one-off call, queueing `op` if it failed.
    fn finish_direct<E: std::fmt::Display>(&self, id: EntityId, result: Result<(), E>, op: OneOffOp) -> MutationOutcome {
        let mut state = self.core.lock();
        state.direct_oneoffs.remove(&id);
        match result {
            Ok(()) => {
                if state.oneoff_queue.has_pending_for(id) {
                    drop(state);
                    self.queued();
                }
                MutationOutcome::Applied
            }
            Err(e) => {
                tracing::warn!(id, "One-off call failed, queueing it: {}", e);
                let mut ops = vec![op];
                ops.extend_from_slice(state.oneoff_queue.ops());
                state.oneoff_queue = crate::queue::OneOffQueue::from_ops(ops);
                state.oneoff_queue.compress();
                self.core.persist_queues(&state);
                drop(state);
                self.queued()
            }
        }
    }

    /// Nudge the scheduler if a drain could run now.
    fn queued(&self) -> MutationOutcome {
        if self.core.monitor.can_sync() {
            self.core.request_sync();
        }
        MutationOutcome::Queued
    }
}
