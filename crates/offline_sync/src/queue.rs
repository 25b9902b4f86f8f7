//! Pending operation queues.
//!
//! Queues are plain ordered lists. Compression happens on demand (before
//! each drain and before persisting) so enqueueing stays cheap.

use crate::compress::{compress_oneoff_ops, compress_status_ops};
use crate::operation::{OneOffOp, StatusOp};
use task_model::{is_temporary_id, EntityId, OneOffPatch, TaskStatus};

/// Queue of status changes for regular todos.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusQueue {
    ops: Vec<StatusOp>,
}

impl StatusQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ops(ops: Vec<StatusOp>) -> Self {
        Self { ops }
    }

    pub fn push(&mut self, op: StatusOp) {
        self.ops.push(op);
    }

    pub fn compress(&mut self) {
        self.ops = compress_status_ops(&self.ops);
    }

    pub fn ops(&self) -> &[StatusOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.ops.iter().any(|op| op.id == id)
    }

    /// Most recently queued status for `id`.
    pub fn status_for(&self, id: EntityId) -> Option<TaskStatus> {
        self.ops.iter().rev().find(|op| op.id == id).map(|op| op.status)
    }

    /// Remove entries for `id`, but only if its latest queued status is
    /// still `sent`. A newer local change keeps the entry for the next drain.
    pub fn remove_if_matches(&mut self, id: EntityId, sent: TaskStatus) -> bool {
        if self.status_for(id) != Some(sent) {
            return false;
        }
        self.ops.retain(|op| op.id != id);
        true
    }
}

/// What happened to a pending create once the server answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateResolution {
    /// Queue entry removed; nothing else to do.
    Completed,
    /// The create was edited while in flight; the edits were requeued as an
    /// update against the server id.
    Amended(OneOffPatch),
    /// The create was deleted while in flight; a delete against the server
    /// id was queued.
    Cancelled,
}

/// Queue of one-off todo operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OneOffQueue {
    ops: Vec<OneOffOp>,
}

impl OneOffQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ops(ops: Vec<OneOffOp>) -> Self {
        Self { ops }
    }

    pub fn push(&mut self, op: OneOffOp) {
        self.ops.push(op);
    }

    pub fn compress(&mut self) {
        self.ops = compress_oneoff_ops(&self.ops);
    }

    pub fn ops(&self) -> &[OneOffOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Whether any queued operation targets `id`.
    pub fn has_pending_for(&self, id: EntityId) -> bool {
        self.ops.iter().any(|op| op.target_id() == id)
    }

    /// Smallest temporary id still referenced by the queue.
    pub fn min_temp_id(&self) -> Option<EntityId> {
        self.ops
            .iter()
            .map(OneOffOp::target_id)
            .filter(|id| is_temporary_id(*id))
            .min()
    }

    /// Remove the first entry equal to `op`.
    ///
    /// Returns false when the entry changed or disappeared since it was
    /// sent, which leaves the newer entry queued.
    pub fn remove_exact(&mut self, op: &OneOffOp) -> bool {
        match self.ops.iter().position(|queued| queued == op) {
            Some(index) => {
                self.ops.remove(index);
                true
            }
            None => false,
        }
    }

    /// Settle a create that the server accepted under `server_id`.
    ///
    /// Every other entry that referenced the temporary id is retargeted to
    /// `server_id`.
    pub fn resolve_create(&mut self, sent: &OneOffOp, server_id: EntityId) -> CreateResolution {
        let client_id = sent.target_id();
        let current = self
            .ops
            .iter()
            .position(|op| op.is_create() && op.target_id() == client_id);

        let resolution = match current {
            Some(index) => {
                let current = self.ops.remove(index);
                let drift = current.drift_from(sent);
                if drift.is_empty() {
                    CreateResolution::Completed
                } else {
                    self.ops.insert(index, OneOffOp::update(server_id, drift.clone()));
                    CreateResolution::Amended(drift)
                }
            }
            None => {
                self.ops.push(OneOffOp::Delete { id: server_id });
                CreateResolution::Cancelled
            }
        };

        for op in &mut self.ops {
            if op.target_id() == client_id {
                *op = op.retargeted(client_id, server_id);
            }
        }
        resolution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_remove_if_matches() {
        let mut queue = StatusQueue::new();
        queue.push(StatusOp::new(1, TaskStatus::Complete));
        queue.push(StatusOp::new(2, TaskStatus::Skipped));

        assert!(queue.remove_if_matches(1, TaskStatus::Complete));
        assert!(!queue.contains(1));

        // Newer local change arrived after sending
        queue.push(StatusOp::new(2, TaskStatus::InProgress));
        assert!(!queue.remove_if_matches(2, TaskStatus::Skipped));
        assert_eq!(queue.status_for(2), Some(TaskStatus::InProgress));
    }

    #[test]
    fn test_status_compress_in_place() {
        let mut queue = StatusQueue::new();
        for status in [TaskStatus::InProgress, TaskStatus::Complete, TaskStatus::Skipped] {
            queue.push(StatusOp::new(4, status));
        }
        queue.compress();
        assert_eq!(queue.ops(), &[StatusOp::new(4, TaskStatus::Skipped)]);
    }

    #[test]
    fn test_remove_exact_keeps_newer_entry() {
        let mut queue = OneOffQueue::new();
        let sent = OneOffOp::update(5, OneOffPatch::title("a"));
        queue.push(OneOffOp::update(5, OneOffPatch::title("b")));

        assert!(!queue.remove_exact(&sent));
        assert_eq!(queue.len(), 1);

        assert!(queue.remove_exact(&OneOffOp::update(5, OneOffPatch::title("b"))));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_resolve_create_completed() {
        let sent = OneOffOp::create(-1, "Buy milk", None);
        let mut queue = OneOffQueue::from_ops(vec![sent.clone()]);

        assert_eq!(queue.resolve_create(&sent, 40), CreateResolution::Completed);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_resolve_create_amended() {
        let sent = OneOffOp::create(-1, "Buy milk", None);
        let mut queue = OneOffQueue::from_ops(vec![OneOffOp::create(-1, "Buy oat milk", None)]);

        let resolution = queue.resolve_create(&sent, 40);
        assert_eq!(resolution, CreateResolution::Amended(OneOffPatch::title("Buy oat milk")));
        assert_eq!(queue.ops(), &[OneOffOp::update(40, OneOffPatch::title("Buy oat milk"))]);
    }

    #[test]
    fn test_resolve_create_cancelled() {
        let sent = OneOffOp::create(-1, "Buy milk", None);
        let mut queue = OneOffQueue::new();

        assert_eq!(queue.resolve_create(&sent, 40), CreateResolution::Cancelled);
        assert_eq!(queue.ops(), &[OneOffOp::Delete { id: 40 }]);
    }

    #[test]
    fn test_resolve_create_retargets_followups() {
        let sent = OneOffOp::create(-1, "Buy milk", None);
        let mut queue = OneOffQueue::from_ops(vec![
            sent.clone(),
            OneOffOp::Status {
                id: -1,
                status: TaskStatus::Complete,
            },
            OneOffOp::Delete { id: -2 },
        ]);

        queue.resolve_create(&sent, 40);
        assert_eq!(
            queue.ops(),
            &[
                OneOffOp::Status {
                    id: 40,
                    status: TaskStatus::Complete
                },
                OneOffOp::Delete { id: -2 },
            ]
        );
        assert_eq!(queue.min_temp_id(), Some(-2));
    }
}
