//! Local cache of server state.
//!
//! A [`CacheSnapshot`] is immutable once published. Mutations build a new
//! snapshot and swap it in, so readers holding an `Arc` never see a
//! half-applied change.

use crate::operation::OneOffOp;
use crate::queue::{OneOffQueue, StatusQueue};
use serde::{Deserialize, Serialize};
use task_model::{
    is_temporary_id, sort_oneoffs, sort_todos, Category, EntityId, OneOffPatch, OneOffTodo, TaskStatus,
    TodoWithCategory,
};

/// Point-in-time copy of everything the presentation layer can show.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub categories: Vec<Category>,
    pub recommended: Vec<TodoWithCategory>,
    pub oneoffs: Vec<OneOffTodo>,
}

impl CacheSnapshot {
    pub fn new(categories: Vec<Category>, recommended: Vec<TodoWithCategory>, oneoffs: Vec<OneOffTodo>) -> Self {
        Self {
            categories,
            recommended,
            oneoffs,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.recommended.is_empty() && self.oneoffs.is_empty()
    }

    /// Current status of a regular todo, looked up in categories first.
    pub fn todo_status(&self, id: EntityId) -> Option<TaskStatus> {
        self.categories
            .iter()
            .find_map(|c| c.find_todo(id))
            .map(|t| t.status)
            .or_else(|| {
                self.recommended
                    .iter()
                    .find(|r| r.todo.id == id)
                    .map(|r| r.todo.status)
            })
    }

    pub fn find_oneoff(&self, id: EntityId) -> Option<&OneOffTodo> {
        self.oneoffs.iter().find(|o| o.id == id)
    }

    /// Smallest temporary one-off id present in the cache.
    pub fn min_temp_id(&self) -> Option<EntityId> {
        self.oneoffs
            .iter()
            .map(|o| o.id)
            .filter(|id| is_temporary_id(*id))
            .min()
    }

    /// Copy with todo `id` set to `status` everywhere it appears.
    pub fn with_todo_status(&self, id: EntityId, status: TaskStatus) -> Self {
        let mut next = self.clone();
        next.set_todo_status(id, status);
        next
    }

    fn set_todo_status(&mut self, id: EntityId, status: TaskStatus) {
        for todo in self
            .categories
            .iter_mut()
            .flat_map(|c| c.todos.iter_mut())
            .filter(|t| t.id == id)
        {
            todo.status = status;
        }
        for entry in self.recommended.iter_mut().filter(|r| r.todo.id == id) {
            entry.todo.status = status;
        }
    }

    /// Copy with `todo` inserted, replacing any entry with the same id.
    pub fn with_oneoff(&self, todo: OneOffTodo) -> Self {
        let mut next = self.clone();
        next.upsert_oneoff(todo);
        next
    }

    fn upsert_oneoff(&mut self, todo: OneOffTodo) {
        match self.oneoffs.iter_mut().find(|o| o.id == todo.id) {
            Some(existing) => *existing = todo,
            None => self.oneoffs.push(todo),
        }
    }

    /// Copy with `patch` applied to one-off `id`. Unknown ids are left alone.
    pub fn with_oneoff_patched(&self, id: EntityId, patch: &OneOffPatch) -> Self {
        let mut next = self.clone();
        next.patch_oneoff(id, patch);
        next
    }

    fn patch_oneoff(&mut self, id: EntityId, patch: &OneOffPatch) {
        if let Some(todo) = self.oneoffs.iter_mut().find(|o| o.id == id) {
            patch.apply_to(todo);
        }
    }

    pub fn without_oneoff(&self, id: EntityId) -> Self {
        let mut next = self.clone();
        next.oneoffs.retain(|o| o.id != id);
        next
    }

    /// Copy with temporary entity `temp_id` replaced by the server entity.
    ///
    /// The server entity takes the temporary entity's position. If the
    /// temporary entity is gone (deleted locally in the meantime) the server
    /// entity is not added. Any other entry already using the real id is
    /// dropped so the id stays unique.
    pub fn with_created_oneoff(&self, temp_id: EntityId, created: OneOffTodo) -> Self {
        let mut next = self.clone();
        let real_id = created.id;
        match next.oneoffs.iter().position(|o| o.id == temp_id) {
            Some(index) => {
                next.oneoffs[index] = created;
                let mut seen = false;
                next.oneoffs.retain(|o| {
                    if o.id != real_id {
                        return true;
                    }
                    let keep = !seen;
                    seen = true;
                    keep
                });
            }
            None => next.oneoffs.retain(|o| o.id != real_id),
        }
        next
    }

    /// Copy of freshly fetched server data with pending work layered on top.
    ///
    /// Queued status changes are applied, pending creates show up as
    /// temporary entities, updates are patched in and deletes are removed.
    pub fn overlay_pending(&self, statuses: &StatusQueue, oneoffs: &OneOffQueue) -> Self {
        let mut next = self.clone();
        for op in statuses.ops() {
            next.set_todo_status(op.id, op.status);
        }
        for op in oneoffs.ops() {
            match op {
                OneOffOp::Create { .. } => {
                    if let Some(placeholder) = op.placeholder() {
                        next.upsert_oneoff(placeholder);
                    }
                }
                OneOffOp::Status { id, status } => next.patch_oneoff(*id, &OneOffPatch::status(*status)),
                OneOffOp::Update { id, patch } => next.patch_oneoff(*id, patch),
                OneOffOp::Delete { id } => next.oneoffs.retain(|o| o.id != *id),
            }
        }
        next
    }

    /// Categories with their todos in display order.
    pub fn sorted_categories(&self) -> Vec<Category> {
        let mut categories = self.categories.clone();
        for category in &mut categories {
            sort_todos(&mut category.todos);
        }
        categories
    }

    /// Recommended todos in display order.
    pub fn sorted_recommended(&self) -> Vec<TodoWithCategory> {
        let mut recommended = self.recommended.clone();
        recommended.sort_by(|a, b| {
            a.todo
                .status
                .display_cmp(&b.todo.status)
                .then_with(|| a.todo.title.cmp(&b.todo.title))
        });
        recommended
    }

    /// One-off todos in display order.
    pub fn sorted_oneoffs(&self) -> Vec<OneOffTodo> {
        let mut oneoffs = self.oneoffs.clone();
        sort_oneoffs(&mut oneoffs);
        oneoffs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::StatusOp;
    use task_model::Todo;

    fn sample() -> CacheSnapshot {
        let category = Category::new(1, "Home")
            .with_todo(Todo::new(7, "Dishes", 1))
            .with_todo(Todo::new(8, "Laundry", 1).with_status(TaskStatus::Complete));
        let recommended = vec![TodoWithCategory {
            category: category.summary(),
            todo: Todo::new(7, "Dishes", 1),
        }];
        CacheSnapshot::new(vec![category], recommended, vec![OneOffTodo::new(3, "Post letter")])
    }

    #[test]
    fn test_todo_status_updates_everywhere() {
        let cache = sample().with_todo_status(7, TaskStatus::InProgress);
        assert_eq!(cache.todo_status(7), Some(TaskStatus::InProgress));
        assert_eq!(cache.recommended[0].todo.status, TaskStatus::InProgress);
        assert_eq!(cache.todo_status(99), None);
    }

    #[test]
    fn test_snapshot_is_not_mutated() {
        let original = sample();
        let _ = original.with_todo_status(7, TaskStatus::Skipped).without_oneoff(3);
        assert_eq!(original, sample());
    }

    #[test]
    fn test_created_oneoff_replaces_placeholder() {
        let cache = sample().with_oneoff(OneOffTodo::new(-1, "Buy milk"));
        assert_eq!(cache.min_temp_id(), Some(-1));

        let cache = cache.with_created_oneoff(-1, OneOffTodo::new(40, "Buy milk"));
        assert!(cache.find_oneoff(-1).is_none());
        assert_eq!(cache.find_oneoff(40).map(|o| o.title.as_str()), Some("Buy milk"));
        assert_eq!(cache.min_temp_id(), None);
    }

    #[test]
    fn test_created_oneoff_not_readded_after_delete() {
        let cache = sample().with_created_oneoff(-1, OneOffTodo::new(40, "Buy milk"));
        assert!(cache.find_oneoff(40).is_none());
    }

    #[test]
    fn test_created_oneoff_keeps_id_unique() {
        // A refresh may already have delivered the server entity
        let cache = sample()
            .with_oneoff(OneOffTodo::new(-1, "Buy milk"))
            .with_oneoff(OneOffTodo::new(40, "Buy milk"))
            .with_created_oneoff(-1, OneOffTodo::new(40, "Buy milk"));
        assert_eq!(cache.oneoffs.iter().filter(|o| o.id == 40).count(), 1);
    }

    #[test]
    fn test_overlay_pending() {
        let mut statuses = StatusQueue::new();
        statuses.push(StatusOp::new(8, TaskStatus::Incomplete));

        let mut oneoffs = OneOffQueue::new();
        oneoffs.push(OneOffOp::create(-1, "Buy milk", None));
        oneoffs.push(OneOffOp::Delete { id: 3 });

        let cache = sample().overlay_pending(&statuses, &oneoffs);
        assert_eq!(cache.todo_status(8), Some(TaskStatus::Incomplete));
        assert!(cache.find_oneoff(3).is_none());
        assert!(cache.find_oneoff(-1).is_some());
    }

    #[test]
    fn test_sorted_views() {
        let cache = sample()
            .with_todo_status(8, TaskStatus::InProgress)
            .with_oneoff(OneOffTodo::new(4, "Archive").with_status(TaskStatus::Skipped));

        let categories = cache.sorted_categories();
        assert_eq!(categories[0].todos[0].id, 8);

        let oneoffs = cache.sorted_oneoffs();
        assert_eq!(oneoffs.last().map(|o| o.id), Some(4));
    }
}
