//! Remote API contract.

use crate::error::ApiResult;
use task_model::{Category, EntityId, NewOneOff, OneOffPatch, OneOffTodo, TaskStatus, TodoWithCategory};

/// Operations the sync layer needs from the Taskin server.
///
/// Implemented over HTTP by [`crate::HttpTaskApi`]; tests substitute an
/// in-memory fake.
#[trait_variant::make(Send)]
pub trait TaskApi: Send + Sync {
    /// List every category with its nested todos.
    async fn list_categories(&self) -> ApiResult<Vec<Category>>;

    /// List the todos that are ready to be worked on.
    async fn list_recommended_todos(&self) -> ApiResult<Vec<TodoWithCategory>>;

    /// List all one-off todos.
    async fn list_oneoffs(&self) -> ApiResult<Vec<OneOffTodo>>;

    /// Set the status of a regular todo.
    async fn update_todo_status(&self, id: EntityId, status: TaskStatus) -> ApiResult<()>;

    /// Create a one-off todo, returning it with its server-assigned id.
    async fn create_oneoff(&self, new: &NewOneOff) -> ApiResult<OneOffTodo>;

    /// Apply a partial update to a one-off todo.
    async fn update_oneoff(&self, id: EntityId, patch: &OneOffPatch) -> ApiResult<OneOffTodo>;

    /// Set the status of a one-off todo.
    async fn update_oneoff_status(&self, id: EntityId, status: TaskStatus) -> ApiResult<()>;

    /// Delete a one-off todo.
    async fn delete_oneoff(&self, id: EntityId) -> ApiResult<()>;

    /// Probe the health endpoint. Any success status counts as healthy.
    async fn health_check(&self) -> ApiResult<()>;
}
