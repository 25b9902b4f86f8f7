//! In-memory `TaskApi` for tests.
//!
//! `FakeTaskApi` behaves like a tiny Taskin server: it keeps categories and
//! one-offs in memory, assigns ids to created one-offs, records every call,
//! and can be told to fail or stall specific requests.

use crate::api::TaskApi;
use crate::error::{ApiError, ApiResult};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use task_model::{Category, EntityId, NewOneOff, OneOffPatch, OneOffTodo, TaskStatus, TodoWithCategory};

/// A recorded request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    ListCategories,
    ListRecommendedTodos,
    ListOneOffs,
    UpdateTodoStatus { id: EntityId, status: TaskStatus },
    CreateOneOff(NewOneOff),
    UpdateOneOff { id: EntityId, patch: OneOffPatch },
    UpdateOneOffStatus { id: EntityId, status: TaskStatus },
    DeleteOneOff { id: EntityId },
    HealthCheck,
}

impl ApiCall {
    /// Whether the call changes server state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            ApiCall::UpdateTodoStatus { .. }
                | ApiCall::CreateOneOff(_)
                | ApiCall::UpdateOneOff { .. }
                | ApiCall::UpdateOneOffStatus { .. }
                | ApiCall::DeleteOneOff { .. }
        )
    }
}

#[derive(Debug)]
struct FakeState {
    categories: Vec<Category>,
    oneoffs: BTreeMap<EntityId, OneOffTodo>,
    next_oneoff_id: EntityId,
    calls: Vec<ApiCall>,
    down: bool,
    health_delay: Option<Duration>,
    failing_todo_ids: HashSet<EntityId>,
    failing_oneoff_ids: HashSet<EntityId>,
    fail_creates: bool,
    fail_oneoff_status: bool,
    create_delay: Option<Duration>,
    next_todo_status_delay: Option<Duration>,
}

/// In-memory stand-in for the Taskin server.
#[derive(Debug)]
pub struct FakeTaskApi {
    state: Mutex<FakeState>,
}

impl Default for FakeTaskApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeTaskApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                categories: Vec::new(),
                oneoffs: BTreeMap::new(),
                next_oneoff_id: 100,
                calls: Vec::new(),
                down: false,
                health_delay: None,
                failing_todo_ids: HashSet::new(),
                failing_oneoff_ids: HashSet::new(),
                fail_creates: false,
                fail_oneoff_status: false,
                create_delay: None,
                next_todo_status_delay: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed the server with categories.
    pub fn with_categories(self, categories: Vec<Category>) -> Self {
        self.lock().categories = categories;
        self
    }

    /// Seed the server with one-offs.
    pub fn with_oneoffs(self, oneoffs: Vec<OneOffTodo>) -> Self {
        {
            let mut state = self.lock();
            for item in oneoffs {
                state.next_oneoff_id = state.next_oneoff_id.max(item.id + 1);
                state.oneoffs.insert(item.id, item);
            }
        }
        self
    }

    /// Make every request fail with a transport error.
    pub fn set_down(&self, down: bool) {
        self.lock().down = down;
    }

    /// Delay health responses.
    pub fn set_health_delay(&self, delay: Option<Duration>) {
        self.lock().health_delay = delay;
    }

    /// Delay create responses.
    pub fn set_create_delay(&self, delay: Option<Duration>) {
        self.lock().create_delay = delay;
    }

    /// Stall the next todo status update before it takes effect.
    pub fn delay_next_todo_status(&self, delay: Duration) {
        self.lock().next_todo_status_delay = Some(delay);
    }

    /// Make status updates for `id` fail until cleared.
    pub fn fail_todo_status(&self, id: EntityId, fail: bool) {
        let mut state = self.lock();
        if fail {
            state.failing_todo_ids.insert(id);
        } else {
            state.failing_todo_ids.remove(&id);
        }
    }

    /// Make update/status/delete requests for one-off `id` fail until cleared.
    pub fn fail_oneoff(&self, id: EntityId, fail: bool) {
        let mut state = self.lock();
        if fail {
            state.failing_oneoff_ids.insert(id);
        } else {
            state.failing_oneoff_ids.remove(&id);
        }
    }

    /// Make one-off creates fail until cleared.
    pub fn fail_creates(&self, fail: bool) {
        self.lock().fail_creates = fail;
    }

    /// Make one-off status requests fail until cleared.
    pub fn fail_oneoff_status(&self, fail: bool) {
        self.lock().fail_oneoff_status = fail;
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.lock().calls.clone()
    }

    /// Calls that change server state.
    pub fn mutation_calls(&self) -> Vec<ApiCall> {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Server-side one-offs.
    pub fn oneoffs(&self) -> Vec<OneOffTodo> {
        self.lock().oneoffs.values().cloned().collect()
    }

    /// Server-side status of a regular todo.
    pub fn todo_status(&self, id: EntityId) -> Option<TaskStatus> {
        self.lock()
            .categories
            .iter()
            .flat_map(|c| c.todos.iter())
            .find(|t| t.id == id)
            .map(|t| t.status)
    }

    /// Record `call` and fail if the server is down.
    fn begin(&self, call: ApiCall) -> ApiResult<MutexGuard<'_, FakeState>> {
        let mut state = self.lock();
        state.calls.push(call);
        if state.down {
            return Err(ApiError::Transport("connection refused".to_string()));
        }
        Ok(state)
    }

    fn not_found(what: &str) -> ApiError {
        ApiError::Status {
            status: 404,
            message: format!("{what} not found"),
        }
    }

    fn injected() -> ApiError {
        ApiError::Status {
            status: 500,
            message: "injected failure".to_string(),
        }
    }
}

impl TaskApi for FakeTaskApi {
    async fn list_categories(&self) -> ApiResult<Vec<Category>> {
        let state = self.begin(ApiCall::ListCategories)?;
        Ok(state.categories.clone())
    }

    async fn list_recommended_todos(&self) -> ApiResult<Vec<TodoWithCategory>> {
        let state = self.begin(ApiCall::ListRecommendedTodos)?;
        Ok(state
            .categories
            .iter()
            .flat_map(|category| {
                category
                    .todos
                    .iter()
                    .filter(|todo| todo.status.is_open())
                    .map(move |todo| TodoWithCategory {
                        category: category.summary(),
                        todo: todo.clone(),
                    })
            })
            .collect())
    }

    async fn list_oneoffs(&self) -> ApiResult<Vec<OneOffTodo>> {
        let state = self.begin(ApiCall::ListOneOffs)?;
        Ok(state.oneoffs.values().cloned().collect())
    }

    async fn update_todo_status(&self, id: EntityId, status: TaskStatus) -> ApiResult<()> {
        let delay = self.begin(ApiCall::UpdateTodoStatus { id, status })?.next_todo_status_delay.take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if state.failing_todo_ids.contains(&id) {
            return Err(Self::injected());
        }
        let todo = state
            .categories
            .iter_mut()
            .flat_map(|c| c.todos.iter_mut())
            .find(|t| t.id == id)
            .ok_or_else(|| Self::not_found("Todo"))?;
        todo.status = status;
        Ok(())
    }

    async fn create_oneoff(&self, new: &NewOneOff) -> ApiResult<OneOffTodo> {
        let delay = {
            let state = self.begin(ApiCall::CreateOneOff(new.clone()))?;
            if state.fail_creates {
                return Err(Self::injected());
            }
            state.create_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        let id = state.next_oneoff_id;
        state.next_oneoff_id += 1;
        let item = OneOffTodo {
            id,
            title: new.title.clone(),
            description: new.description.clone(),
            status: TaskStatus::Incomplete,
        };
        state.oneoffs.insert(id, item.clone());
        Ok(item)
    }

    async fn update_oneoff(&self, id: EntityId, patch: &OneOffPatch) -> ApiResult<OneOffTodo> {
        let mut state = self.begin(ApiCall::UpdateOneOff {
            id,
            patch: patch.clone(),
        })?;
        if state.failing_oneoff_ids.contains(&id) {
            return Err(Self::injected());
        }
        let item = state
            .oneoffs
            .get_mut(&id)
            .ok_or_else(|| Self::not_found("One-off todo"))?;
        patch.apply_to(item);
        Ok(item.clone())
    }

    async fn update_oneoff_status(&self, id: EntityId, status: TaskStatus) -> ApiResult<()> {
        let mut state = self.begin(ApiCall::UpdateOneOffStatus { id, status })?;
        if state.fail_oneoff_status || state.failing_oneoff_ids.contains(&id) {
            return Err(Self::injected());
        }
        let item = state
            .oneoffs
            .get_mut(&id)
            .ok_or_else(|| Self::not_found("One-off todo"))?;
        item.status = status;
        Ok(())
    }

    async fn delete_oneoff(&self, id: EntityId) -> ApiResult<()> {
        let mut state = self.begin(ApiCall::DeleteOneOff { id })?;
        if state.failing_oneoff_ids.contains(&id) {
            return Err(Self::injected());
        }
        state
            .oneoffs
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Self::not_found("One-off todo"))
    }

    async fn health_check(&self) -> ApiResult<()> {
        let delay = {
            let state = self.begin(ApiCall::HealthCheck)?;
            state.health_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use task_model::Todo;

    fn seeded() -> FakeTaskApi {
        FakeTaskApi::new().with_categories(vec![Category::new(1, "Morning")
            .with_todo(Todo::new(7, "Stretch", 1))
            .with_todo(Todo::new(8, "Journal", 1).with_status(TaskStatus::Complete))])
    }

    #[tokio::test]
    async fn test_status_update_and_recommended() {
        let api = seeded();
        api.update_todo_status(7, TaskStatus::InProgress).await.unwrap();
        assert_eq!(api.todo_status(7), Some(TaskStatus::InProgress));

        let recommended = api.list_recommended_todos().await.unwrap();
        assert_eq!(recommended.len(), 1);
        assert_eq!(recommended[0].todo.id, 7);
        assert_eq!(recommended[0].category.name, "Morning");
    }

    #[tokio::test]
    async fn test_create_assigns_ids() {
        let api = FakeTaskApi::new().with_oneoffs(vec![OneOffTodo::new(150, "existing")]);
        let created = api
            .create_oneoff(&NewOneOff::new("Buy milk", None))
            .await
            .unwrap();
        assert_eq!(created.id, 151);
        assert_eq!(api.oneoffs().len(), 2);
    }

    #[tokio::test]
    async fn test_down_server_records_and_fails() {
        let api = seeded();
        api.set_down(true);
        let err = api.update_todo_status(7, TaskStatus::Complete).await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(
            api.calls(),
            vec![ApiCall::UpdateTodoStatus {
                id: 7,
                status: TaskStatus::Complete
            }]
        );
        assert_eq!(api.todo_status(7), Some(TaskStatus::Incomplete));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let api = seeded();
        api.fail_todo_status(7, true);
        assert!(api.update_todo_status(7, TaskStatus::Complete).await.is_err());
        api.fail_todo_status(7, false);
        assert!(api.update_todo_status(7, TaskStatus::Complete).await.is_ok());

        assert!(api.delete_oneoff(999).await.unwrap_err().is_not_found());
        assert_eq!(api.mutation_calls().len(), 3);
    }
}
