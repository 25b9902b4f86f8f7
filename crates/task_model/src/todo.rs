//! Regular todos and the categories that own them

use crate::status::TaskStatus;
use crate::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A recurring, category-scoped todo owned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    pub category_id: EntityId,
    /// Server bookkeeping (position, reset counters, in-progress timing),
    /// carried through the cache untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Todo {
    pub fn new(id: EntityId, title: impl Into<String>, category_id: EntityId) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            status: TaskStatus::Incomplete,
            category_id,
            extra: Map::new(),
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Manual ordering position reported by the server, if any.
    pub fn position(&self) -> Option<i64> {
        self.extra.get("position").and_then(Value::as_i64)
    }
}

/// Category fields without the nested todos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A category together with its todos, as listed by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub todos: Vec<Todo>,
}

impl Category {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            todos: Vec::new(),
        }
    }

    pub fn with_todo(mut self, todo: Todo) -> Self {
        self.todos.push(todo);
        self
    }

    pub fn summary(&self) -> CategorySummary {
        CategorySummary {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    pub fn find_todo(&self, id: EntityId) -> Option<&Todo> {
        self.todos.iter().find(|t| t.id == id)
    }

    /// Number of todos that are complete or skipped.
    pub fn done_count(&self) -> usize {
        self.todos.iter().filter(|t| !t.status.is_open()).count()
    }
}

/// A todo annotated with its category (the "recommended" listing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoWithCategory {
    pub category: CategorySummary,
    #[serde(flatten)]
    pub todo: Todo,
}

/// Sort todos by status precedence, then by server position, then title.
pub fn sort_todos(todos: &mut [Todo]) {
    todos.sort_by(|a, b| {
        a.status
            .display_cmp(&b.status)
            .then_with(|| a.position().cmp(&b.position()))
            .then_with(|| a.title.cmp(&b.title))
    });
}
