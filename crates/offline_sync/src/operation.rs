//! Pending operation types
//!
//! This module defines the intents queued while a mutation cannot reach the
//! server: status changes for regular todos and the create/update/status/
//! delete family for one-off todos.

use serde::{Deserialize, Serialize};
use task_model::{is_temporary_id, EntityId, NewOneOff, OneOffPatch, OneOffTodo, TaskStatus};

/// Pending status change for a regular todo
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOp {
    pub id: EntityId,
    pub status: TaskStatus,
}

impl StatusOp {
    pub fn new(id: EntityId, status: TaskStatus) -> Self {
        Self { id, status }
    }
}

/// Pending one-off todo operation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OneOffOp {
    /// Create an entity known locally by a negative `client_id`
    Create {
        client_id: EntityId,
        title: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        status: Option<TaskStatus>,
    },

    /// Set the status of an entity
    Status { id: EntityId, status: TaskStatus },

    /// Partially update an entity
    Update { id: EntityId, patch: OneOffPatch },

    /// Delete an entity
    Delete { id: EntityId },
}

impl OneOffOp {
    pub fn create(client_id: EntityId, title: impl Into<String>, description: Option<String>) -> Self {
        OneOffOp::Create {
            client_id,
            title: title.into(),
            description,
            status: None,
        }
    }

    pub fn update(id: EntityId, patch: OneOffPatch) -> Self {
        OneOffOp::Update { id, patch }
    }

    /// Id of the entity this operation targets
    pub fn target_id(&self) -> EntityId {
        match self {
            OneOffOp::Create { client_id, .. } => *client_id,
            OneOffOp::Status { id, .. } => *id,
            OneOffOp::Update { id, .. } => *id,
            OneOffOp::Delete { id } => *id,
        }
    }

    /// Whether the target has not been created server-side yet
    pub fn targets_pending_entity(&self) -> bool {
        is_temporary_id(self.target_id())
    }

    pub fn is_create(&self) -> bool {
        matches!(self, OneOffOp::Create { .. })
    }

    /// Copy of this operation with `from` replaced by `to` as its target.
    pub fn retargeted(&self, from: EntityId, to: EntityId) -> Self {
        if self.target_id() != from {
            return self.clone();
        }
        match self.clone() {
            OneOffOp::Create {
                title,
                description,
                status,
                ..
            } => OneOffOp::Create {
                client_id: to,
                title,
                description,
                status,
            },
            OneOffOp::Status { status, .. } => OneOffOp::Status { id: to, status },
            OneOffOp::Update { patch, .. } => OneOffOp::Update { id: to, patch },
            OneOffOp::Delete { .. } => OneOffOp::Delete { id: to },
        }
    }

    /// Request body for a create operation
    pub fn create_payload(&self) -> Option<NewOneOff> {
        match self {
            OneOffOp::Create {
                title, description, ..
            } => Some(NewOneOff::new(title.clone(), description.clone())),
            _ => None,
        }
    }

    /// Local placeholder entity for a create operation
    pub fn placeholder(&self) -> Option<OneOffTodo> {
        match self {
            OneOffOp::Create {
                client_id,
                title,
                description,
                status,
            } => Some(OneOffTodo {
                id: *client_id,
                title: title.clone(),
                description: description.clone(),
                status: status.unwrap_or_default(),
            }),
            _ => None,
        }
    }

    /// Changes a create carries relative to `sent`, as a patch.
    ///
    /// Used when a create was edited locally while its request was in
    /// flight. Returns an empty patch when nothing changed.
    pub fn drift_from(&self, sent: &OneOffOp) -> OneOffPatch {
        let mut patch = OneOffPatch::default();
        if let (
            OneOffOp::Create {
                title,
                description,
                status,
                ..
            },
            OneOffOp::Create {
                title: sent_title,
                description: sent_description,
                status: sent_status,
                ..
            },
        ) = (self, sent)
        {
            if title != sent_title {
                patch.title = Some(title.clone());
            }
            if description != sent_description {
                patch.description = description.clone();
            }
            if status != sent_status {
                patch.status = Some(status.unwrap_or_default());
            }
        }
        patch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let op = OneOffOp::Status {
            id: 4,
            status: TaskStatus::Complete,
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["status"], "complete");

        let create: OneOffOp =
            serde_json::from_str(r#"{"type":"create","client_id":-1,"title":"Buy milk"}"#).unwrap();
        assert_eq!(create, OneOffOp::create(-1, "Buy milk", None));
    }

    #[test]
    fn test_target_and_retarget() {
        let op = OneOffOp::update(-3, OneOffPatch::title("x"));
        assert_eq!(op.target_id(), -3);
        assert!(op.targets_pending_entity());

        let moved = op.retargeted(-3, 42);
        assert_eq!(moved.target_id(), 42);
        assert!(!moved.targets_pending_entity());

        let untouched = OneOffOp::Delete { id: 5 }.retargeted(-3, 42);
        assert_eq!(untouched, OneOffOp::Delete { id: 5 });
    }

    #[test]
    fn test_placeholder_and_payload() {
        let op = OneOffOp::Create {
            client_id: -2,
            title: "Call mum".into(),
            description: Some("Sunday".into()),
            status: Some(TaskStatus::InProgress),
        };
        let placeholder = op.placeholder().unwrap();
        assert_eq!(placeholder.id, -2);
        assert_eq!(placeholder.status, TaskStatus::InProgress);

        let payload = op.create_payload().unwrap();
        assert_eq!(payload.title, "Call mum");
        assert_eq!(payload.description.as_deref(), Some("Sunday"));
        assert!(OneOffOp::Delete { id: 1 }.create_payload().is_none());
    }

    #[test]
    fn test_drift_from() {
        let sent = OneOffOp::create(-1, "Buy milk", None);
        assert!(sent.drift_from(&sent).is_empty());

        let edited = OneOffOp::Create {
            client_id: -1,
            title: "Buy milk".into(),
            description: Some("oat".into()),
            status: Some(TaskStatus::Complete),
        };
        let patch = edited.drift_from(&sent);
        assert_eq!(patch.title, None);
        assert_eq!(patch.description.as_deref(), Some("oat"));
        assert_eq!(patch.status, Some(TaskStatus::Complete));
    }
}
