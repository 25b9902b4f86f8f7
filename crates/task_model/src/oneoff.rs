//! One-off todos and their create/update payloads

use crate::error::{ModelError, Result};
use crate::status::TaskStatus;
use crate::EntityId;
use serde::{Deserialize, Serialize};

/// Maximum title length accepted by the server.
pub const MAX_TITLE_LEN: usize = 200;

/// A todo that does not belong to any category and does not recur.
///
/// While a create is pending the id is negative and client-assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneOffTodo {
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
}

impl OneOffTodo {
    pub fn new(id: EntityId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: None,
            status: TaskStatus::Incomplete,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether the server has not confirmed this entity yet.
    pub fn is_pending(&self) -> bool {
        crate::is_temporary_id(self.id)
    }

    /// Return a copy with `patch` applied.
    pub fn patched(&self, patch: &OneOffPatch) -> Self {
        let mut next = self.clone();
        patch.apply_to(&mut next);
        next
    }
}

/// Body of a create request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOneOff {
    pub title: String,
    pub description: Option<String>,
}

impl NewOneOff {
    pub fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            title: title.into(),
            description,
        }
    }

    /// Check the title against the server's length constraints.
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)
    }
}

/// Partial update of a one-off todo. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneOffPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
}

impl OneOffPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Default::default()
        }
    }

    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none()
    }

    /// Overlay `later` onto this patch; fields `later` leaves unset survive.
    pub fn merge(&mut self, later: &OneOffPatch) {
        if let Some(title) = &later.title {
            self.title = Some(title.clone());
        }
        if let Some(description) = &later.description {
            self.description = Some(description.clone());
        }
        if let Some(status) = later.status {
            self.status = Some(status);
        }
    }

    pub fn apply_to(&self, todo: &mut OneOffTodo) {
        if let Some(title) = &self.title {
            todo.title = title.clone();
        }
        if let Some(description) = &self.description {
            todo.description = Some(description.clone());
        }
        if let Some(status) = self.status {
            todo.status = status;
        }
    }

    pub fn validate(&self) -> Result<()> {
        match &self.title {
            Some(title) => validate_title(title),
            None => Ok(()),
        }
    }
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(ModelError::EmptyTitle);
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ModelError::TitleTooLong { max: MAX_TITLE_LEN });
    }
    Ok(())
}

/// Sort one-offs by status precedence, keeping pending creates last within
/// a status group.
pub fn sort_oneoffs(items: &mut [OneOffTodo]) {
    items.sort_by(|a, b| {
        a.status
            .display_cmp(&b.status)
            .then_with(|| a.is_pending().cmp(&b.is_pending()))
            .then_with(|| a.id.abs().cmp(&b.id.abs()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_merge_keeps_unset_fields() {
        let mut patch = OneOffPatch {
            title: Some("Buy milk".to_string()),
            description: Some("2 litres".to_string()),
            status: None,
        };
        patch.merge(&OneOffPatch::status(TaskStatus::InProgress));
        assert_eq!(patch.title.as_deref(), Some("Buy milk"));
        assert_eq!(patch.description.as_deref(), Some("2 litres"));
        assert_eq!(patch.status, Some(TaskStatus::InProgress));
    }

    #[test]
    fn test_patch_serializes_only_set_fields() {
        let json = serde_json::to_string(&OneOffPatch::title("x")).unwrap();
        assert_eq!(json, r#"{"title":"x"}"#);
        assert!(OneOffPatch::default().is_empty());
    }

    #[test]
    fn test_patched() {
        let todo = OneOffTodo::new(5, "old").with_description("keep");
        let next = todo.patched(&OneOffPatch::title("new"));
        assert_eq!(next.title, "new");
        assert_eq!(next.description.as_deref(), Some("keep"));
        assert_eq!(todo.title, "old");
    }

    #[test]
    fn test_validate_title() {
        assert_eq!(NewOneOff::new("  ", None).validate(), Err(ModelError::EmptyTitle));
        let long = "x".repeat(MAX_TITLE_LEN + 1);
        assert_eq!(
            NewOneOff::new(long, None).validate(),
            Err(ModelError::TitleTooLong { max: MAX_TITLE_LEN })
        );
        assert!(NewOneOff::new("ok", None).validate().is_ok());
        assert!(OneOffPatch::status(TaskStatus::Complete).validate().is_ok());
    }

    #[test]
    fn test_pending_flag_and_sort() {
        let mut items = vec![
            OneOffTodo::new(-1, "pending"),
            OneOffTodo::new(4, "done").with_status(TaskStatus::Complete),
            OneOffTodo::new(2, "open"),
        ];
        assert!(items[0].is_pending());
        sort_oneoffs(&mut items);
        let ids: Vec<_> = items.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, -1, 4]);
    }
}
