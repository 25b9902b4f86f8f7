//! Task status and its display ordering

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Status of a todo or one-off todo.
///
/// Any status may transition to any other; the ordering below is only used
/// for presenting lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "incomplete")]
    Incomplete,
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "skipped")]
    Skipped,
}

impl TaskStatus {
    /// All statuses in display precedence order.
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::InProgress,
        TaskStatus::Incomplete,
        TaskStatus::Complete,
        TaskStatus::Skipped,
    ];

    /// Wire representation used by the server.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Incomplete => "incomplete",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Complete => "complete",
            TaskStatus::Skipped => "skipped",
        }
    }

    /// Position in display order (lower sorts first)
    pub fn display_rank(&self) -> u8 {
        match self {
            TaskStatus::InProgress => 0,
            TaskStatus::Incomplete => 1,
            TaskStatus::Complete => 2,
            TaskStatus::Skipped => 3,
        }
    }

    /// Compare two statuses by display precedence.
    pub fn display_cmp(&self, other: &TaskStatus) -> Ordering {
        self.display_rank().cmp(&other.display_rank())
    }

    /// Whether the task still needs attention.
    pub fn is_open(&self) -> bool {
        matches!(self, TaskStatus::Incomplete | TaskStatus::InProgress)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "incomplete" => Ok(TaskStatus::Incomplete),
            "in-progress" | "in_progress" => Ok(TaskStatus::InProgress),
            "complete" => Ok(TaskStatus::Complete),
            "skipped" => Ok(TaskStatus::Skipped),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
        let parsed: TaskStatus = serde_json::from_str("\"skipped\"").unwrap();
        assert_eq!(parsed, TaskStatus::Skipped);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("complete".parse::<TaskStatus>().unwrap(), TaskStatus::Complete);
        assert_eq!("in_progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!(
            "done".parse::<TaskStatus>(),
            Err(ModelError::UnknownStatus("done".to_string()))
        );
    }

    #[test]
    fn test_display_order() {
        let mut statuses = vec![
            TaskStatus::Skipped,
            TaskStatus::Complete,
            TaskStatus::Incomplete,
            TaskStatus::InProgress,
        ];
        statuses.sort_by(|a, b| a.display_cmp(b));
        assert_eq!(statuses, TaskStatus::ALL.to_vec());
    }

    #[test]
    fn test_default_is_incomplete() {
        assert_eq!(TaskStatus::default(), TaskStatus::Incomplete);
        assert!(TaskStatus::default().is_open());
        assert!(!TaskStatus::Skipped.is_open());
    }
}
