//! Error types for the task model

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Unknown task status: {0}")]
    UnknownStatus(String),

    #[error("Title must not be empty")]
    EmptyTitle,

    #[error("Title exceeds {max} characters")]
    TitleTooLong { max: usize },
}

pub type Result<T> = std::result::Result<T, ModelError>;
