//! Error types for the offline sync crate.

use api_client::ApiError;
use store::StoreError;
use task_model::{EntityId, ModelError};
use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors surfaced by the sync layer.
///
/// Remote failures during mutations and drains are absorbed by the queues;
/// only loading and input validation report errors to the caller.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Persistence backend failed.
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Remote call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Input rejected before any local change was made.
    #[error("Invalid input: {0}")]
    Invalid(#[from] ModelError),

    /// Target entity is not in the local cache.
    #[error("Entity not found: {0}")]
    NotFound(EntityId),
}
