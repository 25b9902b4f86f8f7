//! Task Model - Domain types for the Taskin client
//!
//! This crate provides the entities mirrored from the Taskin server
//! (categories, regular todos, one-off todos) together with the status
//! enum and the partial-update payload used by the offline sync layer.

mod error;
mod oneoff;
mod status;
mod todo;

pub use error::*;
pub use oneoff::*;
pub use status::*;
pub use todo::*;

/// Identifier of a server entity.
///
/// Server-assigned identifiers are positive. One-off todos created while a
/// create request is still pending carry a negative, client-assigned
/// identifier until the server confirms them.
pub type EntityId = i64;

/// Whether `id` is a client-assigned temporary identifier.
pub fn is_temporary_id(id: EntityId) -> bool {
    id < 0
}
