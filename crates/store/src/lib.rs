//! Store - Persistence for the Taskin sync client
//!
//! This crate provides the key-value persistence port used to keep cached
//! entities and pending-operation queues across restarts, its file and
//! in-memory backends, and application settings.

mod error;
mod file;
mod kv;
mod memory;
mod settings;

pub use error::*;
pub use file::*;
pub use kv::*;
pub use memory::*;
pub use settings::*;
