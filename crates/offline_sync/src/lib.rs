//! Offline-first synchronization for the Taskin client.
//!
//! This crate keeps a local mirror of server state, applies user edits
//! optimistically, queues mutations while the server cannot be reached and
//! replays them once it can.
//!
//! # Modules
//!
//! - `operation`: queued intents for todo statuses and one-off todos
//! - `compress`: pure reduction of a queue to its minimal final intents
//! - `queue`: the two pending-operation queues and create resolution
//! - `cache`: immutable snapshots of categories, recommended todos and one-offs
//! - `connectivity`: host and server reachability, time-boxed health probe
//! - `engine`: `SyncCore`, draining and refresh
//! - `client`: `TaskClient`, the facade for the presentation layer
//! - `scheduler`: background probe, poll and wake handling
//! - `status`: sync status snapshot for display
//!
//! # Example
//!
//! ```
//! use offline_sync::{compress_oneoff_ops, OneOffOp};
//! use task_model::OneOffPatch;
//!
//! let queue = vec![
//!     OneOffOp::create(-1, "Buy milk", None),
//!     OneOffOp::update(-1, OneOffPatch::description("oat")),
//! ];
//! let compressed = compress_oneoff_ops(&queue);
//! assert_eq!(compressed, vec![OneOffOp::create(-1, "Buy milk", Some("oat".into()))]);
//! ```

pub mod cache;
pub mod client;
pub mod compress;
pub mod config;
pub mod connectivity;
pub mod engine;
pub mod error;
pub mod operation;
pub mod persist;
pub mod queue;
pub mod scheduler;
pub mod status;

pub use cache::CacheSnapshot;
pub use client::{MutationOutcome, TaskClient};
pub use compress::{compress_oneoff_ops, compress_status_ops};
pub use config::SyncConfig;
pub use connectivity::ConnectivityMonitor;
pub use engine::{DrainOutcome, DrainReport, SkipReason, SyncCore};
pub use error::{SyncError, SyncResult};
pub use operation::{OneOffOp, StatusOp};
pub use queue::{CreateResolution, OneOffQueue, StatusQueue};
pub use scheduler::SchedulerHandle;
pub use status::{ConnectionStatus, SyncActivity, SyncStatus};
