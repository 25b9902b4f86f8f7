//! Sync status reporting for the presentation layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a drain is currently running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncActivity {
    #[default]
    Idle,
    Syncing,
}

/// Connection state derived from host and server reachability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Host online and server answering
    Online,
    /// Host reports no network
    #[default]
    Offline,
    /// Host online but the last health probe failed
    Unreachable,
    /// Replaying queued changes
    Syncing,
}

impl ConnectionStatus {
    pub fn derive(browser_online: bool, server_reachable: bool, activity: SyncActivity) -> Self {
        if !browser_online {
            ConnectionStatus::Offline
        } else if !server_reachable {
            ConnectionStatus::Unreachable
        } else if activity == SyncActivity::Syncing {
            ConnectionStatus::Syncing
        } else {
            ConnectionStatus::Online
        }
    }
}

/// Snapshot of sync state for UI display
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub state: SyncActivity,
    pub connection: ConnectionStatus,
    pub pending_operations: usize,
    pub browser_online: bool,
    pub server_reachable: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub load_error: Option<String>,
}

impl SyncStatus {
    /// Check if the indicator should be shown
    ///
    /// Returns true if not fully online or work is outstanding
    pub fn should_show(&self) -> bool {
        !matches!(self.connection, ConnectionStatus::Online)
            || self.pending_operations > 0
            || self.load_error.is_some()
    }

    /// Get a short status string
    pub fn short_status(&self) -> &'static str {
        match self.connection {
            ConnectionStatus::Online => "Online",
            ConnectionStatus::Offline => "Offline",
            ConnectionStatus::Unreachable => "Unreachable",
            ConnectionStatus::Syncing => "Syncing",
        }
    }

    pub fn status_message(&self) -> String {
        let pending = self.pending_operations;
        match self.connection {
            ConnectionStatus::Online if pending > 0 => format!("Connected - {} pending changes", pending),
            ConnectionStatus::Online => "Connected".to_string(),
            ConnectionStatus::Offline if pending > 0 => format!("Offline - {} pending changes", pending),
            ConnectionStatus::Offline => "Offline".to_string(),
            ConnectionStatus::Unreachable if pending > 0 => {
                format!("Server unreachable - {} pending changes", pending)
            }
            ConnectionStatus::Unreachable => "Server unreachable".to_string(),
            ConnectionStatus::Syncing => "Syncing changes...".to_string(),
        }
    }

    /// Seconds since the last clean drain, relative to `now`.
    pub fn seconds_since_sync(&self, now: DateTime<Utc>) -> Option<u64> {
        self.last_sync
            .map(|at| u64::try_from((now - at).num_seconds()).unwrap_or(0))
    }

    /// Format time since sync for display
    pub fn formatted_time_since_sync(&self, now: DateTime<Utc>) -> Option<String> {
        self.seconds_since_sync(now).map(format_elapsed)
    }
}

fn format_elapsed(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s ago", seconds)
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h ago", seconds / 3600)
    } else {
        format!("{}d ago", seconds / 86400)
    }
}
