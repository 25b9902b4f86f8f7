//! Connectivity tracking.
//!
//! Sync is permitted only when the host reports network access and the last
//! health probe reached the server.

use api_client::TaskApi;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Host and server reachability flags.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    browser_online: AtomicBool,
    server_reachable: AtomicBool,
    probe_timeout: Duration,
}

impl ConnectivityMonitor {
    /// Both flags start optimistic; the first probe corrects them.
    pub fn new(probe_timeout: Duration) -> Self {
        Self {
            browser_online: AtomicBool::new(true),
            server_reachable: AtomicBool::new(true),
            probe_timeout,
        }
    }

    pub fn browser_online(&self) -> bool {
        self.browser_online.load(Ordering::SeqCst)
    }

    pub fn server_reachable(&self) -> bool {
        self.server_reachable.load(Ordering::SeqCst)
    }

    pub fn can_sync(&self) -> bool {
        self.browser_online() && self.server_reachable()
    }

    /// Record the host's network state.
    ///
    /// Returns true on an offline to online transition.
    pub fn set_browser_online(&self, online: bool) -> bool {
        let was_online = self.browser_online.swap(online, Ordering::SeqCst);
        if was_online != online {
            tracing::info!(online, "Host connectivity changed");
        }
        online && !was_online
    }

    pub fn set_server_reachable(&self, reachable: bool) -> bool {
        let was_reachable = self.server_reachable.swap(reachable, Ordering::SeqCst);
        if was_reachable != reachable {
            tracing::info!(reachable, "Server reachability changed");
        }
        reachable && !was_reachable
    }

    /// Run one time-boxed health check and record the result.
    ///
    /// Failures and timeouts only mark the server unreachable.
    pub async fn probe<A: TaskApi>(&self, api: &A) -> bool {
        let reachable = match tokio::time::timeout(self.probe_timeout, api.health_check()).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::debug!("Health check failed: {}", e);
                false
            }
            Err(_) => {
                tracing::debug!(timeout_ms = self.probe_timeout.as_millis() as u64, "Health check timed out");
                false
            }
        };
        self.set_server_reachable(reachable);
        reachable
    }
}
