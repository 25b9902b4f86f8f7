//! Background sync scheduler.
//!
//! One task owns every timer: the health probe (only while work is pending
//! or the server is down), the poll refresh, and the wake signal raised by
//! host online transitions and local mutations.

use crate::engine::SyncCore;
use api_client::TaskApi;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Handle to a running scheduler.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the scheduler and wait for its task to finish.
    ///
    /// A drain already in progress completes first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::warn!("Sync scheduler task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

pub(crate) fn spawn<A: TaskApi + 'static>(core: Arc<SyncCore<A>>) -> SchedulerHandle {
    let (shutdown, mut shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let mut health = interval(core.config.health_check_interval);
        health.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut poll = interval(core.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Both intervals fire immediately; start counting from now instead.
        health.tick().await;
        poll.tick().await;

        tracing::info!(
            health_secs = core.config.health_check_interval.as_secs(),
            poll_secs = core.config.poll_interval.as_secs(),
            "Sync scheduler started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::info!("Sync scheduler received shutdown signal");
                    break;
                }
                _ = core.wake.notified() => {
                    let outcome = core.sync_now().await;
                    tracing::debug!(?outcome, "Wake-triggered sync");
                }
                _ = health.tick() => {
                    let wanted = core.has_pending() || !core.monitor.server_reachable();
                    if wanted && core.monitor.browser_online() {
                        let reachable = core.monitor.probe(&core.api).await;
                        if reachable && core.has_pending() {
                            core.drain().await;
                        }
                    }
                }
                _ = poll.tick() => {
                    if core.monitor.can_sync() {
                        core.drain().await;
                        if let Err(e) = core.refresh().await {
                            tracing::debug!("Poll refresh failed: {}", e);
                        }
                    }
                }
            }
        }
    });

    SchedulerHandle { shutdown, task }
}
