//! Periodic eviction of idle sessions.

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::store::SessionStore;
use crate::config::SessionsConfig;

#[derive(Debug, Clone, Copy)]
pub struct SweeperConfig {
    pub interval: Duration,
    pub inactivity_timeout: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            inactivity_timeout: Duration::from_secs(300),
        }
    }
}

impl From<&SessionsConfig> for SweeperConfig {
    fn from(config: &SessionsConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.sweep_interval_seconds.max(1)),
            inactivity_timeout: Duration::from_secs(config.inactivity_timeout_seconds),
        }
    }
}

/// Handle to a running sweeper.
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for the current pass to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "Session sweeper panicked");
        }
    }
}

/// Spawn the sweeper. It stops when `cancel` fires or on [`SweeperHandle::shutdown`].
pub fn spawn_sweeper(
    store: SessionStore,
    config: SweeperConfig,
    cancel: CancellationToken,
) -> SweeperHandle {
    let token = cancel.clone();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        info!(
            interval_secs = config.interval.as_secs(),
            inactivity_secs = config.inactivity_timeout.as_secs(),
            "Session sweeper started"
        );

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    debug!("Sweeping inactive sessions");
                    store.evict_inactive(Utc::now(), config.inactivity_timeout);
                }
            }
        }

        info!("Session sweeper stopped");
    });

    SweeperHandle { cancel, task }
}
