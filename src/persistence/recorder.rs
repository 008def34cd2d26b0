//! Background task that persists activities and snapshots.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tracing::{error, info, warn};

use super::postgres::PostgresPersistence;
use crate::config::AppConfig;
use crate::domain::{Activity, FairStore};

/// Recorder settings.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Time between state snapshots.
    pub snapshot_interval: Duration,
    /// Append activities to the activity log.
    pub event_log_enabled: bool,
    /// Snapshot retention in days (0 keeps everything).
    pub cleanup_after_days: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: Duration::from_secs(60),
            event_log_enabled: true,
            cleanup_after_days: 30,
        }
    }
}

impl From<&AppConfig> for RecorderConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            snapshot_interval: Duration::from_secs(config.snapshot_interval_secs.max(1)),
            event_log_enabled: config.event_log_enabled,
            cleanup_after_days: config.cleanup_after_days,
        }
    }
}

/// Drains the activity bus into Postgres and snapshots the fair state.
#[derive(Debug)]
pub struct Recorder {
    persistence: PostgresPersistence,
    store: Arc<FairStore>,
    config: RecorderConfig,
}

impl Recorder {
    /// Creates a recorder.
    #[must_use]
    pub fn new(
        persistence: PostgresPersistence,
        store: Arc<FairStore>,
        config: RecorderConfig,
    ) -> Self {
        Self {
            persistence,
            store,
            config,
        }
    }

    /// Runs until `shutdown` flips to `true` or the bus closes, then writes
    /// a final snapshot.
    pub async fn run(
        self,
        mut activities: broadcast::Receiver<Activity>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            snapshot_interval_secs = self.config.snapshot_interval.as_secs(),
            event_log_enabled = self.config.event_log_enabled,
            cleanup_after_days = self.config.cleanup_after_days,
            "starting persistence recorder"
        );

        let mut interval = tokio::time::interval(self.config.snapshot_interval);
        interval.tick().await;

        loop {
            tokio::select! {
                received = activities.recv(), if self.config.event_log_enabled => {
                    match received {
                        Ok(activity) => self.record(&activity).await,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "recorder lagged behind the activity bus");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!("activity bus closed");
                            break;
                        }
                    }
                }
                _ = interval.tick() => {
                    self.snapshot().await;
                    self.prune().await;
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("persistence recorder shutting down");
                        break;
                    }
                }
            }
        }

        self.snapshot().await;
    }

    async fn record(&self, activity: &Activity) {
        if let Err(e) = self.persistence.save_activity(activity).await {
            error!(error = %e, kind = activity.kind(), "failed to persist activity");
        }
    }

    async fn snapshot(&self) {
        let state_json = match self.store.snapshot_json().await {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "failed to serialize state snapshot");
                return;
            }
        };
        match self.persistence.save_snapshot(&state_json).await {
            Ok(id) => info!(snapshot_id = id, "state snapshot saved"),
            Err(e) => error!(error = %e, "failed to save state snapshot"),
        }
    }

    async fn prune(&self) {
        if self.config.cleanup_after_days == 0 {
            return;
        }
        match self
            .persistence
            .delete_old_snapshots(self.config.cleanup_after_days)
            .await
        {
            Ok(0) => {}
            Ok(deleted) => info!(deleted, "pruned old state snapshots"),
            Err(e) => warn!(error = %e, "failed to prune state snapshots"),
        }
    }
}
