//! Background maintenance scheduling.
//!
//! Retention, backup and aggregation each run on their own periodic timer
//! with no cross-coordination; an aggregation pass may overlap a retention
//! delete and observe either side of it (the store's weak-consistency
//! contract). A failed run is logged and does not stop later runs.

use std::time::Duration;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::store::Store;

/// Periods for the three maintenance tasks.
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// How often to enforce retention. Default: 24h.
    pub retention_period: Duration,
    /// How often to snapshot into the backup area. Default: 24h.
    pub backup_period: Duration,
    /// How often to recompute aggregates. Default: 1h.
    pub aggregate_period: Duration,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            retention_period: Duration::from_secs(24 * 60 * 60),
            backup_period: Duration::from_secs(24 * 60 * 60),
            aggregate_period: Duration::from_secs(60 * 60),
        }
    }
}

/// Drives retention, backup and aggregation on independent timers.
///
/// Holds nothing beyond the task handles and a cancellation token;
/// [`shutdown`](Self::shutdown) stops all three timers as one operation.
/// In-flight passes finish their current transaction, so cancellation never
/// leaves a write half-applied.
pub struct MaintenanceScheduler {
    handles: Vec<tokio::task::JoinHandle<()>>,
    cancel: CancellationToken,
}

impl MaintenanceScheduler {
    /// Start the three maintenance timers against a store.
    pub fn start(store: &Store, config: MaintenanceConfig) -> Self {
        let cancel = CancellationToken::new();
        info!(
            "Starting maintenance: retention every {:?}, backup every {:?}, aggregation every {:?}",
            config.retention_period, config.backup_period, config.aggregate_period
        );

        let retention = {
            let store = store.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut timer = interval(config.retention_period);
                timer.tick().await; // the first tick resolves immediately
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!("Retention timer cancelled");
                            break;
                        }
                        _ = timer.tick() => {
                            let days = store.config().retention_days;
                            if let Err(e) = store.enforce_retention(days).await {
                                warn!("Scheduled retention failed: {}", e);
                            }
                        }
                    }
                }
            })
        };

        let backup = {
            let store = store.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut timer = interval(config.backup_period);
                timer.tick().await;
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!("Backup timer cancelled");
                            break;
                        }
                        _ = timer.tick() => {
                            if let Err(e) = store.create_backup().await {
                                warn!("Scheduled backup failed: {}", e);
                            }
                        }
                    }
                }
            })
        };

        let aggregate = {
            let store = store.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut timer = interval(config.aggregate_period);
                timer.tick().await;
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!("Aggregation timer cancelled");
                            break;
                        }
                        _ = timer.tick() => {
                            if let Err(e) = store.aggregate().await {
                                warn!("Scheduled aggregation failed: {}", e);
                            }
                        }
                    }
                }
            })
        };

        Self {
            handles: vec![retention, backup, aggregate],
            cancel,
        }
    }

    /// Stop all three timers.
    ///
    /// Signals cancellation and returns; the tasks drain on their own after
    /// finishing any pass already in progress.
    pub fn shutdown(&self) {
        info!("Stopping maintenance scheduler");
        self.cancel.cancel();
    }

    /// Whether any maintenance task is still running.
    pub fn is_active(&self) -> bool {
        self.handles.iter().any(|handle| !handle.is_finished())
    }
}

impl Drop for MaintenanceScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
