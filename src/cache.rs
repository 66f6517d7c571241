//! Boundary facade for ingest and query collaborators.
//!
//! The cache converts every storage fault into boolean or empty-result
//! signaling: UI code calling through this layer never needs error handling
//! for storage problems. A failed write degrades to "data not cached this
//! cycle" and the next ingest cycle retries naturally. Inputs are assumed
//! validated upstream.

use std::path::Path;

use tracing::error;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::models::{AggregateBucket, BatchResult, Reading};
use crate::scheduler::{MaintenanceConfig, MaintenanceScheduler};
use crate::store::Store;

/// Client-resident cache of sensor readings.
///
/// Wraps a [`Store`] with the swallow-and-log error policy the surrounding
/// UI expects, and owns the maintenance scheduler.
pub struct SensorCache {
    store: Store,
    scheduler: Option<MaintenanceScheduler>,
}

impl SensorCache {
    /// Open or create a cache backed by a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        Ok(Self {
            store: Store::open(path, config)?,
            scheduler: None,
        })
    }

    /// Open an in-memory cache (for testing).
    pub fn open_in_memory(config: StoreConfig) -> Result<Self> {
        Ok(Self {
            store: Store::open_in_memory(config)?,
            scheduler: None,
        })
    }

    /// The underlying store, for callers that want typed errors.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Cache one newly fetched reading.
    ///
    /// Returns false only after all write retries are exhausted.
    pub async fn ingest(&self, reading: &Reading) -> bool {
        match self.store.put(reading).await {
            Ok(_) => true,
            Err(e) => {
                error!("Failed to cache reading: {}", e);
                false
            }
        }
    }

    /// Cache a batch of readings, best-effort.
    pub async fn ingest_many(&self, readings: &[Reading]) -> BatchResult {
        self.store.put_many(readings).await
    }

    /// All cached readings, oldest first. Empty on storage failure.
    pub async fn query_all(&self) -> Vec<Reading> {
        match self.store.get_all().await {
            Ok(readings) => readings,
            Err(e) => {
                error!("Failed to read cached data: {}", e);
                Vec::new()
            }
        }
    }

    /// Cached readings with `start <= timestamp <= end`, oldest first.
    /// Empty on storage failure.
    pub async fn query_range(&self, start: i64, end: i64) -> Vec<Reading> {
        match self.store.get_by_time_range(start, end).await {
            Ok(readings) => readings,
            Err(e) => {
                error!("Failed to read cached range: {}", e);
                Vec::new()
            }
        }
    }

    /// All aggregate buckets, oldest first. Empty on storage failure.
    pub async fn query_aggregates(&self) -> Vec<AggregateBucket> {
        match self.store.get_aggregates().await {
            Ok(buckets) => buckets,
            Err(e) => {
                error!("Failed to read aggregates: {}", e);
                Vec::new()
            }
        }
    }

    /// Trigger retention on demand, in addition to the scheduled run.
    ///
    /// Retention is advisory: failures are logged and reported as false.
    pub async fn purge(&self, max_age_days: u32) -> bool {
        match self.store.enforce_retention(max_age_days).await {
            Ok(_) => true,
            Err(e) => {
                error!("Retention failed: {}", e);
                false
            }
        }
    }

    /// Start scheduled maintenance with the given periods.
    ///
    /// Replaces any previously running scheduler.
    pub fn start_maintenance(&mut self, config: MaintenanceConfig) {
        if let Some(old) = self.scheduler.take() {
            old.shutdown();
        }
        self.scheduler = Some(MaintenanceScheduler::start(&self.store, config));
    }

    /// Stop all scheduled maintenance.
    pub fn shutdown(&mut self) {
        if let Some(scheduler) = self.scheduler.take() {
            scheduler.shutdown();
        }
    }
}

impl Drop for SensorCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}
