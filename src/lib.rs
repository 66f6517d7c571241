//! Encrypted local time-series cache for sensor readings.
//!
//! This crate persists periodic temperature/humidity readings in an
//! encrypted SQLite database, so a client can survive network or server
//! outages and serve raw and aggregated queries without contacting the
//! remote side.
//!
//! # Features
//!
//! - AES-256-CBC encryption per record, fresh IV on every write
//! - Time-indexed range queries over a bounded local history
//! - Retry-safe writes (bounded attempts, fixed delay)
//! - Scheduled retention, backup snapshots and hourly roll-up aggregation
//!
//! # Example
//!
//! ```no_run
//! use sensorvault::{Reading, SensorCache, StoreConfig};
//!
//! # async fn demo() -> Result<(), sensorvault::Error> {
//! let config = StoreConfig::from_secret("deployed-client-secret");
//! let mut cache = SensorCache::open(sensorvault::default_db_path(), config)?;
//!
//! // Cache a freshly fetched reading
//! cache.ingest(&Reading::new(21.5, 40.0, 1_700_000_000_000)).await;
//!
//! // Serve a chart without touching the network
//! let last_day = cache.query_range(1_700_000_000_000 - 86_400_000, 1_700_000_000_000).await;
//!
//! // Run retention/backup/aggregation in the background
//! cache.start_maintenance(Default::default());
//! # Ok(())
//! # }
//! ```

mod aggregate;
mod backup;
mod cache;
mod codec;
mod config;
mod error;
mod models;
mod retention;
mod retry;
mod scheduler;
mod schema;
mod store;

pub use cache::SensorCache;
pub use codec::{Codec, IV_LEN, SealedReading};
pub use config::{KEY_LEN, RetryPolicy, StoreConfig};
pub use error::{Error, Result};
pub use models::{AggregateBucket, BackupRecord, BatchResult, Reading, StoredRecord};
pub use scheduler::{MaintenanceConfig, MaintenanceScheduler};
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/sensorvault/data.db`
/// - macOS: `~/Library/Application Support/sensorvault/data.db`
/// - Windows: `C:\Users\<user>\AppData\Local\sensorvault\data.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("sensorvault")
        .join("data.db")
}
