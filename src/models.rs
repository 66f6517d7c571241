//! Data models for stored sensor data.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One temperature/humidity sample.
///
/// Timestamps are unix milliseconds. The store assumes readings arriving at
/// its boundary are already validated; all three fields must be present and
/// numeric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Temperature in Celsius.
    pub temperature: f64,
    /// Relative humidity percentage.
    pub humidity: f64,
    /// Capture time in unix milliseconds.
    pub timestamp: i64,
}

impl Reading {
    /// Create a new reading.
    pub fn new(temperature: f64, humidity: f64, timestamp: i64) -> Self {
        Self {
            temperature,
            humidity,
            timestamp,
        }
    }
}

/// The encrypted, persisted form of a [`Reading`].
///
/// The timestamp is stored in the clear to support the time index; the
/// temperature and humidity live inside the ciphertext.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// Unique record ID, derived from the write-time clock.
    pub id: i64,
    /// Capture time in unix milliseconds (clear, indexed).
    pub timestamp: i64,
    /// Random 16-byte initialization vector.
    pub iv: Vec<u8>,
    /// AES-256-CBC ciphertext of the JSON-encoded reading.
    pub ciphertext: Vec<u8>,
}

/// A roll-up of all readings within one fixed-width time bucket.
///
/// Buckets are derived data: fully recomputed on every aggregation pass and
/// safe to discard and rebuild from the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateBucket {
    /// Bucket start in unix milliseconds (also the bucket key).
    pub bucket_start: i64,
    /// Mean temperature over the bucket.
    pub avg_temperature: f64,
    /// Mean humidity over the bucket.
    pub avg_humidity: f64,
    /// Minimum temperature over the bucket.
    pub min_temperature: f64,
    /// Maximum temperature over the bucket.
    pub max_temperature: f64,
    /// Minimum humidity over the bucket.
    pub min_humidity: f64,
    /// Maximum humidity over the bucket.
    pub max_humidity: f64,
    /// Number of readings in the bucket.
    pub sample_count: u32,
}

/// A resealed copy of a record in the backup area.
#[derive(Debug, Clone)]
pub struct BackupRecord {
    /// Backup row ID (auto-assigned, unrelated to the source record ID).
    pub id: i64,
    /// ID of the source record at backup time.
    pub record_id: i64,
    /// Capture time of the source reading in unix milliseconds.
    pub timestamp: i64,
    /// Fresh IV drawn when the record was resealed.
    pub iv: Vec<u8>,
    /// Resealed ciphertext.
    pub ciphertext: Vec<u8>,
    /// When this backup pass ran, in unix milliseconds.
    pub backup_timestamp: i64,
}

/// Outcome of a batch write.
///
/// Batch writes are best-effort: a partially committed batch is still
/// useful, so callers get both counts instead of a single boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchResult {
    /// Records durably written.
    pub committed: usize,
    /// Records that failed after all retries.
    pub failed: usize,
}

impl BatchResult {
    /// At least one record committed.
    pub fn is_success(&self) -> bool {
        self.committed > 0
    }

    /// Every record committed.
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.committed > 0
    }
}

/// Current wall-clock time in unix milliseconds.
pub(crate) fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}
