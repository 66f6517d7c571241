//! Main store implementation.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use rusqlite::{Connection, params};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::codec::Codec;
use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::models::{BatchResult, Reading, StoredRecord, now_ms};
use crate::retry::with_retry;
use crate::schema;

/// Encrypted SQLite-backed store for sensor readings.
///
/// Cloning is cheap: clones share the same connection and ID counter, which
/// is what the maintenance scheduler relies on. SQLite's own transaction
/// serialization is the only concurrency guard between clones.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    codec: Codec,
    config: Arc<StoreConfig>,
    last_id: Arc<AtomicI64>,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P, config: StoreConfig) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        // WAL mode for better concurrent read/write behavior
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        Self::finish_open(conn, config)
    }

    /// Open the default database location.
    pub fn open_default(config: StoreConfig) -> Result<Self> {
        Self::open(crate::default_db_path(), config)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory(config: StoreConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::finish_open(conn, config)
    }

    fn finish_open(conn: Connection, config: StoreConfig) -> Result<Self> {
        schema::initialize(&conn)?;

        // Seed the ID counter past anything already stored, so clock-derived
        // IDs stay unique across restarts even if the clock stepped back.
        let max_id: i64 =
            conn.query_row("SELECT COALESCE(MAX(id), 0) FROM records", [], |row| {
                row.get(0)
            })?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            codec: Codec::new(config.key),
            config: Arc::new(config),
            last_id: Arc::new(AtomicI64::new(max_id)),
        })
    }

    /// The configuration this store was opened with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn codec(&self) -> &Codec {
        &self.codec
    }

    pub(crate) fn conn(&self) -> &Arc<Mutex<Connection>> {
        &self.conn
    }

    /// Next record ID: the write-time clock in milliseconds, bumped past the
    /// previous ID when two writes land in the same millisecond.
    fn next_id(&self) -> i64 {
        let now = now_ms();
        let prev = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |prev| {
                Some(prev.max(now - 1) + 1)
            })
            .unwrap_or(now - 1);
        prev.max(now - 1) + 1
    }
}

// Record operations
impl Store {
    /// Encrypt and write one reading.
    ///
    /// Transient storage failures are retried per the configured
    /// [`RetryPolicy`](crate::RetryPolicy) (default: 3 attempts, 1s apart).
    /// Each attempt is a single transaction, so an eventual success persists
    /// exactly one record. Returns the assigned record ID.
    pub async fn put(&self, reading: &Reading) -> Result<i64> {
        with_retry(&self.config.retry, "put", || self.try_put(reading)).await
    }

    async fn try_put(&self, reading: &Reading) -> Result<i64> {
        let sealed = self.codec.seal(reading)?;
        let id = self.next_id();

        let mut conn = self.conn.lock().await;
        if self.config.allow_duplicate_timestamps {
            conn.execute(
                "INSERT INTO records (id, timestamp, iv, ciphertext) VALUES (?1, ?2, ?3, ?4)",
                params![id, reading.timestamp, sealed.iv.as_slice(), sealed.ciphertext],
            )?;
        } else {
            // Timestamp-keyed discipline: a later reading with the same
            // timestamp replaces the earlier one.
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM records WHERE timestamp = ?1",
                [reading.timestamp],
            )?;
            tx.execute(
                "INSERT INTO records (id, timestamp, iv, ciphertext) VALUES (?1, ?2, ?3, ?4)",
                params![id, reading.timestamp, sealed.iv.as_slice(), sealed.ciphertext],
            )?;
            tx.commit()?;
        }

        debug!("Stored record {} at timestamp {}", id, reading.timestamp);
        Ok(id)
    }

    /// Best-effort batch write.
    ///
    /// Each reading is written independently without the per-record retry
    /// loop; a batch with at least one committed record counts as a success.
    /// Callers must not assume all-or-nothing.
    pub async fn put_many(&self, readings: &[Reading]) -> BatchResult {
        let mut result = BatchResult::default();

        for reading in readings {
            match self.try_put(reading).await {
                Ok(_) => result.committed += 1,
                Err(e) => {
                    warn!("Batch write failed for timestamp {}: {}", reading.timestamp, e);
                    result.failed += 1;
                }
            }
        }

        debug!(
            "Batch write: {} committed, {} failed",
            result.committed, result.failed
        );
        result
    }

    /// Decrypt and return every stored reading, oldest first.
    ///
    /// Records that fail to decrypt are logged and dropped from the result
    /// rather than failing the whole read.
    pub async fn get_all(&self) -> Result<Vec<Reading>> {
        let records = self.get_all_records().await?;
        Ok(self.open_records(records))
    }

    /// Return readings with `start <= timestamp <= end`, oldest first.
    ///
    /// Same decrypt-or-drop behavior as [`get_all`](Self::get_all).
    pub async fn get_by_time_range(&self, start: i64, end: i64) -> Result<Vec<Reading>> {
        let records = {
            let conn = self.conn.lock().await;
            let mut stmt = conn.prepare(
                "SELECT id, timestamp, iv, ciphertext FROM records
                 WHERE timestamp >= ?1 AND timestamp <= ?2
                 ORDER BY timestamp ASC",
            )?;
            let rows = stmt
                .query_map([start, end], row_to_record)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        Ok(self.open_records(records))
    }

    /// Delete all records with `timestamp < cutoff` in one transaction.
    ///
    /// Returns the number of deleted records.
    pub async fn delete_before(&self, cutoff: i64) -> Result<usize> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let deleted = tx.execute("DELETE FROM records WHERE timestamp < ?1", [cutoff])?;
        tx.commit()?;

        debug!("Deleted {} records before {}", deleted, cutoff);
        Ok(deleted)
    }

    /// Count stored records.
    pub async fn count_records(&self) -> Result<u64> {
        let conn = self.conn.lock().await;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Fetch all records in their encrypted form, oldest first.
    pub(crate) async fn get_all_records(&self) -> Result<Vec<StoredRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, iv, ciphertext FROM records ORDER BY timestamp ASC",
        )?;
        let rows = stmt
            .query_map([], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Decrypt records, skipping any that fail to open.
    ///
    /// The clear-text column is authoritative for the timestamp.
    pub(crate) fn open_records(&self, records: Vec<StoredRecord>) -> Vec<Reading> {
        records
            .into_iter()
            .filter_map(|record| match self.codec.open(&record.iv, &record.ciphertext) {
                Ok(mut reading) => {
                    reading.timestamp = record.timestamp;
                    Some(reading)
                }
                Err(e) => {
                    warn!("Skipping unreadable record {}: {}", record.id, e);
                    None
                }
            })
            .collect()
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredRecord> {
    Ok(StoredRecord {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        iv: row.get(2)?,
        ciphertext: row.get(3)?,
    })
}
