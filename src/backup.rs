//! Periodic backup snapshots.
//!
//! A backup pass reseals every current record under a fresh IV and appends
//! the copies into a separate area, stamped with the pass's wall-clock time.
//! There is no deduplication: N passes over unchanged data produce N copies.
//! Once source records age out of retention, their backup copies are the
//! only remaining copy.

use rusqlite::params;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{BackupRecord, now_ms};
use crate::store::Store;

impl Store {
    /// Snapshot all current records into the backup area.
    ///
    /// Records that fail to decrypt are skipped. Each copy is inserted
    /// individually, so a failure partway through leaves a partial backup;
    /// that is tolerated rather than rolled back. Returns the number of
    /// copies written.
    pub async fn create_backup(&self) -> Result<usize> {
        let records = self.get_all_records().await?;
        let backup_timestamp = now_ms();
        let mut written = 0;

        let conn = self.conn().lock().await;
        for record in records {
            let reading = match self.codec().open(&record.iv, &record.ciphertext) {
                Ok(reading) => reading,
                Err(e) => {
                    warn!("Backup: skipping unreadable record {}: {}", record.id, e);
                    continue;
                }
            };

            let sealed = self.codec().seal(&reading)?;
            let inserted = conn.execute(
                "INSERT INTO backup_records (record_id, timestamp, iv, ciphertext, backup_timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.timestamp,
                    sealed.iv.as_slice(),
                    sealed.ciphertext,
                    backup_timestamp,
                ],
            );

            match inserted {
                Ok(_) => written += 1,
                Err(e) => warn!("Backup: failed to copy record {}: {}", record.id, e),
            }
        }

        info!("Backup: wrote {} copies at {}", written, backup_timestamp);
        Ok(written)
    }

    /// Count copies in the backup area.
    pub async fn count_backups(&self) -> Result<u64> {
        let conn = self.conn().lock().await;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM backup_records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Delete backup copies whose source timestamp is before `cutoff`.
    pub(crate) async fn delete_backups_before(&self, cutoff: i64) -> Result<usize> {
        let mut conn = self.conn().lock().await;
        let tx = conn.transaction()?;
        let deleted = tx.execute(
            "DELETE FROM backup_records WHERE timestamp < ?1",
            [cutoff],
        )?;
        tx.commit()?;
        Ok(deleted)
    }

    /// Fetch all backup copies, oldest source timestamp first (for tests and
    /// manual inspection).
    pub async fn get_backups(&self) -> Result<Vec<BackupRecord>> {
        let conn = self.conn().lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, record_id, timestamp, iv, ciphertext, backup_timestamp
             FROM backup_records ORDER BY timestamp ASC, id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(BackupRecord {
                    id: row.get(0)?,
                    record_id: row.get(1)?,
                    timestamp: row.get(2)?,
                    iv: row.get(3)?,
                    ciphertext: row.get(4)?,
                    backup_timestamp: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
