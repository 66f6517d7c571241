//! Time-bounded retention.

use tracing::{debug, info};

use crate::error::Result;
use crate::models::now_ms;
use crate::store::Store;

const MS_PER_DAY: i64 = 86_400_000;

impl Store {
    /// Delete records older than `max_age_days`.
    ///
    /// Idempotent: a second call with the same or a later cutoff deletes
    /// nothing. When a backup retention horizon is configured, backup copies
    /// older than that horizon are pruned in the same pass; without one the
    /// backup area grows without bound.
    ///
    /// Returns the number of primary records deleted.
    pub async fn enforce_retention(&self, max_age_days: u32) -> Result<usize> {
        let cutoff = now_ms() - i64::from(max_age_days) * MS_PER_DAY;
        let deleted = self.delete_before(cutoff).await?;

        if deleted > 0 {
            info!(
                "Retention: deleted {} records older than {} days",
                deleted, max_age_days
            );
        } else {
            debug!("Retention: nothing older than {} days", max_age_days);
        }

        if let Some(backup_days) = self.config().backup_retention_days {
            let backup_cutoff = now_ms() - i64::from(backup_days) * MS_PER_DAY;
            let pruned = self.delete_backups_before(backup_cutoff).await?;
            if pruned > 0 {
                info!("Retention: pruned {} backup copies", pruned);
            }
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetryPolicy, StoreConfig};
    use crate::models::Reading;

    fn test_store(config: StoreConfig) -> Store {
        Store::open_in_memory(config.retry(RetryPolicy::none())).unwrap()
    }

    #[tokio::test]
    async fn test_enforce_deletes_only_expired() {
        let store = test_store(StoreConfig::from_secret("retention-test"));
        let now = now_ms();

        // 40 days old: expired. 10 days old and current: kept.
        store
            .put(&Reading::new(20.0, 50.0, now - 40 * MS_PER_DAY))
            .await
            .unwrap();
        store
            .put(&Reading::new(21.0, 51.0, now - 10 * MS_PER_DAY))
            .await
            .unwrap();
        store.put(&Reading::new(22.0, 52.0, now)).await.unwrap();

        let deleted = store.enforce_retention(30).await.unwrap();
        assert_eq!(deleted, 1);

        let remaining = store.get_all().await.unwrap();
        assert_eq!(remaining.len(), 2);
        let cutoff = now_ms() - 30 * MS_PER_DAY;
        assert!(remaining.iter().all(|r| r.timestamp >= cutoff));
    }

    #[tokio::test]
    async fn test_enforce_is_idempotent() {
        let store = test_store(StoreConfig::from_secret("retention-test"));
        let now = now_ms();

        store
            .put(&Reading::new(20.0, 50.0, now - 40 * MS_PER_DAY))
            .await
            .unwrap();

        assert_eq!(store.enforce_retention(30).await.unwrap(), 1);
        assert_eq!(store.enforce_retention(30).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_backup_area_untouched_by_default() {
        let store = test_store(StoreConfig::from_secret("retention-test"));
        let now = now_ms();

        store
            .put(&Reading::new(20.0, 50.0, now - 40 * MS_PER_DAY))
            .await
            .unwrap();
        store.create_backup().await.unwrap();

        store.enforce_retention(30).await.unwrap();

        // The source record is gone but its backup copy survives.
        assert_eq!(store.count_records().await.unwrap(), 0);
        assert_eq!(store.count_backups().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_backup_retention_prunes_old_copies() {
        let store = test_store(
            StoreConfig::from_secret("retention-test").backup_retention_days(30),
        );
        let now = now_ms();

        store
            .put(&Reading::new(20.0, 50.0, now - 40 * MS_PER_DAY))
            .await
            .unwrap();
        store.create_backup().await.unwrap();

        store.enforce_retention(30).await.unwrap();
        assert_eq!(store.count_backups().await.unwrap(), 0);
    }
}
