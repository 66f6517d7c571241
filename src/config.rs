//! Store configuration.

use std::time::Duration;

use sha2::{Digest, Sha256};

/// Length of the AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// Configuration for a store instance.
///
/// Key material, retention horizon and bucket width are explicit per-store
/// state, so tests can run distinct keys and instances in parallel.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// 256-bit symmetric key for record encryption.
    pub key: [u8; KEY_LEN],
    /// Whether two readings may share a timestamp.
    ///
    /// When `true` (the default) records are keyed by a clock-derived ID and
    /// same-timestamp readings coexist. When `false` records are keyed by
    /// timestamp and a later put replaces the earlier record.
    pub allow_duplicate_timestamps: bool,
    /// Width of an aggregation bucket in milliseconds.
    pub bucket_width_ms: i64,
    /// Retention horizon for primary records, in days.
    pub retention_days: u32,
    /// Optional retention horizon for the backup area, in days.
    ///
    /// `None` (the default) lets backups accumulate without bound.
    pub backup_retention_days: Option<u32>,
    /// Retry behavior for writes.
    pub retry: RetryPolicy,
}

impl StoreConfig {
    /// Create a configuration with an explicit 256-bit key.
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self {
            key,
            allow_duplicate_timestamps: true,
            bucket_width_ms: 3_600_000,
            retention_days: 30,
            backup_retention_days: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Derive the key deterministically from a secret passphrase.
    ///
    /// The same secret always yields the same key (SHA-256 of the secret
    /// bytes), so a key baked into a deployed client can be expressed as a
    /// string constant.
    pub fn from_secret(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&digest);
        Self::new(key)
    }

    /// Key records by timestamp instead of by ID.
    ///
    /// Same-timestamp readings then silently replace each other.
    #[must_use]
    pub fn timestamp_keyed(mut self) -> Self {
        self.allow_duplicate_timestamps = false;
        self
    }

    /// Set the aggregation bucket width.
    #[must_use]
    pub fn bucket_width_ms(mut self, width: i64) -> Self {
        self.bucket_width_ms = width;
        self
    }

    /// Set the retention horizon in days.
    #[must_use]
    pub fn retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    /// Apply a retention horizon to the backup area as well.
    #[must_use]
    pub fn backup_retention_days(mut self, days: u32) -> Self {
        self.backup_retention_days = Some(days);
        self
    }

    /// Set the write retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Bounded fixed-delay retry policy for write operations.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with a custom attempt bound.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// No retries: fail on the first error.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Set the delay between attempts.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_secret_is_deterministic() {
        let a = StoreConfig::from_secret("sensor-secret");
        let b = StoreConfig::from_secret("sensor-secret");
        assert_eq!(a.key, b.key);

        let c = StoreConfig::from_secret("other-secret");
        assert_ne!(a.key, c.key);
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::new([0u8; KEY_LEN]);
        assert!(config.allow_duplicate_timestamps);
        assert_eq!(config.bucket_width_ms, 3_600_000);
        assert_eq!(config.retention_days, 30);
        assert!(config.backup_retention_days.is_none());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay, Duration::from_secs(1));
    }

    #[test]
    fn test_builder_chaining() {
        let config = StoreConfig::from_secret("s")
            .timestamp_keyed()
            .bucket_width_ms(60_000)
            .retention_days(7)
            .backup_retention_days(90)
            .retry(RetryPolicy::new(5).delay(Duration::from_millis(10)));

        assert!(!config.allow_duplicate_timestamps);
        assert_eq!(config.bucket_width_ms, 60_000);
        assert_eq!(config.retention_days, 7);
        assert_eq!(config.backup_retention_days, Some(90));
        assert_eq!(config.retry.max_attempts, 5);
    }
}
