//! End-to-end tests exercising ingest, query, retention, backup and
//! aggregation together through the public API.

use sensorvault::{Reading, RetryPolicy, SensorCache, StoreConfig};

const MINUTE_MS: i64 = 60_000;
const HOUR_MS: i64 = 3_600_000;

fn test_cache(secret: &str) -> SensorCache {
    let config = StoreConfig::from_secret(secret).retry(RetryPolicy::none());
    SensorCache::open_in_memory(config).unwrap()
}

#[tokio::test]
async fn test_minute_spaced_ingest_range_and_rollup() {
    let cache = test_cache("e2e");

    // 25 readings spaced one minute apart, all inside a single hour bucket.
    let t0: i64 = 1_700_000_400_000; // a round 10-minute mark, mid-hour start
    let t0 = t0 - t0.rem_euclid(HOUR_MS); // align to the bucket boundary
    let readings: Vec<Reading> = (0..25)
        .map(|i| Reading::new(20.0 + i as f64 * 0.1, 40.0 + i as f64 * 0.2, t0 + i * MINUTE_MS))
        .collect();

    let result = cache.ingest_many(&readings).await;
    assert!(result.is_complete());
    assert_eq!(result.committed, 25);

    // Inclusive bounds: t0 .. t0+20min covers readings 0..=20.
    let ranged = cache.query_range(t0, t0 + 20 * MINUTE_MS).await;
    assert_eq!(ranged.len(), 21);

    // All 25 minutes fall within one hour, so exactly one bucket.
    assert_eq!(cache.store().aggregate().await.unwrap(), 1);
    let buckets = cache.query_aggregates().await;
    assert_eq!(buckets.len(), 1);

    let bucket = &buckets[0];
    assert_eq!(bucket.bucket_start, t0);
    assert_eq!(bucket.sample_count, 25);

    // Manual computation over all 25 values.
    let temps: Vec<f64> = readings.iter().map(|r| r.temperature).collect();
    let hums: Vec<f64> = readings.iter().map(|r| r.humidity).collect();
    let avg = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;

    assert!((bucket.avg_temperature - avg(&temps)).abs() < 1e-9);
    assert!((bucket.avg_humidity - avg(&hums)).abs() < 1e-9);
    assert_eq!(bucket.min_temperature, temps[0]);
    assert_eq!(bucket.max_temperature, temps[24]);
    assert_eq!(bucket.min_humidity, hums[0]);
    assert_eq!(bucket.max_humidity, hums[24]);
}

#[tokio::test]
async fn test_readings_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");
    let config = StoreConfig::from_secret("reopen").retry(RetryPolicy::none());

    {
        let cache = SensorCache::open(&path, config.clone()).unwrap();
        assert!(cache.ingest(&Reading::new(21.0, 45.0, 1000)).await);
    }

    let cache = SensorCache::open(&path, config).unwrap();
    let all = cache.query_all().await;
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].temperature, 21.0);
}

#[tokio::test]
async fn test_wrong_key_yields_empty_results_not_errors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.db");

    {
        let cache = SensorCache::open(
            &path,
            StoreConfig::from_secret("right-key").retry(RetryPolicy::none()),
        )
        .unwrap();
        assert!(cache.ingest(&Reading::new(21.0, 45.0, 1000)).await);
    }

    // Under the wrong key every record fails to decrypt and is dropped; the
    // read itself still succeeds.
    let cache = SensorCache::open(
        &path,
        StoreConfig::from_secret("wrong-key").retry(RetryPolicy::none()),
    )
    .unwrap();
    assert!(cache.query_all().await.is_empty());
}

#[tokio::test]
async fn test_purge_then_backup_retains_only_backup_copy() {
    let cache = test_cache("purge-backup");

    // An old reading, backed up before it ages out.
    let old_ts = 1_000_000; // 1970, far past any horizon
    assert!(cache.ingest(&Reading::new(18.0, 60.0, old_ts)).await);
    cache.store().create_backup().await.unwrap();

    assert!(cache.purge(30).await);

    assert!(cache.query_all().await.is_empty());
    assert_eq!(cache.store().count_backups().await.unwrap(), 1);
}

#[tokio::test]
async fn test_parallel_caches_with_distinct_keys() {
    let a = test_cache("key-a");
    let b = test_cache("key-b");

    assert!(a.ingest(&Reading::new(20.0, 40.0, 1000)).await);
    assert!(b.ingest(&Reading::new(30.0, 50.0, 1000)).await);

    assert_eq!(a.query_all().await[0].temperature, 20.0);
    assert_eq!(b.query_all().await[0].temperature, 30.0);
}
