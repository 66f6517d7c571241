//! Hourly roll-up aggregation.
//!
//! Buckets are recomputed in full on every pass and upserted by bucket
//! start. Buckets whose source records have since been deleted are left in
//! place until a pass recomputes them; aggregates are derived data and can
//! always be rebuilt from the record store.

use std::collections::BTreeMap;

use rusqlite::params;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{AggregateBucket, Reading};
use crate::store::Store;

impl Store {
    /// Recompute min/max/average per time bucket over all current records.
    ///
    /// Buckets are `bucket_width_ms` wide and keyed by their start time.
    /// A store with zero records produces zero buckets. Returns the number
    /// of buckets written.
    pub async fn aggregate(&self) -> Result<usize> {
        let readings = self.get_all().await?;
        let buckets = roll_up(&readings, self.config().bucket_width_ms);

        if buckets.is_empty() {
            debug!("Aggregation: no records, nothing to do");
            return Ok(0);
        }

        let written = buckets.len();
        let mut conn = self.conn().lock().await;
        let tx = conn.transaction()?;
        for bucket in &buckets {
            tx.execute(
                "INSERT INTO aggregates (bucket_start, avg_temperature, avg_humidity,
                     min_temperature, max_temperature, min_humidity, max_humidity, sample_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(bucket_start) DO UPDATE SET
                     avg_temperature = excluded.avg_temperature,
                     avg_humidity = excluded.avg_humidity,
                     min_temperature = excluded.min_temperature,
                     max_temperature = excluded.max_temperature,
                     min_humidity = excluded.min_humidity,
                     max_humidity = excluded.max_humidity,
                     sample_count = excluded.sample_count",
                params![
                    bucket.bucket_start,
                    bucket.avg_temperature,
                    bucket.avg_humidity,
                    bucket.min_temperature,
                    bucket.max_temperature,
                    bucket.min_humidity,
                    bucket.max_humidity,
                    bucket.sample_count,
                ],
            )?;
        }
        tx.commit()?;

        info!("Aggregation: wrote {} buckets", written);
        Ok(written)
    }

    /// Return all aggregate buckets, oldest first.
    pub async fn get_aggregates(&self) -> Result<Vec<AggregateBucket>> {
        let conn = self.conn().lock().await;
        let mut stmt = conn.prepare(
            "SELECT bucket_start, avg_temperature, avg_humidity, min_temperature,
                    max_temperature, min_humidity, max_humidity, sample_count
             FROM aggregates ORDER BY bucket_start ASC",
        )?;
        let buckets = stmt
            .query_map([], |row| {
                Ok(AggregateBucket {
                    bucket_start: row.get(0)?,
                    avg_temperature: row.get(1)?,
                    avg_humidity: row.get(2)?,
                    min_temperature: row.get(3)?,
                    max_temperature: row.get(4)?,
                    min_humidity: row.get(5)?,
                    max_humidity: row.get(6)?,
                    sample_count: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(buckets)
    }
}

/// Partition readings by `floor(timestamp / bucket_width)` and fold each
/// partition into one bucket. Sum/count/min/max are order-independent, so
/// the result is deterministic regardless of read order.
fn roll_up(readings: &[Reading], bucket_width_ms: i64) -> Vec<AggregateBucket> {
    let mut groups: BTreeMap<i64, Vec<&Reading>> = BTreeMap::new();
    for reading in readings {
        let bucket = reading.timestamp.div_euclid(bucket_width_ms);
        groups.entry(bucket).or_default().push(reading);
    }

    groups
        .into_iter()
        .map(|(bucket, members)| {
            let count = members.len() as f64;
            let mut sum_t = 0.0;
            let mut sum_h = 0.0;
            let mut min_t = f64::INFINITY;
            let mut max_t = f64::NEG_INFINITY;
            let mut min_h = f64::INFINITY;
            let mut max_h = f64::NEG_INFINITY;

            for r in &members {
                sum_t += r.temperature;
                sum_h += r.humidity;
                min_t = min_t.min(r.temperature);
                max_t = max_t.max(r.temperature);
                min_h = min_h.min(r.humidity);
                max_h = max_h.max(r.humidity);
            }

            AggregateBucket {
                bucket_start: bucket * bucket_width_ms,
                avg_temperature: sum_t / count,
                avg_humidity: sum_h / count,
                min_temperature: min_t,
                max_temperature: max_t,
                min_humidity: min_h,
                max_humidity: max_h,
                sample_count: members.len() as u32,
            }
        })
        .collect()
}
