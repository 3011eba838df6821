//! Telemetry sample repository
//!
//! Column layout follows the original `analytics_data` schema; samples are
//! immutable once stored.

use sqlx::{Row, SqlitePool};

use super::types::{CounterValues, TelemetrySample};
use crate::error::Result;

const SAMPLE_COLUMNS: &str = "id, timestamp, \
     car_total, bicycle_total, person_total, \
     lc1_entry_count, lc1_exit_count, lc2_entry_count, lc2_exit_count, \
     roi_car_cumulative, roi_bicycle_cumulative, roi_person_cumulative";

/// Sample storage and retrieval
#[derive(Clone)]
pub struct TelemetryRepository {
    pool: SqlitePool,
}

impl TelemetryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analytics_data (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                car_total INTEGER,
                bicycle_total INTEGER,
                person_total INTEGER,
                lc1_entry_count INTEGER,
                lc1_exit_count INTEGER,
                lc2_entry_count INTEGER,
                lc2_exit_count INTEGER,
                roi_car_cumulative INTEGER,
                roi_bicycle_cumulative INTEGER,
                roi_person_cumulative INTEGER,
                raw_message TEXT,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS alerts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                alert_type TEXT NOT NULL,
                severity TEXT NOT NULL,
                line_crossing TEXT,
                object_type TEXT,
                message TEXT,
                acknowledged INTEGER DEFAULT 0,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for statement in [
            "CREATE INDEX IF NOT EXISTS idx_timestamp ON analytics_data(timestamp)",
            "CREATE INDEX IF NOT EXISTS idx_created_at ON analytics_data(created_at)",
            "CREATE INDEX IF NOT EXISTS idx_alert_timestamp ON alerts(timestamp)",
            "CREATE INDEX IF NOT EXISTS idx_alert_acknowledged ON alerts(acknowledged)",
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        tracing::info!("Telemetry schema initialized");
        Ok(())
    }

    /// Append one sample, returning its row id.
    pub async fn insert(
        &self,
        timestamp: &str,
        values: &CounterValues,
        raw_message: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO analytics_data (
                timestamp,
                car_total, bicycle_total, person_total,
                lc1_entry_count, lc1_exit_count,
                lc2_entry_count, lc2_exit_count,
                roi_car_cumulative, roi_bicycle_cumulative, roi_person_cumulative,
                raw_message
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(timestamp)
        .bind(values.car_total)
        .bind(values.bicycle_total)
        .bind(values.person_total)
        .bind(values.lc1_entry_count)
        .bind(values.lc1_exit_count)
        .bind(values.lc2_entry_count)
        .bind(values.lc2_exit_count)
        .bind(values.roi_car_cumulative)
        .bind(values.roi_bicycle_cumulative)
        .bind(values.roi_person_cumulative)
        .bind(raw_message)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent `limit` samples, newest first.
    pub async fn latest(&self, limit: u32) -> Result<Vec<TelemetrySample>> {
        let rows = sqlx::query_as::<_, TelemetrySample>(&format!(
            "SELECT {SAMPLE_COLUMNS} FROM analytics_data ORDER BY id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Samples with `start <= timestamp <= end`, ascending by timestamp.
    pub async fn query_range(&self, start: &str, end: &str) -> Result<Vec<TelemetrySample>> {
        let rows = sqlx::query_as::<_, TelemetrySample>(&format!(
            "SELECT {SAMPLE_COLUMNS} FROM analytics_data \
             WHERE timestamp BETWEEN ? AND ? ORDER BY timestamp ASC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Earliest and latest stored timestamps, `None` when the table is empty.
    pub async fn day_extent(&self) -> Result<Option<(String, String)>> {
        let row = sqlx::query("SELECT MIN(timestamp), MAX(timestamp) FROM analytics_data")
            .fetch_one(&self.pool)
            .await?;

        let min: Option<String> = row.get(0);
        let max: Option<String> = row.get(1);

        Ok(min.zip(max))
    }

    /// Total number of stored samples.
    pub async fn total_count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) FROM analytics_data")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get(0))
    }

    /// Delete samples older than `days` days. Returns rows removed.
    pub async fn prune_older_than(&self, days: u32) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM analytics_data \
             WHERE created_at < datetime('now', '-' || ? || ' days')",
        )
        .bind(days)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Reclaim space after pruning.
    pub async fn vacuum(&self) -> Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    // Shared pool would hand each connection its own :memory: database
    sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(lc1_exit: i64) -> CounterValues {
        CounterValues {
            car_total: 10,
            person_total: 3,
            lc1_entry_count: 7,
            lc1_exit_count: lc1_exit,
            roi_car_cumulative: 4,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn insert_and_query_roundtrip() {
        let repo = TelemetryRepository::new(memory_pool().await);
        repo.init_schema().await.unwrap();

        let id1 = repo
            .insert("2026-08-25T10:00:00", &values(5), "{}")
            .await
            .unwrap();
        let id2 = repo
            .insert("2026-08-25T10:00:05", &values(8), "{}")
            .await
            .unwrap();
        assert!(id2 > id1);

        let latest = repo.latest(1).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].lc1_exit_count, 8);

        let range = repo
            .query_range("2026-08-25T00:00:00", "2026-08-25T23:59:59")
            .await
            .unwrap();
        assert_eq!(range.len(), 2);
        assert_eq!(range[0].lc1_exit_count, 5);

        assert_eq!(repo.total_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn day_extent_empty_and_filled() {
        let repo = TelemetryRepository::new(memory_pool().await);
        repo.init_schema().await.unwrap();

        assert!(repo.day_extent().await.unwrap().is_none());

        repo.insert("2026-08-24T23:00:00", &values(1), "{}")
            .await
            .unwrap();
        repo.insert("2026-08-25T01:00:00", &values(2), "{}")
            .await
            .unwrap();

        let (min, max) = repo.day_extent().await.unwrap().unwrap();
        assert_eq!(min, "2026-08-24T23:00:00");
        assert_eq!(max, "2026-08-25T01:00:00");
    }

    #[tokio::test]
    async fn range_is_ascending() {
        let repo = TelemetryRepository::new(memory_pool().await);
        repo.init_schema().await.unwrap();

        // Inserted out of order on purpose
        repo.insert("2026-08-25T12:00:00", &values(2), "{}")
            .await
            .unwrap();
        repo.insert("2026-08-25T11:00:00", &values(1), "{}")
            .await
            .unwrap();

        let range = repo
            .query_range("2026-08-25T00:00:00", "2026-08-25T23:59:59")
            .await
            .unwrap();
        assert_eq!(range[0].timestamp, "2026-08-25T11:00:00");
        assert_eq!(range[1].timestamp, "2026-08-25T12:00:00");
    }
}
