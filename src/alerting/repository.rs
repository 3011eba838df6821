//! Alert persistence over the `alerts` table

use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

use super::types::{AlertEvent, AlertSeverity, StoredAlert};
use crate::error::Result;

const ALERT_COLUMNS: &str =
    "id, timestamp, alert_type, severity, line_crossing, object_type, message, acknowledged";

/// Alert storage and retrieval
#[derive(Clone)]
pub struct AlertRepository {
    pool: SqlitePool,
}

impl AlertRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist one detector event. Returns the alert row id.
    pub async fn insert(&self, event: &AlertEvent, severity: AlertSeverity) -> Result<i64> {
        let message = format!(
            "Exit count on {} increased by {}",
            event.lane.as_str().to_uppercase(),
            event.increment
        );

        let result = sqlx::query(
            r#"
            INSERT INTO alerts (timestamp, alert_type, severity, line_crossing, message)
            VALUES (?, 'wrong_way', ?, ?, ?)
            "#,
        )
        .bind(&event.timestamp)
        .bind(severity.as_str())
        .bind(event.lane.as_str())
        .bind(&message)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent alerts, newest first.
    pub async fn recent(&self, limit: u32, unacknowledged_only: bool) -> Result<Vec<StoredAlert>> {
        let query = if unacknowledged_only {
            format!(
                "SELECT {ALERT_COLUMNS} FROM alerts WHERE acknowledged = 0 \
                 ORDER BY id DESC LIMIT ?"
            )
        } else {
            format!("SELECT {ALERT_COLUMNS} FROM alerts ORDER BY id DESC LIMIT ?")
        };

        let rows = sqlx::query_as::<_, StoredAlert>(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Mark one alert as acknowledged. Returns false for an unknown id.
    pub async fn acknowledge(&self, alert_id: i64) -> Result<bool> {
        let result = sqlx::query("UPDATE alerts SET acknowledged = 1 WHERE id = ?")
            .bind(alert_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Alert counts per severity within the trailing window.
    pub async fn count_by_severity(&self, hours: u32) -> Result<HashMap<String, i64>> {
        let rows = sqlx::query(
            r#"
            SELECT severity, COUNT(*) FROM alerts
            WHERE timestamp >= datetime('now', '-' || ? || ' hours')
            GROUP BY severity
            "#,
        )
        .bind(hours)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get::<String, _>(0), row.get::<i64, _>(1)))
            .collect())
    }

    /// Delete alerts older than `days` days. Returns rows removed.
    pub async fn clear_old(&self, days: u32) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM alerts WHERE timestamp < datetime('now', '-' || ? || ' days')")
                .bind(days)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
