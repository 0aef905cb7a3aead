//! Database repository for per-day aggregate metrics.

use crate::database::models::Metric;
use anyhow::Result;
use chrono::NaiveDate;
use sqlx::SqlitePool;

pub struct MetricRepository<'a> {
    /// Shared SQLite connection pool
    pool: &'a SqlitePool,
}

impl<'a> MetricRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Bumps the user counter for a day, creating the row if absent.
    pub async fn increment_users(&self, date: NaiveDate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO metrics (date, total_users, total_sales, total_conversions)
            VALUES (?, 1, 0, 0)
            ON CONFLICT(date) DO UPDATE SET total_users = total_users + 1
            "#,
        )
        .bind(date)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Per-day rows from the cutoff onwards, ordered by date.
    pub async fn series_since(&self, cutoff: NaiveDate) -> Result<Vec<Metric>> {
        let series =
            sqlx::query_as::<_, Metric>("SELECT * FROM metrics WHERE date >= ? ORDER BY date ASC")
                .bind(cutoff)
                .fetch_all(self.pool)
                .await?;

        Ok(series)
    }

    /// All-time column sums.
    pub async fn totals(&self) -> Result<(i64, i64, i64)> {
        let totals = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                COALESCE(SUM(total_users), 0),
                COALESCE(SUM(total_sales), 0),
                COALESCE(SUM(total_conversions), 0)
            FROM metrics
            "#,
        )
        .fetch_one(self.pool)
        .await?;

        Ok(totals)
    }

    /// The aggregate row for a single day, if it exists.
    pub async fn get_by_date(&self, date: NaiveDate) -> Result<Option<Metric>> {
        let metric = sqlx::query_as::<_, Metric>("SELECT * FROM metrics WHERE date = ?")
            .bind(date)
            .fetch_optional(self.pool)
            .await?;

        Ok(metric)
    }
}
