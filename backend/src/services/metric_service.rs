//! Metrics business logic service.
//!
//! Aggregates the per-day metric rows into the shapes the dashboard
//! endpoints return.

use crate::api::metrics::models::{KpiResponse, SeriesPoint, TimeseriesResponse};
use crate::database::models::Metric;
use crate::errors::ServiceResult;
use crate::repositories::metric_repository::MetricRepository;
use crate::repositories::user_repository::UserRepository;
use chrono::{Duration, NaiveTime, Utc};
use sqlx::SqlitePool;

/// Default lookback window for the time-series endpoint, in days.
pub const DEFAULT_TIMESERIES_DAYS: i64 = 30;

/// Largest accepted lookback window; keeps the cutoff arithmetic in range.
pub const MAX_TIMESERIES_DAYS: i64 = 3650;

pub struct MetricService<'a> {
    /// Shared database connection pool
    pool: &'a SqlitePool,
}

impl<'a> MetricService<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Per-day sums since `days` ago, reshaped into three parallel series.
    pub async fn timeseries(&self, days: i64) -> ServiceResult<TimeseriesResponse> {
        let days = days.clamp(1, MAX_TIMESERIES_DAYS);
        let cutoff = Utc::now().date_naive() - Duration::days(days);

        let repo = MetricRepository::new(self.pool);
        let series = repo.series_since(cutoff).await?;

        Ok(reshape(series))
    }

    /// All-time and today's sums joined with live user counts.
    pub async fn kpis(&self) -> ServiceResult<KpiResponse> {
        let metric_repo = MetricRepository::new(self.pool);
        let user_repo = UserRepository::new(self.pool);

        let (total_users, total_sales, total_conversions) = metric_repo.totals().await?;

        let today = Utc::now().date_naive();
        let today_row = metric_repo.get_by_date(today).await?;
        let (users_today, sales_today, conversions_today) = match today_row {
            Some(m) => (m.total_users, m.total_sales, m.total_conversions),
            None => (0, 0, 0),
        };

        let midnight = today.and_time(NaiveTime::MIN).and_utc();
        let registered_users = user_repo.count_users().await?;
        let new_users_today = user_repo.count_users_since(midnight).await?;

        Ok(KpiResponse {
            total_users,
            total_sales,
            total_conversions,
            users_today,
            sales_today,
            conversions_today,
            registered_users,
            new_users_today,
        })
    }
}

/// Splits per-day rows into one point list per metric column.
fn reshape(series: Vec<Metric>) -> TimeseriesResponse {
    let mut users = Vec::with_capacity(series.len());
    let mut sales = Vec::with_capacity(series.len());
    let mut conversions = Vec::with_capacity(series.len());

    for metric in series {
        users.push(SeriesPoint {
            date: metric.date,
            value: metric.total_users,
        });
        sales.push(SeriesPoint {
            date: metric.date,
            value: metric.total_sales,
        });
        conversions.push(SeriesPoint {
            date: metric.date,
            value: metric.total_conversions,
        });
    }

    TimeseriesResponse {
        users,
        sales,
        conversions,
    }
}
