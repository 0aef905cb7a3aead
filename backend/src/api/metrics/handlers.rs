//! Handler functions for the dashboard metrics API endpoints.
//!
//! These functions process requests for aggregated per-day data and KPI
//! snapshots, delegating to the `MetricService` for the queries.

use crate::api::common::{ApiResponse, service_error_to_http};
use crate::api::metrics::models::{KpiResponse, TimeseriesResponse};
use crate::services::metric_service::{DEFAULT_TIMESERIES_DAYS, MetricService};
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;

#[derive(Debug, Deserialize)]
pub struct TimeseriesQuery {
    /// Lookback window in days, defaults to 30
    pub days: Option<i64>,
}

/// Per-day metric sums since the cutoff, as three parallel series
#[axum::debug_handler]
pub async fn get_timeseries(
    Extension(pool): Extension<SqlitePool>,
    Query(query): Query<TimeseriesQuery>,
) -> Result<Json<ApiResponse<TimeseriesResponse>>, (StatusCode, String)> {
    let service = MetricService::new(&pool);
    let days = query.days.unwrap_or(DEFAULT_TIMESERIES_DAYS);

    match service.timeseries(days).await {
        Ok(data) => Ok(Json(ApiResponse::success(
            data,
            "Metrics retrieved successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}

/// All-time and today's sums joined with live user counts
#[axum::debug_handler]
pub async fn get_kpis(
    Extension(pool): Extension<SqlitePool>,
) -> Result<Json<ApiResponse<KpiResponse>>, (StatusCode, String)> {
    let service = MetricService::new(&pool);

    match service.kpis().await {
        Ok(data) => Ok(Json(ApiResponse::success(
            data,
            "KPIs retrieved successfully",
        ))),
        Err(error) => Err(service_error_to_http(error)),
    }
}
