//! Response shapes for the dashboard metrics endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One point in a per-day series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: i64,
}

/// Per-day metric columns reshaped into three parallel series.
#[derive(Debug, Serialize, Deserialize)]
pub struct TimeseriesResponse {
    pub users: Vec<SeriesPoint>,
    pub sales: Vec<SeriesPoint>,
    pub conversions: Vec<SeriesPoint>,
}

/// Dashboard snapshot: all-time sums, today's sums, and live user counts.
#[derive(Debug, Serialize, Deserialize)]
pub struct KpiResponse {
    pub total_users: i64,
    pub total_sales: i64,
    pub total_conversions: i64,
    pub users_today: i64,
    pub sales_today: i64,
    pub conversions_today: i64,
    /// Live row count from the users table.
    pub registered_users: i64,
    /// Users created since midnight UTC.
    pub new_users_today: i64,
}
