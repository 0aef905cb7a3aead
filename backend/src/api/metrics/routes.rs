//! Defines the HTTP routes for the dashboard metrics.
//!
//! Both endpoints are restricted to admin and staff roles; the JWT layer
//! runs first and attaches the user the role gate inspects.

use super::handlers::{get_kpis, get_timeseries};
use crate::auth::middleware::{jwt_auth, require_roles};
use crate::database::models::Role;
use axum::{Router, extract::Request, middleware, middleware::Next, routing::get};

pub fn metrics_router() -> Router {
    Router::new()
        .route("/timeseries", get(get_timeseries))
        .route("/kpis", get(get_kpis))
        .layer(middleware::from_fn(|request: Request, next: Next| {
            require_roles(&[Role::Admin, Role::Staff], request, next)
        }))
        .layer(middleware::from_fn(jwt_auth))
}
