//! mmd-dash library - Marketing metrics dashboard
//!
//! Records lead and conversion facts, aggregates them into marketing KPIs,
//! and serves them as an HTML dashboard plus a JSON API.

use axum::Router;
use mmd_common::KpiAssumptions;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod flash;
pub mod metrics;

pub use crate::error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Placeholder business constants used by the metrics engine
    pub assumptions: KpiAssumptions,
    /// Key for signing flash cookies
    pub secret_key: String,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, assumptions: KpiAssumptions, secret_key: impl Into<String>) -> Self {
        Self {
            db,
            assumptions,
            secret_key: secret_key.into(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/", get(api::dashboard_page))
        .route("/add_data", post(api::add_data))
        .route("/api/metrics", get(api::get_metrics))
        .route("/api/dashboard", get(api::get_dashboard))
        .route("/static/dashboard.css", get(api::serve_dashboard_css))
        .route("/static/dashboard.js", get(api::serve_dashboard_js))
        .merge(api::health_routes())
        .fallback(api::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
