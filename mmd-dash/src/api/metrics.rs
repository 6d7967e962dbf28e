//! JSON mirror of the dashboard
//!
//! Read failures are not handled specially: they surface as a 500.

use axum::{extract::State, Json};

use crate::dashboard::{load_dashboard, DashboardView};
use crate::metrics::{load_metrics, MetricsSummary};
use crate::{ApiResult, AppState};

/// GET /api/metrics
///
/// Summary KPIs only.
pub async fn get_metrics(State(state): State<AppState>) -> ApiResult<Json<MetricsSummary>> {
    let metrics = load_metrics(&state.db, &state.assumptions).await?;
    Ok(Json(metrics))
}

/// GET /api/dashboard
///
/// Metrics, chart specs and source rows, as rendered on the page.
pub async fn get_dashboard(State(state): State<AppState>) -> ApiResult<Json<DashboardView>> {
    let view = load_dashboard(&state.db, &state.assumptions).await?;
    Ok(Json(view))
}
