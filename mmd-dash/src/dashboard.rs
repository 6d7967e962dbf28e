//! Dashboard view model and Plotly chart specs
//!
//! Chart specs are Plotly figure documents (`{"data": [...], "layout": {...}}`)
//! rendered in the browser; their schema belongs to Plotly.

use chrono::NaiveDate;
use mmd_common::db::{DailyConversions, DailyLeads, SourcePerformance};
use mmd_common::{KpiAssumptions, Result};
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::db;
use crate::metrics::{load_metrics, MetricsSummary};

const ACCENT: &str = "#4a9eff";
const SUCCESS: &str = "#10b981";
const TEXT: &str = "#e0e0e0";

/// Everything the dashboard page and `/api/dashboard` render
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub metrics: MetricsSummary,
    /// `None` when either date aggregate is empty
    pub funnel_chart: Option<Value>,
    /// `None` when there are no conversions
    pub revenue_chart: Option<Value>,
    pub source_performance: Vec<SourcePerformance>,
}

/// Assemble the view from already-computed aggregates
pub fn build_dashboard_view(
    metrics: MetricsSummary,
    leads_by_date: &[DailyLeads],
    conversions_by_date: &[DailyConversions],
    source_performance: Vec<SourcePerformance>,
) -> DashboardView {
    DashboardView {
        metrics,
        funnel_chart: funnel_chart(&metrics, leads_by_date, conversions_by_date),
        revenue_chart: revenue_growth_chart(conversions_by_date),
        source_performance,
    }
}

/// Read the store and build the full view
///
/// Each aggregate is its own query; writes from other requests may land
/// between them.
pub async fn load_dashboard(pool: &SqlitePool, assumptions: &KpiAssumptions) -> Result<DashboardView> {
    let metrics = load_metrics(pool, assumptions).await?;
    let leads_by_date = db::leads_by_date(pool).await?;
    let conversions_by_date = db::conversions_by_date(pool).await?;
    let source_performance = db::source_performance(pool).await?;

    Ok(build_dashboard_view(
        metrics,
        &leads_by_date,
        &conversions_by_date,
        source_performance,
    ))
}

/// Leads → Conversions funnel
pub fn funnel_chart(
    metrics: &MetricsSummary,
    leads_by_date: &[DailyLeads],
    conversions_by_date: &[DailyConversions],
) -> Option<Value> {
    if leads_by_date.is_empty() || conversions_by_date.is_empty() {
        return None;
    }

    Some(json!({
        "data": [{
            "type": "funnel",
            "y": ["Leads", "Conversions"],
            "x": [metrics.total_leads, metrics.total_conversions],
            "textinfo": "value+percent initial",
            "marker": { "color": [ACCENT, SUCCESS] },
        }],
        "layout": chart_layout("Conversion Funnel"),
    }))
}

/// Running total of revenue, ascending by date
pub fn cumulative_revenue(conversions_by_date: &[DailyConversions]) -> Vec<(NaiveDate, f64)> {
    conversions_by_date
        .iter()
        .scan(0.0, |running, day| {
            *running += day.revenue;
            Some((day.date, *running))
        })
        .collect()
}

/// Cumulative revenue line chart
pub fn revenue_growth_chart(conversions_by_date: &[DailyConversions]) -> Option<Value> {
    if conversions_by_date.is_empty() {
        return None;
    }

    let (dates, totals): (Vec<String>, Vec<f64>) = cumulative_revenue(conversions_by_date)
        .into_iter()
        .map(|(date, total)| (date.format("%Y-%m-%d").to_string(), total))
        .unzip();

    let mut layout = chart_layout("Revenue Growth");
    layout["xaxis"] = json!({ "title": "Date", "type": "date", "color": TEXT });
    layout["yaxis"] = json!({ "title": "Cumulative Revenue ($)", "color": TEXT });

    Some(json!({
        "data": [{
            "type": "scatter",
            "mode": "lines+markers",
            "name": "Cumulative Revenue",
            "x": dates,
            "y": totals,
            "line": { "color": SUCCESS, "width": 3 },
        }],
        "layout": layout,
    }))
}

fn chart_layout(title: &str) -> Value {
    json!({
        "title": { "text": title },
        "paper_bgcolor": "#2a2a2a",
        "plot_bgcolor": "#2a2a2a",
        "font": { "color": TEXT },
        "margin": { "l": 60, "r": 20, "t": 50, "b": 50 },
    })
}
