//! Dashboard page
//!
//! Server-rendered HTML; charts are drawn client-side by Plotly from the
//! specs embedded in the page.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use mmd_common::db::SourcePerformance;
use serde_json::Value;

use crate::dashboard::{load_dashboard, DashboardView};
use crate::metrics::MetricsSummary;
use crate::{flash, ApiError, ApiResult, AppState};

const DASHBOARD_CSS: &str = include_str!("../../ui/dashboard.css");
const DASHBOARD_JS: &str = include_str!("../../ui/dashboard.js");
const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// GET /
///
/// Renders the dashboard. A verified flash cookie adds a notice and is cleared.
pub async fn dashboard_page(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let view = load_dashboard(&state.db, &state.assumptions).await?;

    let cookie = flash::cookie_value(&headers);
    let notice = cookie
        .as_deref()
        .and_then(|value| flash::verify(&state.secret_key, value))
        .map(flash::message);

    let html = Html(render_dashboard_page(&view, notice));

    if cookie.is_some() {
        Ok(([(header::SET_COOKIE, flash::CLEAR_FLASH_COOKIE)], html).into_response())
    } else {
        Ok(html.into_response())
    }
}

/// GET /static/dashboard.css
pub async fn serve_dashboard_css() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css")],
        DASHBOARD_CSS,
    )
        .into_response()
}

/// GET /static/dashboard.js
pub async fn serve_dashboard_js() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/javascript")],
        DASHBOARD_JS,
    )
        .into_response()
}

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

/// Escape text for HTML element content and attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Serialize a chart spec for a `<script type="application/json">` block
///
/// `<`, `>` and `&` only occur inside JSON strings, where `\u00XX` escapes are
/// equivalent, so the block can never be closed early.
pub fn embed_json(spec: &Option<Value>) -> String {
    serde_json::to_string(spec)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

fn money(value: f64) -> String {
    format!("${:.2}", value)
}

fn render_kpi_cards(metrics: &MetricsSummary) -> String {
    let cards = [
        ("Total Leads", metrics.total_leads.to_string()),
        ("Conversions", metrics.total_conversions.to_string()),
        ("Conversion Rate", format!("{:.2}%", metrics.conversion_rate)),
        ("Total Revenue", money(metrics.total_revenue)),
        ("CAC", money(metrics.cac)),
        ("LTV", money(metrics.ltv)),
        ("MRR", money(metrics.mrr)),
        ("Churn Rate", format!("{:.2}%", metrics.churn_rate)),
    ];

    cards
        .iter()
        .map(|(label, value)| {
            format!(
                r#"<div class="kpi-card"><div class="kpi-label">{}</div><div class="kpi-value">{}</div></div>"#,
                label, value
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_source_rows(rows: &[SourcePerformance]) -> String {
    if rows.is_empty() {
        return r#"<tr><td colspan="5" class="empty">No lead data yet.</td></tr>"#.to_string();
    }

    rows.iter()
        .map(|row| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&row.source),
                row.lead_count,
                money(row.cost),
                row.conversions,
                money(row.revenue)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Full dashboard HTML
pub fn render_dashboard_page(view: &DashboardView, notice: Option<&str>) -> String {
    let notice_html = notice
        .map(|text| format!(r#"<div class="notice">{}</div>"#, escape_html(text)))
        .unwrap_or_default();
    let today = chrono::Local::now().date_naive().format("%Y-%m-%d");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Marketing Metrics Dashboard</title>
    <link rel="stylesheet" href="/static/dashboard.css">
    <script src="{plotly}"></script>
</head>
<body>
    <header>
        <h1>Marketing Metrics Dashboard</h1>
        <div class="subtitle">Lead generation, conversions and revenue by source</div>
    </header>
    <main class="container">
        {notice}
        <section class="kpi-grid">
{cards}
        </section>

        <section class="charts">
            <div class="chart" id="funnel-chart" data-spec="funnel-spec" data-empty="Add leads and conversions to see the funnel."></div>
            <div class="chart" id="revenue-chart" data-spec="revenue-spec" data-empty="Add conversions to see revenue growth."></div>
        </section>
        <script type="application/json" id="funnel-spec">{funnel}</script>
        <script type="application/json" id="revenue-spec">{revenue}</script>

        <section>
            <h2>Source Performance</h2>
            <table class="sources">
                <thead>
                    <tr><th>Source</th><th>Leads</th><th>Cost</th><th>Conversions</th><th>Revenue</th></tr>
                </thead>
                <tbody>
{rows}
                </tbody>
            </table>
        </section>

        <section>
            <h2>Add Data</h2>
            <form method="post" action="/add_data" class="add-form">
                <label>Type
                    <select name="data_type" id="data-type">
                        <option value="leads">Leads</option>
                        <option value="conversions">Conversions</option>
                    </select>
                </label>
                <label>Date <input type="date" name="date" value="{today}" required></label>
                <label>Source <input type="text" name="source" placeholder="Google Ads" required></label>
                <fieldset data-kind="leads">
                    <label>Lead count <input type="number" name="lead_count" step="1"></label>
                    <label>Cost <input type="number" name="cost" step="0.01"></label>
                </fieldset>
                <fieldset data-kind="conversions">
                    <label>Conversions <input type="number" name="conversions" step="1"></label>
                    <label>Revenue <input type="number" name="revenue" step="0.01"></label>
                </fieldset>
                <button type="submit" class="button">Add</button>
            </form>
        </section>
    </main>
    <footer>mmd-dash v{version} ({git_hash})</footer>
    <script src="/static/dashboard.js"></script>
</body>
</html>
"#,
        plotly = PLOTLY_CDN,
        notice = notice_html,
        cards = render_kpi_cards(&view.metrics),
        funnel = embed_json(&view.funnel_chart),
        revenue = embed_json(&view.revenue_chart),
        rows = render_source_rows(&view.source_performance),
        today = today,
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
    )
}
