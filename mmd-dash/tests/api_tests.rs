//! Integration tests for mmd-dash HTTP endpoints
//!
//! Tests cover:
//! - GET /api/metrics on empty and populated stores
//! - POST /add_data success, validation failures and store failures
//! - GET / rendering and flash notices
//! - GET /api/dashboard, /health and the 404 fallback

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use mmd_common::db::{init_database, NewConversion, NewLead};
use mmd_common::KpiAssumptions;
use mmd_dash::api::MAX_COUNT;
use mmd_dash::{build_router, db, AppState};
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

const SECRET: &str = "test-secret";

/// Test helper: fresh database with an initialized schema
async fn setup_test_db() -> (TempDir, SqlitePool) {
    let dir = TempDir::new().expect("Should create temp dir");
    let url = format!("sqlite://{}", dir.path().join("api.db").display());
    let pool = init_database(&url).await.expect("Should initialize database");
    (dir, pool)
}

/// Test helper: Create app with default assumptions
fn setup_app(db: SqlitePool) -> Router {
    build_router(AppState::new(db, KpiAssumptions::default(), SECRET))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_form(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/add_data")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(body: Body) -> Vec<u8> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

/// Test helper: Extract JSON body from response
async fn extract_json(body: Body) -> Value {
    serde_json::from_slice(&body_bytes(body).await).expect("Should parse JSON")
}

async fn extract_text(body: Body) -> String {
    String::from_utf8(body_bytes(body).await).expect("Should be UTF-8")
}

fn number(value: &Value) -> f64 {
    value.as_f64().unwrap_or_else(|| panic!("not a number: {}", value))
}

// =============================================================================
// Metrics API
// =============================================================================

#[tokio::test]
async fn test_metrics_empty_store() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);

    let response = app.oneshot(get("/api/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_object().unwrap().len(), 8);
    assert_eq!(number(&body["total_leads"]), 0.0);
    assert_eq!(number(&body["total_conversions"]), 0.0);
    assert_eq!(number(&body["conversion_rate"]), 0.0);
    assert_eq!(number(&body["total_revenue"]), 0.0);
    assert_eq!(number(&body["cac"]), 0.0);
    assert_eq!(number(&body["ltv"]), 1200.0);
    assert_eq!(number(&body["mrr"]), 0.0);
    assert_eq!(number(&body["churn_rate"]), 5.0);
}

#[tokio::test]
async fn test_metrics_after_form_submissions() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);

    let response = app
        .clone()
        .oneshot(post_form(
            "data_type=leads&date=2024-09-01&source=Google+Ads&lead_count=150&cost=750",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app
        .clone()
        .oneshot(post_form(
            "data_type=conversions&date=2024-09-01&source=Google+Ads&conversions=15&revenue=1500",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = app.oneshot(get("/api/metrics")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["total_leads"], 150);
    assert_eq!(body["total_conversions"], 15);
    assert_eq!(number(&body["conversion_rate"]), 10.0);
    assert_eq!(number(&body["total_revenue"]), 1500.0);
    assert_eq!(number(&body["cac"]), 50.0);
    assert_eq!(number(&body["mrr"]), 150.0);
}

#[tokio::test]
async fn test_metrics_use_configured_assumptions() {
    let (_dir, pool) = setup_test_db().await;
    let assumptions = KpiAssumptions {
        ltv: 900.0,
        churn_rate: 2.5,
        mrr_factor: 0.5,
    };
    let app = build_router(AppState::new(pool.clone(), assumptions, SECRET));

    db::insert_conversion(
        &pool,
        &mmd_common::db::NewConversion {
            date: chrono::NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            source: "Email".to_string(),
            conversions: 2,
            revenue: 300.0,
        },
    )
    .await
    .unwrap();

    let response = app.oneshot(get("/api/metrics")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(number(&body["ltv"]), 900.0);
    assert_eq!(number(&body["churn_rate"]), 2.5);
    assert_eq!(number(&body["mrr"]), 150.0);
}

// =============================================================================
// Add fact
// =============================================================================

#[tokio::test]
async fn test_add_data_redirects_with_flash_cookie() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool.clone());

    let response = app
        .oneshot(post_form(
            "data_type=leads&date=2024-09-01&source=Organic&lead_count=80&cost=0",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("mmd_flash=leads."));

    let leads = db::all_leads(&pool).await.unwrap();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].source, "Organic");
}

#[tokio::test]
async fn test_add_data_non_numeric_cost_is_rejected() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool.clone());

    let response = app
        .oneshot(post_form(
            "data_type=leads&date=2024-09-01&source=Google+Ads&lead_count=150&cost=abc",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(body["error"]["message"].as_str().unwrap().contains("cost"));

    assert!(db::all_leads(&pool).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_data_missing_fields_and_bad_type() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool.clone());

    for body in [
        "data_type=conversions&date=2024-09-01&source=Email&conversions=3",
        "data_type=refunds&date=2024-09-01&source=Email&conversions=3&revenue=10",
        "date=2024-09-01&source=Email&lead_count=3&cost=10",
        "data_type=leads&date=yesterday&source=Email&lead_count=3&cost=10",
    ] {
        let response = app.clone().oneshot(post_form(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {}", body);
    }

    assert!(db::is_empty(&pool).await.unwrap());
}

#[tokio::test]
async fn test_add_data_without_form_content_type() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);

    let request = Request::builder()
        .method("POST")
        .uri("/add_data")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_add_data_store_failure_is_client_error() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool.clone());

    sqlx::query("DROP TABLE conversions").execute(&pool).await.unwrap();

    let response = app
        .oneshot(post_form(
            "data_type=conversions&date=2024-09-01&source=Email&conversions=1&revenue=10",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"]["message"].as_str().unwrap().contains("Database error"));
}

#[tokio::test]
async fn test_add_data_huge_count_rejected_and_dashboard_still_answers() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool.clone());

    let response = app
        .clone()
        .oneshot(post_form(&format!(
            "data_type=leads&date=2024-09-01&source=Google+Ads&lead_count={}&cost=1",
            i64::MAX
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"]["message"].as_str().unwrap().contains("lead_count"));

    let response = app
        .clone()
        .oneshot(post_form(
            "data_type=leads&date=2024-09-01&source=Google+Ads&lead_count=1&cost=1",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    for uri in ["/", "/api/metrics", "/api/dashboard"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "uri: {}", uri);
    }

    let response = app.oneshot(get("/api/metrics")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_leads"], 1);
}

#[tokio::test]
async fn test_add_data_largest_accepted_values() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);

    let forms = [
        format!(
            "data_type=leads&date=2024-09-01&source=Google+Ads&lead_count={}&cost=1000000000000",
            MAX_COUNT
        ),
        format!(
            "data_type=leads&date=2024-09-01&source=Google+Ads&lead_count={}&cost=1000000000000",
            MAX_COUNT
        ),
        format!(
            "data_type=conversions&date=2024-09-01&source=Google+Ads&conversions={}&revenue=1000000000000",
            MAX_COUNT
        ),
        format!(
            "data_type=conversions&date=2024-09-02&source=Google+Ads&conversions={}&revenue=1000000000000",
            MAX_COUNT
        ),
    ];
    for form in &forms {
        let response = app.clone().oneshot(post_form(form)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "form: {}", form);
    }

    let response = app.clone().oneshot(get("/api/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_leads"], 2 * MAX_COUNT);
    assert_eq!(body["total_conversions"], 2 * MAX_COUNT);
    assert_eq!(number(&body["conversion_rate"]), 100.0);
    assert_eq!(number(&body["total_revenue"]), 2.0e12);
    assert_eq!(number(&body["cac"]), 1000.0);
    assert_eq!(number(&body["mrr"]), 2.0e11);

    let response = app.clone().oneshot(get("/api/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = extract_json(response.into_body()).await;
    let sources = body["source_performance"].as_array().unwrap();
    assert_eq!(sources[0]["lead_count"], 2 * MAX_COUNT);
    assert_eq!(number(&sources[0]["revenue"]), 2.0e12);

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rows_beyond_form_limits_do_not_break_reads() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool.clone());

    // Rows written by an older build, before submissions were bounded
    let date = chrono::NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
    for _ in 0..2 {
        db::insert_lead(
            &pool,
            &NewLead {
                date,
                source: "Google Ads".to_string(),
                lead_count: i64::MAX,
                cost: 1.0,
            },
        )
        .await
        .unwrap();
        db::insert_conversion(
            &pool,
            &NewConversion {
                date,
                source: "Google Ads".to_string(),
                conversions: i64::MAX,
                revenue: 1.0,
            },
        )
        .await
        .unwrap();
    }

    for uri in ["/", "/api/metrics", "/api/dashboard"] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "uri: {}", uri);
    }

    let response = app.oneshot(get("/api/metrics")).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["total_leads"], i64::MAX);
    assert_eq!(body["total_conversions"], i64::MAX);

    let by_date = db::leads_by_date(&pool).await.unwrap();
    assert_eq!(by_date[0].lead_count, i64::MAX);
    let sources = db::source_performance(&pool).await.unwrap();
    assert_eq!(sources[0].conversions, i64::MAX);
}

// =============================================================================
// Dashboard page and JSON mirror
// =============================================================================

#[tokio::test]
async fn test_dashboard_page_renders_sources() {
    let (_dir, pool) = setup_test_db().await;
    db::seed_if_empty(&pool).await.unwrap();
    let app = setup_app(pool);

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());

    let html = extract_text(response.into_body()).await;
    assert!(html.contains("Marketing Metrics Dashboard"));
    assert!(html.contains("<td>LinkedIn</td>"));
    assert!(html.contains(r#"id="funnel-spec">{"#));
    assert!(html.contains(r#"action="/add_data""#));
}

#[tokio::test]
async fn test_dashboard_shows_verified_flash_once() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);

    let cookie = mmd_dash::flash::sign(SECRET, mmd_common::db::FactKind::Conversions);
    let request = Request::builder()
        .uri("/")
        .header(header::COOKIE, format!("mmd_flash={}", cookie))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let clear = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(clear.contains("Max-Age=0"));
    let html = extract_text(response.into_body()).await;
    assert!(html.contains("Conversion data added successfully."));

    let forged = Request::builder()
        .uri("/")
        .header(header::COOKIE, "mmd_flash=leads.0000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(forged).await.unwrap();
    let html = extract_text(response.into_body()).await;
    assert!(!html.contains("added successfully"));
}

#[tokio::test]
async fn test_dashboard_api_empty_store_omits_charts() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);

    let response = app.oneshot(get("/api/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert!(body["funnel_chart"].is_null());
    assert!(body["revenue_chart"].is_null());
    assert_eq!(body["source_performance"], serde_json::json!([]));
    assert_eq!(number(&body["metrics"]["ltv"]), 1200.0);
}

#[tokio::test]
async fn test_dashboard_api_with_data() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);

    for body in [
        "data_type=leads&date=2024-09-02&source=Email&lead_count=60&cost=45",
        "data_type=leads&date=2024-09-01&source=Google+Ads&lead_count=150&cost=750",
        "data_type=conversions&date=2024-09-02&source=Email&conversions=6&revenue=540",
        "data_type=conversions&date=2024-09-01&source=Google+Ads&conversions=15&revenue=1500",
    ] {
        let response = app.clone().oneshot(post_form(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    let response = app.oneshot(get("/api/dashboard")).await.unwrap();
    let body = extract_json(response.into_body()).await;

    let funnel = &body["funnel_chart"]["data"][0];
    assert_eq!(funnel["x"], serde_json::json!([210, 21]));

    let revenue = &body["revenue_chart"]["data"][0];
    assert_eq!(revenue["x"], serde_json::json!(["2024-09-01", "2024-09-02"]));
    assert_eq!(number(&revenue["y"][1]), 2040.0);

    let sources = body["source_performance"].as_array().unwrap();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0]["source"], "Google Ads");
    assert_eq!(sources[1]["source"], "Email");
}

// =============================================================================
// Health, static assets and fallback
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);

    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "mmd-dash");
    assert!(body["version"].is_string());
    assert!(!body["git_hash"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_static_assets_served() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);

    let response = app.clone().oneshot(get("/static/dashboard.js")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/javascript");

    let response = app.oneshot(get("/static/dashboard.css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let (_dir, pool) = setup_test_db().await;
    let app = setup_app(pool);

    let response = app.oneshot(get("/nowhere")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}
