//! HTTP API handlers for mmd-dash

pub mod facts;
pub mod health;
pub mod metrics;
pub mod ui;

pub use facts::{add_data, MAX_AMOUNT, MAX_COUNT};
pub use health::health_routes;
pub use metrics::{get_dashboard, get_metrics};
pub use ui::{dashboard_page, not_found, serve_dashboard_css, serve_dashboard_js};
