//! Fact submission endpoint
//!
//! POST /add_data accepts an urlencoded form. Everything is validated before
//! the store is touched; on success the browser is redirected to the dashboard.

use axum::{
    extract::{rejection::FormRejection, State},
    http::header,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use chrono::NaiveDate;
use mmd_common::db::{FactKind, NewConversion, NewLead};
use mmd_common::{Error, Result};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::{db, flash, ApiError, ApiResult, AppState};

/// Largest accepted `lead_count` / `conversions` magnitude
///
/// Keeps every total the store can accumulate far inside `i64` and exactly
/// representable in the `f64` the SQL aggregates pass through.
pub const MAX_COUNT: i64 = 1_000_000_000;

/// Largest accepted `cost` / `revenue` magnitude
pub const MAX_AMOUNT: f64 = 1.0e12;

/// Raw form fields
///
/// Everything is optional text so missing and malformed values are reported
/// with our own messages instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct AddFactForm {
    pub data_type: Option<String>,
    pub date: Option<String>,
    pub source: Option<String>,
    pub lead_count: Option<String>,
    pub cost: Option<String>,
    pub conversions: Option<String>,
    pub revenue: Option<String>,
}

/// A validated submission, ready for the store
#[derive(Debug, Clone, PartialEq)]
pub enum NewFact {
    Lead(NewLead),
    Conversion(NewConversion),
}

impl NewFact {
    pub fn kind(&self) -> FactKind {
        match self {
            NewFact::Lead(_) => FactKind::Leads,
            NewFact::Conversion(_) => FactKind::Conversions,
        }
    }
}

impl AddFactForm {
    /// Validate the form into a typed row
    ///
    /// Sign is not checked: zero and negative values are stored as given.
    /// Magnitudes above [`MAX_COUNT`] / [`MAX_AMOUNT`] are rejected.
    pub fn parse(&self) -> Result<NewFact> {
        let kind: FactKind = required(&self.data_type, "data_type")?.parse()?;
        let date = parse_date(required(&self.date, "date")?)?;
        let source = required(&self.source, "source")?.to_string();

        match kind {
            FactKind::Leads => Ok(NewFact::Lead(NewLead {
                date,
                source,
                lead_count: parse_count(required(&self.lead_count, "lead_count")?, "lead_count")?,
                cost: parse_amount(required(&self.cost, "cost")?, "cost")?,
            })),
            FactKind::Conversions => Ok(NewFact::Conversion(NewConversion {
                date,
                source,
                conversions: parse_count(
                    required(&self.conversions, "conversions")?,
                    "conversions",
                )?,
                revenue: parse_amount(required(&self.revenue, "revenue")?, "revenue")?,
            })),
        }
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::InvalidInput(format!("missing required field: {}", field)))
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        Error::InvalidInput(format!("date must be YYYY-MM-DD, got {:?} ({})", raw, e))
    })
}

fn parse_count(raw: &str, field: &str) -> Result<i64> {
    let value = raw.parse::<i64>().map_err(|e| {
        Error::InvalidInput(format!("{} must be a whole number, got {:?} ({})", field, raw, e))
    })?;

    if !(-MAX_COUNT..=MAX_COUNT).contains(&value) {
        return Err(Error::InvalidInput(format!(
            "{} must be between -{} and {}, got {}",
            field, MAX_COUNT, MAX_COUNT, value
        )));
    }

    Ok(value)
}

fn parse_amount(raw: &str, field: &str) -> Result<f64> {
    let value = raw.parse::<f64>().map_err(|e| {
        Error::InvalidInput(format!("{} must be a number, got {:?} ({})", field, raw, e))
    })?;

    if !value.is_finite() {
        return Err(Error::InvalidInput(format!(
            "{} must be a finite number, got {:?}",
            field, raw
        )));
    }

    if value.abs() > MAX_AMOUNT {
        return Err(Error::InvalidInput(format!(
            "{} must be between -{:.0} and {:.0}, got {}",
            field, MAX_AMOUNT, MAX_AMOUNT, raw
        )));
    }

    Ok(value)
}

/// POST /add_data
///
/// **Success:** `303 See Other` to `/` with a signed flash cookie.
/// **Errors:** `400 Bad Request` with `{"error": {"code", "message"}}` for
/// validation and store failures. Nothing is persisted on error.
pub async fn add_data(
    State(state): State<AppState>,
    form: std::result::Result<Form<AddFactForm>, FormRejection>,
) -> ApiResult<Response> {
    let Form(form) = form.map_err(|rejection| {
        warn!("Rejected fact submission: {}", rejection.body_text());
        ApiError::BadRequest(rejection.body_text())
    })?;

    let fact = form.parse().map_err(|e| {
        warn!("Rejected fact submission: {}", e);
        ApiError::BadRequest(e.to_string())
    })?;

    let kind = fact.kind();
    let stored = match &fact {
        NewFact::Lead(lead) => db::insert_lead(&state.db, lead).await,
        NewFact::Conversion(conversion) => db::insert_conversion(&state.db, conversion).await,
    };

    let id = stored.map_err(|e| {
        error!("Failed to store {} row: {}", kind, e);
        ApiError::BadRequest(e.to_string())
    })?;

    info!("Stored {} row id={}", kind, id);

    Ok((
        [(header::SET_COOKIE, flash::set_cookie(&state.secret_key, kind))],
        Redirect::to("/"),
    )
        .into_response())
}
