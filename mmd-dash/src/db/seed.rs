//! Sample data for a fresh database
//!
//! Only runs when both fact tables are empty, so restarts never duplicate rows.

use super::facts;
use chrono::NaiveDate;
use mmd_common::db::{NewConversion, NewLead};
use mmd_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;

/// (day of September 2024, source, lead_count, cost)
const SAMPLE_LEADS: &[(u32, &str, i64, f64)] = &[
    (1, "Google Ads", 150, 750.0),
    (1, "Facebook", 120, 480.0),
    (1, "Organic", 80, 0.0),
    (2, "Google Ads", 165, 810.0),
    (2, "Email", 60, 45.0),
    (2, "LinkedIn", 40, 620.0),
    (3, "Facebook", 135, 525.0),
    (3, "Organic", 95, 0.0),
    (4, "Google Ads", 170, 845.0),
    (4, "Email", 70, 50.0),
    (5, "Facebook", 140, 560.0),
    (5, "LinkedIn", 35, 590.0),
    (6, "Google Ads", 180, 900.0),
    (6, "Organic", 110, 0.0),
    (7, "Email", 75, 55.0),
];

/// (day of September 2024, source, conversions, revenue)
///
/// LinkedIn has no conversions, which keeps the outer-join case visible.
const SAMPLE_CONVERSIONS: &[(u32, &str, i64, f64)] = &[
    (1, "Google Ads", 15, 1500.0),
    (1, "Facebook", 9, 810.0),
    (1, "Organic", 8, 960.0),
    (2, "Google Ads", 17, 1700.0),
    (2, "Email", 6, 540.0),
    (3, "Facebook", 11, 990.0),
    (3, "Organic", 10, 1200.0),
    (4, "Google Ads", 18, 1850.0),
    (4, "Email", 7, 630.0),
    (5, "Facebook", 12, 1080.0),
    (6, "Google Ads", 19, 1950.0),
    (6, "Organic", 12, 1440.0),
    (7, "Email", 8, 720.0),
];

fn sample_date(day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(2024, 9, day)
        .ok_or_else(|| Error::Internal(format!("invalid sample date: 2024-09-{:02}", day)))
}

/// Sample lead rows, in insertion order
pub fn sample_leads() -> Result<Vec<NewLead>> {
    SAMPLE_LEADS
        .iter()
        .map(|&(day, source, lead_count, cost)| {
            Ok(NewLead {
                date: sample_date(day)?,
                source: source.to_string(),
                lead_count,
                cost,
            })
        })
        .collect()
}

/// Sample conversion rows, in insertion order
pub fn sample_conversions() -> Result<Vec<NewConversion>> {
    SAMPLE_CONVERSIONS
        .iter()
        .map(|&(day, source, conversions, revenue)| {
            Ok(NewConversion {
                date: sample_date(day)?,
                source: source.to_string(),
                conversions,
                revenue,
            })
        })
        .collect()
}

/// Insert the sample rows if the store holds no data yet
///
/// Returns the number of rows inserted (0 when data already exists). All
/// sample rows go in one transaction, so a failure leaves the tables empty.
pub async fn seed_if_empty(pool: &SqlitePool) -> Result<usize> {
    if !facts::is_empty(pool).await? {
        info!("Fact tables already contain data, skipping sample seed");
        return Ok(0);
    }

    let leads = sample_leads()?;
    let conversions = sample_conversions()?;

    let mut tx = pool.begin().await?;
    for lead in &leads {
        facts::insert_lead_on(&mut *tx, lead).await?;
    }
    for conversion in &conversions {
        facts::insert_conversion_on(&mut *tx, conversion).await?;
    }
    tx.commit().await?;

    let inserted = leads.len() + conversions.len();
    info!(
        "Seeded sample data: {} lead rows, {} conversion rows",
        leads.len(),
        conversions.len()
    );

    Ok(inserted)
}
