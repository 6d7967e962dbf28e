//! Fact store: append and aggregate lead / conversion rows
//!
//! Rows are never updated or deleted. Multiple rows for the same
//! `(date, source)` are legal and always summed.
//!
//! Aggregates use `TOTAL()`, which accumulates in floating point and never
//! raises SQLite's integer-overflow error. Casting the result back to
//! `INTEGER` saturates at the `i64` bounds.

use mmd_common::db::{
    ConversionRecord, DailyConversions, DailyLeads, LeadRecord, NewConversion, NewLead,
    SourcePerformance,
};
use mmd_common::Result;
use sqlx::{SqliteConnection, SqlitePool};

/// Append one lead row, returning its generated id
///
/// Runs in its own transaction: either the row commits or nothing is written.
pub async fn insert_lead(pool: &SqlitePool, lead: &NewLead) -> Result<i64> {
    let mut tx = pool.begin().await?;
    let id = insert_lead_on(&mut *tx, lead).await?;
    tx.commit().await?;

    Ok(id)
}

/// Append one conversion row, returning its generated id
pub async fn insert_conversion(pool: &SqlitePool, conversion: &NewConversion) -> Result<i64> {
    let mut tx = pool.begin().await?;
    let id = insert_conversion_on(&mut *tx, conversion).await?;
    tx.commit().await?;

    Ok(id)
}

/// Append one lead row on an open connection or transaction
pub async fn insert_lead_on(conn: &mut SqliteConnection, lead: &NewLead) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO leads (date, source, lead_count, cost) VALUES (?, ?, ?, ?)",
    )
    .bind(lead.date)
    .bind(&lead.source)
    .bind(lead.lead_count)
    .bind(lead.cost)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn insert_conversion_on(
    conn: &mut SqliteConnection,
    conversion: &NewConversion,
) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO conversions (date, source, conversions, revenue) VALUES (?, ?, ?, ?)",
    )
    .bind(conversion.date)
    .bind(&conversion.source)
    .bind(conversion.conversions)
    .bind(conversion.revenue)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Every lead row in storage order
pub async fn all_leads(pool: &SqlitePool) -> Result<Vec<LeadRecord>> {
    let rows = sqlx::query_as::<_, LeadRecord>(
        "SELECT id, date, source, lead_count, cost FROM leads ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Every conversion row in storage order
pub async fn all_conversions(pool: &SqlitePool) -> Result<Vec<ConversionRecord>> {
    let rows = sqlx::query_as::<_, ConversionRecord>(
        "SELECT id, date, source, conversions, revenue FROM conversions ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Lead count and cost summed per date, ascending by date
pub async fn leads_by_date(pool: &SqlitePool) -> Result<Vec<DailyLeads>> {
    let rows = sqlx::query_as::<_, DailyLeads>(
        r#"
        SELECT date,
               CAST(TOTAL(lead_count) AS INTEGER) AS lead_count,
               TOTAL(cost) AS cost
        FROM leads
        GROUP BY date
        ORDER BY date ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Conversions and revenue summed per date, ascending by date
pub async fn conversions_by_date(pool: &SqlitePool) -> Result<Vec<DailyConversions>> {
    let rows = sqlx::query_as::<_, DailyConversions>(
        r#"
        SELECT date,
               CAST(TOTAL(conversions) AS INTEGER) AS conversions,
               TOTAL(revenue) AS revenue
        FROM conversions
        GROUP BY date
        ORDER BY date ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Per-source totals for every source that has lead rows
///
/// Both tables are aggregated per source before the outer join, so a source
/// with several rows on either side is counted once. Sources without
/// conversions report 0 conversions and 0.0 revenue. Ordered by revenue
/// descending, then source name.
pub async fn source_performance(pool: &SqlitePool) -> Result<Vec<SourcePerformance>> {
    let rows = sqlx::query_as::<_, SourcePerformance>(
        r#"
        SELECT l.source AS source,
               l.lead_count AS lead_count,
               l.cost AS cost,
               CAST(COALESCE(c.conversions, 0) AS INTEGER) AS conversions,
               CAST(COALESCE(c.revenue, 0) AS REAL) AS revenue
        FROM (
            SELECT source,
                   CAST(TOTAL(lead_count) AS INTEGER) AS lead_count,
                   TOTAL(cost) AS cost
            FROM leads
            GROUP BY source
        ) AS l
        LEFT OUTER JOIN (
            SELECT source,
                   CAST(TOTAL(conversions) AS INTEGER) AS conversions,
                   TOTAL(revenue) AS revenue
            FROM conversions
            GROUP BY source
        ) AS c ON c.source = l.source
        ORDER BY revenue DESC, l.source ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// True when neither fact table has any rows
pub async fn is_empty(pool: &SqlitePool) -> Result<bool> {
    let total: i64 = sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM leads) + (SELECT COUNT(*) FROM conversions)",
    )
    .fetch_one(pool)
    .await?;

    Ok(total == 0)
}
