//! Database initialization
//!
//! Opens the SQLite pool named by the configured connection string and makes
//! sure the two fact tables exist. Safe to run on every startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Tables owned by the fact store, in creation order
pub const FACT_TABLES: [&str; 2] = ["leads", "conversions"];

/// Open a connection pool for `database_url` and initialize the schema
///
/// Accepts any sqlx SQLite URL (`sqlite://metrics.db`, `sqlite:data/m.db?mode=rwc`).
/// The database file is created when missing.
pub async fn init_database(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    info!("Opened database: {}", database_url);

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create the `leads` and `conversions` tables if absent
///
/// Idempotent: existing tables and their rows are left untouched.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    let existing = count_fact_tables(pool).await?;

    create_leads_table(pool).await?;
    create_conversions_table(pool).await?;

    if existing < FACT_TABLES.len() as i64 {
        info!("Created fact tables ({} already present)", existing);
    } else {
        info!("Fact tables already present");
    }

    Ok(())
}

/// Number of fact tables currently present in the schema
pub async fn count_fact_tables(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('leads', 'conversions')",
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}

async fn create_leads_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date DATE NOT NULL,
            source TEXT NOT NULL,
            lead_count INTEGER NOT NULL,
            cost REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_conversions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS conversions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            date DATE NOT NULL,
            source TEXT NOT NULL,
            conversions INTEGER NOT NULL,
            revenue REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
