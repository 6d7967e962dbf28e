//! Database models

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One batch of leads acquired from one source on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeadRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub source: String,
    pub lead_count: i64,
    pub cost: f64,
}

/// Conversions and revenue attributed to one source on one date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversionRecord {
    pub id: i64,
    pub date: NaiveDate,
    pub source: String,
    pub conversions: i64,
    pub revenue: f64,
}

/// A lead row before insertion (no id yet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLead {
    pub date: NaiveDate,
    pub source: String,
    pub lead_count: i64,
    pub cost: f64,
}

/// A conversion row before insertion (no id yet)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConversion {
    pub date: NaiveDate,
    pub source: String,
    pub conversions: i64,
    pub revenue: f64,
}

/// Lead totals for a single date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailyLeads {
    pub date: NaiveDate,
    pub lead_count: i64,
    pub cost: f64,
}

/// Conversion totals for a single date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailyConversions {
    pub date: NaiveDate,
    pub conversions: i64,
    pub revenue: f64,
}

/// Per-source totals across both fact tables
///
/// Sources without conversion rows carry `conversions = 0` and `revenue = 0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SourcePerformance {
    pub source: String,
    pub lead_count: i64,
    pub cost: f64,
    pub conversions: i64,
    pub revenue: f64,
}

/// Which fact table a submission targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactKind {
    Leads,
    Conversions,
}

impl FactKind {
    /// Wire name used by forms and cookies (`leads` / `conversions`)
    pub fn as_str(&self) -> &'static str {
        match self {
            FactKind::Leads => "leads",
            FactKind::Conversions => "conversions",
        }
    }
}

impl std::str::FromStr for FactKind {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim() {
            "leads" => Ok(FactKind::Leads),
            "conversions" => Ok(FactKind::Conversions),
            other => Err(crate::Error::InvalidInput(format!(
                "data_type must be 'leads' or 'conversions', got {:?}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for FactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
