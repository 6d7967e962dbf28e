//! KPI calculation over the fact tables
//!
//! Recomputed from the current rows on every call; nothing is cached.

use mmd_common::db::{ConversionRecord, LeadRecord};
use mmd_common::{KpiAssumptions, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db;

/// Summary KPIs served by `/api/metrics` and shown on the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_leads: i64,
    pub total_conversions: i64,
    /// Percent of leads that converted
    pub conversion_rate: f64,
    pub total_revenue: f64,
    /// Customer acquisition cost: total spend per conversion
    pub cac: f64,
    pub ltv: f64,
    pub mrr: f64,
    pub churn_rate: f64,
}

impl MetricsSummary {
    /// Result for a store with no rows at all
    pub fn empty(assumptions: &KpiAssumptions) -> Self {
        Self {
            total_leads: 0,
            total_conversions: 0,
            conversion_rate: 0.0,
            total_revenue: 0.0,
            cac: 0.0,
            ltv: round2(assumptions.ltv),
            mrr: 0.0,
            churn_rate: round2(assumptions.churn_rate),
        }
    }
}

/// Round to two decimal places
///
/// Goes through the exact decimal expansion of `value`, so `2.675` (stored as
/// 2.67499999...) becomes 2.67 rather than 2.68.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Sum counts without overflowing, saturating at the `i64` bounds
fn saturating_total(counts: impl Iterator<Item = i64>) -> i64 {
    let total: i128 = counts.map(i128::from).sum();
    i64::try_from(total).unwrap_or(if total < 0 { i64::MIN } else { i64::MAX })
}

/// Compute the summary KPIs from every lead and conversion row
pub fn calculate_metrics(
    leads: &[LeadRecord],
    conversions: &[ConversionRecord],
    assumptions: &KpiAssumptions,
) -> MetricsSummary {
    if leads.is_empty() && conversions.is_empty() {
        return MetricsSummary::empty(assumptions);
    }

    let total_leads = saturating_total(leads.iter().map(|l| l.lead_count));
    let total_cost: f64 = leads.iter().map(|l| l.cost).sum();
    let total_conversions = saturating_total(conversions.iter().map(|c| c.conversions));
    let total_revenue: f64 = conversions.iter().map(|c| c.revenue).sum();

    let conversion_rate = if total_leads != 0 {
        total_conversions as f64 / total_leads as f64 * 100.0
    } else {
        0.0
    };

    let cac = if total_conversions != 0 {
        total_cost / total_conversions as f64
    } else {
        0.0
    };

    MetricsSummary {
        total_leads,
        total_conversions,
        conversion_rate: round2(conversion_rate),
        total_revenue: round2(total_revenue),
        cac: round2(cac),
        ltv: round2(assumptions.ltv),
        mrr: round2(total_revenue * assumptions.mrr_factor),
        churn_rate: round2(assumptions.churn_rate),
    }
}

/// Read both fact tables and compute the summary
pub async fn load_metrics(pool: &SqlitePool, assumptions: &KpiAssumptions) -> Result<MetricsSummary> {
    let leads = db::all_leads(pool).await?;
    let conversions = db::all_conversions(pool).await?;

    Ok(calculate_metrics(&leads, &conversions, assumptions))
}
