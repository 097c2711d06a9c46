//! Dashboard analytics for one user, read from the store.

use chrono::NaiveDate;
use tally_core::analytics::{self, CategoryBreakdown};
use tally_core::{AnalyticsSummary, DashboardStats, Month, Transaction, TrendPoint};

use crate::error::Result;
use crate::store::Store;

fn user_transactions(store: &Store, user_id: &str) -> Result<Vec<Transaction>> {
    store.read(|t| t.transactions_of(user_id))
}

pub fn dashboard(store: &Store, user_id: &str, today: NaiveDate) -> Result<DashboardStats> {
    let txns = user_transactions(store, user_id)?;
    Ok(analytics::dashboard_stats(&txns, today))
}

pub fn category_breakdown(store: &Store, user_id: &str, month: Option<Month>) -> Result<CategoryBreakdown> {
    let txns = user_transactions(store, user_id)?;
    Ok(analytics::category_breakdown(&txns, month))
}

pub fn monthly_trend(store: &Store, user_id: &str, today: NaiveDate, months: usize) -> Result<Vec<TrendPoint>> {
    let txns = user_transactions(store, user_id)?;
    Ok(analytics::monthly_trend(&txns, today, months))
}

pub fn anomalies(store: &Store, user_id: &str) -> Result<Vec<Transaction>> {
    let txns = user_transactions(store, user_id)?;
    Ok(analytics::anomalies(&txns))
}

/// Compute and upsert the summary for `(user, month)`
pub fn save_summary(store: &Store, user_id: &str, month: Month) -> Result<AnalyticsSummary> {
    store.write(|t| {
        let summary = analytics::summarize_month(user_id, &t.transactions_of(user_id), month);
        match t
            .summaries
            .iter_mut()
            .find(|s| s.user_id == user_id && s.month == month)
        {
            Some(existing) => *existing = summary.clone(),
            None => t.summaries.push(summary.clone()),
        }
        Ok(summary)
    })
}
