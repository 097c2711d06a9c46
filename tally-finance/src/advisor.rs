//! Insight generation and history.

use chrono::{NaiveDate, Utc};
use tally_core::analytics::{self, DEFAULT_TREND_MONTHS};
use tally_core::{GeneratedInsight, StoredInsight, generate_insights};

use crate::error::Result;
use crate::store::Store;

/// Default number of stored insights returned by [`list`]
pub const DEFAULT_INSIGHT_LIMIT: usize = 10;

/// Render the current insight set for a user and store each entry.
pub fn generate(store: &Store, user_id: &str, today: NaiveDate) -> Result<Vec<GeneratedInsight>> {
    let insights = store.write(|t| {
        let txns = t.transactions_of(user_id);
        let stats = analytics::dashboard_stats(&txns, today);
        let trend = analytics::monthly_trend(&txns, today, DEFAULT_TREND_MONTHS);
        let anomalies = analytics::anomalies(&txns);

        let insights = generate_insights(&stats, &trend, &anomalies);
        let now = Utc::now();
        t.insights.extend(insights.iter().map(|i| StoredInsight {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            insight_type: i.kind,
            content: i.content.clone(),
            created_at: now,
        }));
        Ok(insights)
    })?;
    tracing::info!(user_id, count = insights.len(), "insights generated");
    Ok(insights)
}

/// Stored insights, newest first
pub fn list(store: &Store, user_id: &str, limit: usize) -> Result<Vec<StoredInsight>> {
    store.read(|t| {
        // Stored in insertion order; walk backwards for newest first
        t.insights
            .iter()
            .rev()
            .filter(|i| i.user_id == user_id)
            .take(limit)
            .cloned()
            .collect()
    })
}
