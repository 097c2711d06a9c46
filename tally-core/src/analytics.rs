//! Aggregations over one user's transactions: monthly totals, category
//! breakdowns, trend series, next-month prediction and dashboard stats.
//!
//! Everything here is pure; callers pass `today` so results are reproducible.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::finance::{Category, Transaction};
use crate::time::{Month, trailing_months};

/// Maximum number of flagged transactions surfaced to dashboards
pub const ANOMALY_LIST_LIMIT: usize = 10;

/// Months fed into the prediction
pub const PREDICTION_WINDOW: usize = 3;

/// Default trend length for dashboards and insights
pub const DEFAULT_TREND_MONTHS: usize = 6;

pub type CategoryBreakdown = BTreeMap<Category, f64>;

/// One point of a monthly spending series
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TrendPoint {
    pub month: Month,
    pub spending: f64,
}

/// Figures shown on the main dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_monthly_spending: f64,
    pub highest_spending_category: String,
    pub predicted_next_month: f64,
    pub anomaly_count: usize,
    pub category_breakdown: CategoryBreakdown,
}

/// Persisted snapshot of one month's totals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyticsSummary {
    pub user_id: String,
    pub month: Month,
    pub total_spent: f64,
    pub category_breakdown: CategoryBreakdown,
    pub created_at: DateTime<Utc>,
}

pub fn monthly_spending(txns: &[Transaction], month: Month) -> f64 {
    txns.iter()
        .filter(|t| month.contains(t.date))
        .map(|t| t.amount)
        .sum()
}

/// Sum per category, optionally restricted to one month
pub fn category_breakdown(txns: &[Transaction], month: Option<Month>) -> CategoryBreakdown {
    let mut out = CategoryBreakdown::new();
    for t in txns {
        if month.is_some_and(|m| !m.contains(t.date)) {
            continue;
        }
        *out.entry(t.category).or_insert(0.0) += t.amount;
    }
    out
}

/// Mean amount per category across all given transactions
pub fn category_averages(txns: &[Transaction]) -> BTreeMap<Category, f64> {
    let mut totals: BTreeMap<Category, (f64, usize)> = BTreeMap::new();
    for t in txns {
        let e = totals.entry(t.category).or_insert((0.0, 0));
        e.0 += t.amount;
        e.1 += 1;
    }
    totals
        .into_iter()
        .map(|(c, (sum, count))| (c, sum / count as f64))
        .collect()
}

pub fn monthly_trend(txns: &[Transaction], today: NaiveDate, months: usize) -> Vec<TrendPoint> {
    trailing_months(today, months)
        .into_iter()
        .map(|month| TrendPoint {
            month,
            spending: monthly_spending(txns, month),
        })
        .collect()
}

/// Average of the trend plus half of the latest month-over-month change, floored at zero.
pub fn predict_from_trend(trend: &[TrendPoint]) -> f64 {
    if trend.is_empty() {
        return 0.0;
    }
    let average = trend.iter().map(|p| p.spending).sum::<f64>() / trend.len() as f64;
    if trend.len() < 2 {
        return average;
    }
    let recent = trend[trend.len() - 1].spending - trend[trend.len() - 2].spending;
    (average + recent * 0.5).max(0.0)
}

pub fn predict_next_month(txns: &[Transaction], today: NaiveDate) -> f64 {
    predict_from_trend(&monthly_trend(txns, today, PREDICTION_WINDOW))
}

/// Flagged transactions, newest first, capped at [`ANOMALY_LIST_LIMIT`]
pub fn anomalies(txns: &[Transaction]) -> Vec<Transaction> {
    let mut flagged: Vec<Transaction> = txns.iter().filter(|t| t.is_anomaly).cloned().collect();
    flagged.sort_by(|a, b| b.date.cmp(&a.date));
    flagged.truncate(ANOMALY_LIST_LIMIT);
    flagged
}

/// Largest entry of a breakdown. Ties go to the category listed first.
pub fn top_category(breakdown: &CategoryBreakdown) -> Option<(Category, f64)> {
    breakdown
        .iter()
        .fold(None, |best: Option<(Category, f64)>, (&c, &v)| match best {
            Some((_, bv)) if bv >= v => best,
            _ => Some((c, v)),
        })
}

pub fn dashboard_stats(txns: &[Transaction], today: NaiveDate) -> DashboardStats {
    let current = Month::of(today);
    let breakdown = category_breakdown(txns, Some(current));
    let highest = top_category(&breakdown)
        .map(|(c, _)| c.name().to_string())
        .unwrap_or_else(|| "N/A".to_string());

    DashboardStats {
        total_monthly_spending: monthly_spending(txns, current),
        highest_spending_category: highest,
        predicted_next_month: predict_next_month(txns, today),
        anomaly_count: anomalies(txns).len(),
        category_breakdown: breakdown,
    }
}

pub fn summarize_month(user_id: &str, txns: &[Transaction], month: Month) -> AnalyticsSummary {
    AnalyticsSummary {
        user_id: user_id.to_string(),
        month,
        total_spent: monthly_spending(txns, month),
        category_breakdown: category_breakdown(txns, Some(month)),
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn txn(date: NaiveDate, category: Category, amount: f64, anomaly: bool) -> Transaction {
        Transaction::new(
            format!("t-{date}-{amount}"),
            "u-1",
            date,
            "test",
            category,
            amount,
            anomaly,
        )
    }

    fn sample() -> Vec<Transaction> {
        vec![
            txn(d(2025, 12, 5), Category::Food, 100.0, false),
            txn(d(2026, 1, 10), Category::Food, 150.0, false),
            txn(d(2026, 1, 20), Category::Rent, 50.0, false),
            txn(d(2026, 2, 1), Category::Food, 60.0, false),
            txn(d(2026, 2, 14), Category::Travel, 240.0, true),
        ]
    }

    #[test]
    fn test_monthly_spending() {
        let txns = sample();
        assert_eq!(monthly_spending(&txns, Month::new(2026, 1).unwrap()), 200.0);
        assert_eq!(monthly_spending(&txns, Month::new(2026, 2).unwrap()), 300.0);
        assert_eq!(monthly_spending(&txns, Month::new(2024, 2).unwrap()), 0.0);
    }

    #[test]
    fn test_breakdown_all_time_and_month() {
        let txns = sample();
        let all = category_breakdown(&txns, None);
        assert_eq!(all[&Category::Food], 310.0);
        assert_eq!(all[&Category::Travel], 240.0);

        let feb = category_breakdown(&txns, Some(Month::new(2026, 2).unwrap()));
        assert_eq!(feb.len(), 2);
        assert!(!feb.contains_key(&Category::Rent));
    }

    #[test]
    fn test_category_averages() {
        let avgs = category_averages(&sample());
        assert!((avgs[&Category::Food] - 310.0 / 3.0).abs() < 1e-9);
        assert_eq!(avgs[&Category::Rent], 50.0);
    }

    #[test]
    fn test_trend_and_prediction() {
        let txns = sample();
        let trend = monthly_trend(&txns, d(2026, 2, 20), 3);
        let values: Vec<f64> = trend.iter().map(|p| p.spending).collect();
        assert_eq!(values, vec![100.0, 200.0, 300.0]);
        // avg 200 + (300 - 200) * 0.5
        assert_eq!(predict_next_month(&txns, d(2026, 2, 20)), 250.0);
    }

    #[test]
    fn test_prediction_floors_at_zero() {
        let month = Month::new(2026, 1).unwrap();
        let trend = vec![
            TrendPoint { month: month.prev(), spending: 0.0 },
            TrendPoint { month, spending: 900.0 },
            TrendPoint { month: month.next(), spending: 0.0 },
        ];
        assert_eq!(predict_from_trend(&trend), 0.0);
        assert_eq!(predict_from_trend(&[]), 0.0);
        assert_eq!(predict_from_trend(&trend[1..2]), 900.0);
    }

    #[test]
    fn test_anomalies_newest_first_and_capped() {
        let mut txns = Vec::new();
        for day in 1..=15 {
            txns.push(txn(d(2026, 1, day), Category::Shopping, day as f64, true));
        }
        txns.push(txn(d(2026, 1, 20), Category::Shopping, 1.0, false));
        let flagged = anomalies(&txns);
        assert_eq!(flagged.len(), ANOMALY_LIST_LIMIT);
        assert_eq!(flagged[0].date, d(2026, 1, 15));
        assert!(flagged.iter().all(|t| t.is_anomaly));
    }

    #[test]
    fn test_dashboard_stats() {
        let stats = dashboard_stats(&sample(), d(2026, 2, 20));
        assert_eq!(stats.total_monthly_spending, 300.0);
        assert_eq!(stats.highest_spending_category, "Travel");
        assert_eq!(stats.predicted_next_month, 250.0);
        assert_eq!(stats.anomaly_count, 1);

        let empty = dashboard_stats(&[], d(2026, 2, 20));
        assert_eq!(empty.highest_spending_category, "N/A");
        assert_eq!(empty.total_monthly_spending, 0.0);
    }

    #[test]
    fn test_dashboard_json_is_camel_case() {
        let stats = dashboard_stats(&sample(), d(2026, 2, 20));
        let v = serde_json::to_value(&stats).unwrap();
        assert!(v.get("totalMonthlySpending").is_some());
        assert_eq!(v["categoryBreakdown"]["Travel"], 240.0);
    }
}
