//! Advisor text rendered from dashboard figures with fixed templates.

use serde::{Deserialize, Serialize};

use crate::analytics::{DashboardStats, TrendPoint, top_category};
use crate::finance::{Category, Transaction};

/// Anomalies quoted by name in the alert text
const ANOMALY_SAMPLE: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    SpendingPattern,
    CategoryAnalysis,
    AnomalyAlert,
    Prediction,
    Recommendations,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneratedInsight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub content: String,
}

/// Render the full insight set. The anomaly alert is only present when
/// `anomalies` is non-empty.
pub fn generate_insights(
    stats: &DashboardStats,
    trend: &[TrendPoint],
    anomalies: &[Transaction],
) -> Vec<GeneratedInsight> {
    let mut out = vec![
        GeneratedInsight {
            kind: InsightKind::SpendingPattern,
            content: spending_pattern(trend),
        },
        GeneratedInsight {
            kind: InsightKind::CategoryAnalysis,
            content: category_analysis(stats),
        },
    ];

    if !anomalies.is_empty() {
        out.push(GeneratedInsight {
            kind: InsightKind::AnomalyAlert,
            content: anomaly_alert(anomalies),
        });
    }

    out.push(GeneratedInsight {
        kind: InsightKind::Prediction,
        content: prediction(stats.total_monthly_spending, stats.predicted_next_month),
    });
    out.push(GeneratedInsight {
        kind: InsightKind::Recommendations,
        content: recommendations(stats, trend),
    });
    out
}

pub fn spending_pattern(trend: &[TrendPoint]) -> String {
    if trend.len() < 2 {
        return "Not enough data to analyze spending patterns. Keep tracking your expenses!"
            .to_string();
    }

    let recent = &trend[trend.len().saturating_sub(3)..];
    let average = recent.iter().map(|p| p.spending).sum::<f64>() / recent.len() as f64;
    let latest = recent[recent.len() - 1].spending;

    if latest > average * 1.2 {
        format!(
            "Your spending has increased by {:.1}% compared to your recent average. Consider reviewing your recent purchases.",
            (latest / average - 1.0) * 100.0
        )
    } else if latest < average * 0.8 {
        format!(
            "Great job! Your spending decreased by {:.1}% compared to your recent average.",
            (1.0 - latest / average) * 100.0
        )
    } else {
        format!(
            "Your spending is consistent with your recent patterns, averaging ${average:.2} per month."
        )
    }
}

pub fn category_analysis(stats: &DashboardStats) -> String {
    let Some((category, amount)) = top_category(&stats.category_breakdown) else {
        return "No spending data available for category analysis.".to_string();
    };
    let total: f64 = stats.category_breakdown.values().sum();
    let share = if total > 0.0 { amount / total * 100.0 } else { 0.0 };
    let shown = (share * 10.0).round() / 10.0;

    let mut s = format!(
        "Your highest spending category is {category}, accounting for {shown:.1}% of your total expenses (${amount:.2})."
    );
    if shown > 40.0 {
        s.push_str(
            " This is a significant portion of your budget. Consider if this aligns with your financial goals.",
        );
    }
    s
}

pub fn anomaly_alert(anomalies: &[Transaction]) -> String {
    let quoted = anomalies
        .iter()
        .take(ANOMALY_SAMPLE)
        .map(|a| format!("{} (${:.2})", a.description, a.amount))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "We detected {} unusual transactions recently: {}. These are significantly higher than your typical spending in these categories.",
        anomalies.len(),
        quoted
    )
}

pub fn prediction(current: f64, predicted: f64) -> String {
    let diff = predicted - current;

    if diff.abs() < current * 0.1 || (current == 0.0 && predicted == 0.0) {
        return format!(
            "Based on your spending patterns, we predict your next month's spending will be around ${predicted:.2}, similar to this month."
        );
    }

    // No baseline this month: a percentage would be meaningless
    if current <= 0.0 {
        return format!(
            "We predict your spending may increase to ${predicted:.2} next month. Plan accordingly!"
        );
    }

    let pct = diff / current * 100.0;
    if diff > 0.0 {
        format!(
            "We predict your spending may increase to ${predicted:.2} next month ({pct:.1}% increase). Plan accordingly!"
        )
    } else {
        format!(
            "Good news! We predict your spending may decrease to ${predicted:.2} next month ({:.1}% decrease).",
            pct.abs()
        )
    }
}

pub fn recommendations(stats: &DashboardStats, trend: &[TrendPoint]) -> String {
    let spent = |c: Category| stats.category_breakdown.get(&c).copied().unwrap_or(0.0);
    let mut recs: Vec<&str> = Vec::new();

    if stats.total_monthly_spending > 3000.0 {
        recs.push("Consider setting a monthly budget limit to control spending");
    }
    // Only compared when both categories saw spending this month
    let fun = stats.category_breakdown.get(&Category::Entertainment);
    let health = stats.category_breakdown.get(&Category::Healthcare);
    if matches!((fun, health), (Some(f), Some(h)) if f > h) {
        recs.push("You're spending more on entertainment than healthcare. Consider balancing these priorities");
    }
    if spent(Category::Food) > 500.0 {
        recs.push("Food expenses are high. Try meal planning or cooking at home more often");
    }

    let increasing = trend.len() >= 2
        && trend[trend.len() - 1].spending > trend[trend.len() - 2].spending;
    if increasing {
        recs.push("Your spending trend is increasing. Review recent purchases and identify areas to cut back");
    }
    if stats.anomaly_count > 3 {
        recs.push("Multiple unusual transactions detected. Review these carefully to avoid overspending");
    }

    if recs.is_empty() {
        "Keep up the good work! Your spending habits look healthy.".to_string()
    } else {
        format!("{}.", recs.join(". "))
    }
}
