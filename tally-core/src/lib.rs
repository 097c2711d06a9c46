//! tally-core: Core types and analytics for the Tally finance dashboard

pub mod analytics;
pub mod finance;
pub mod insights;
pub mod time;
pub mod users;

pub use analytics::{
    AnalyticsSummary, CategoryBreakdown, DashboardStats, TrendPoint, dashboard_stats,
    monthly_trend,
};
pub use finance::{Category, NewTransaction, Transaction};
pub use insights::{GeneratedInsight, InsightKind, generate_insights};
pub use time::Month;
pub use users::{AdminStats, Role, StoredInsight, UploadLog, UploadLogEntry, UploadStatus, User};

/// Keyword categorization and the anomaly threshold rule
pub mod categorizer {
    use super::Category;

    /// A transaction is anomalous when it exceeds its category average by this factor
    pub const ANOMALY_RATIO: f64 = 2.5;

    /// Keyword table, checked in order. First hit wins, so "gas" lands in
    /// Transport before Utilities sees it.
    const KEYWORDS: &[(Category, &[&str])] = &[
        (
            Category::Food,
            &["restaurant", "cafe", "food", "dining", "lunch", "dinner", "breakfast", "pizza", "burger", "sushi"],
        ),
        (
            Category::Transport,
            &["uber", "lyft", "taxi", "bus", "train", "metro", "fuel", "gas", "parking", "toll"],
        ),
        (
            Category::Utilities,
            &["electricity", "water", "gas", "internet", "phone", "mobile", "broadband"],
        ),
        (
            Category::Shopping,
            &["amazon", "store", "mall", "shop", "retail", "clothing", "fashion", "electronics"],
        ),
        (
            Category::Entertainment,
            &["movie", "cinema", "netflix", "spotify", "game", "concert", "theater", "streaming"],
        ),
        (
            Category::Healthcare,
            &["hospital", "doctor", "pharmacy", "medical", "clinic", "health", "medicine", "dental"],
        ),
        (
            Category::Education,
            &["school", "university", "course", "tuition", "books", "education", "training"],
        ),
        (
            Category::Bills,
            &["bill", "payment", "insurance", "subscription", "membership"],
        ),
        (
            Category::Rent,
            &["rent", "lease", "housing", "apartment", "mortgage"],
        ),
        (
            Category::Groceries,
            &["grocery", "supermarket", "walmart", "target", "costco", "market"],
        ),
        (
            Category::Travel,
            &["hotel", "flight", "airline", "booking", "airbnb", "vacation", "trip"],
        ),
    ];

    /// Categorize a description by case-insensitive substring match
    pub fn categorize(description: &str) -> Category {
        let desc = description.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| desc.contains(w)))
            .map(|(c, _)| *c)
            .unwrap_or(Category::Miscellaneous)
    }

    pub fn detect_anomaly(amount: f64, category_average: f64) -> bool {
        amount > category_average * ANOMALY_RATIO
    }

}

pub use categorizer::{categorize, detect_anomaly};
