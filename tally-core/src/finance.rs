//! Transaction types and the fixed category set

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored transaction belonging to one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    /// Date of the transaction (YYYY-MM-DD)
    pub date: NaiveDate,
    pub description: String,
    pub category: Category,
    /// Positive spend amount
    pub amount: f64,
    pub is_anomaly: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for a transaction that has not been categorized or stored yet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    /// Explicit category; `None` means keyword categorization decides
    #[serde(default)]
    pub category: Option<Category>,
}

/// Spending categories matched deterministically
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Food,
    Transport,
    Utilities,
    Shopping,
    Entertainment,
    Healthcare,
    Education,
    Bills,
    Rent,
    Groceries,
    Travel,
    Miscellaneous,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Food,
        Category::Transport,
        Category::Utilities,
        Category::Shopping,
        Category::Entertainment,
        Category::Healthcare,
        Category::Education,
        Category::Bills,
        Category::Rent,
        Category::Groceries,
        Category::Travel,
        Category::Miscellaneous,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Utilities => "Utilities",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Healthcare => "Healthcare",
            Category::Education => "Education",
            Category::Bills => "Bills",
            Category::Rent => "Rent",
            Category::Groceries => "Groceries",
            Category::Travel => "Travel",
            Category::Miscellaneous => "Miscellaneous",
        }
    }

    /// Case-insensitive lookup by name. Unknown names yield `None`.
    pub fn parse(s: &str) -> Option<Category> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl Transaction {
    /// Build a stored transaction from categorized input
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        date: NaiveDate,
        description: impl Into<String>,
        category: Category,
        amount: f64,
        is_anomaly: bool,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            date,
            description: description.into(),
            category,
            amount,
            is_anomaly,
            created_at: Utc::now(),
        }
    }
}
