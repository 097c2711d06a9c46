use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Which statement layout a file was parsed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementLayout {
    /// Header row naming `date`, `description`, `amount` and optionally `category`
    Generic,
    /// AMEX activity export with a preamble before the `Date,...` header
    Amex,
}

/// One CSV row as text, before validation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CsvRow {
    pub date: String,
    pub description: String,
    pub amount: String,
    pub category: Option<String>,
}

/// A row that passed validation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidRow {
    pub date: NaiveDate,
    pub description: String,
    /// Positive spend amount
    pub amount: f64,
    /// Category text supplied by the file, if any
    pub category: Option<String>,
}
