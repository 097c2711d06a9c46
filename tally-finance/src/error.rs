//! Error type shared by the finance services

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinanceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid role")]
    InvalidRole,

    #[error("user already exists: {0}")]
    UserExists(String),

    #[error("No valid rows in CSV")]
    NoValidRows,

    #[error("{0:#}")]
    Parse(anyhow::Error),

    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

pub type Result<T> = std::result::Result<T, FinanceError>;
