//! Accounts, roles, upload logs and stored insights

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Same id the identity service issues for this account
    pub id: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Success,
    Failed,
    /// Some rows were rejected by validation
    Partial,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadLog {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub rows_processed: usize,
    pub status: UploadStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Upload log joined with the uploader's email for admin views
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadLogEntry {
    #[serde(flatten)]
    pub log: UploadLog,
    pub user_email: Option<String>,
}

/// A generated insight after it has been stored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredInsight {
    pub id: String,
    pub user_id: String,
    pub insight_type: crate::insights::InsightKind,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: usize,
    pub total_transactions: usize,
    pub average_spending: f64,
}
