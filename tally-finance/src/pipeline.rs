//! Upload ingestion: parse → validate → categorize → flag anomalies → store → log.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tally_core::{Category, NewTransaction, Transaction, UploadLog, UploadStatus};
use tally_ingest::{StatementLayout, ValidRow, parse_statement, validate_row};
use tracing::{info, warn};

use crate::error::{FinanceError, Result};
use crate::store::Store;
use crate::transactions::insert_batch;

/// Result of a processed upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub message: String,
    pub layout: StatementLayout,
    /// Rows that passed validation and were stored
    pub processed: usize,
    /// Rows read from the file
    pub total: usize,
    pub transactions: Vec<Transaction>,
}

/// File-supplied category text wins when it names a known category
fn to_new_transaction(row: ValidRow) -> NewTransaction {
    NewTransaction {
        category: row.category.as_deref().and_then(Category::parse),
        date: row.date,
        description: row.description,
        amount: row.amount,
    }
}

pub fn ingest_upload(store: &Store, user_id: &str, filename: &str, bytes: &[u8]) -> Result<UploadOutcome> {
    info!(user_id, filename, size = bytes.len(), "CSV upload started");

    let (layout, rows) = match parse_statement(bytes) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(user_id, filename, error = %format!("{e:#}"), "CSV parse failed");
            record_log(store, user_id, filename, 0, UploadStatus::Failed, Some(format!("{e:#}")))?;
            return Err(FinanceError::Parse(e));
        }
    };
    let total = rows.len();
    info!(user_id, ?layout, rows = total, "parsed rows");

    let valid: Vec<NewTransaction> = rows
        .iter()
        .filter_map(validate_row)
        .map(to_new_transaction)
        .collect();
    let processed = valid.len();
    info!(user_id, valid = processed, "validated rows");

    if valid.is_empty() {
        record_log(
            store,
            user_id,
            filename,
            0,
            UploadStatus::Failed,
            Some("No valid rows found".to_string()),
        )?;
        return Err(FinanceError::NoValidRows);
    }

    let transactions = match insert_batch(store, user_id, valid) {
        Ok(created) => created,
        Err(e) => {
            warn!(user_id, filename, error = %e, "storing transactions failed");
            record_log(store, user_id, filename, 0, UploadStatus::Failed, Some(e.to_string()))?;
            return Err(e);
        }
    };
    let anomalies = transactions.iter().filter(|t| t.is_anomaly).count();
    info!(user_id, created = transactions.len(), anomalies, "transactions created");

    let status = if processed < total {
        UploadStatus::Partial
    } else {
        UploadStatus::Success
    };
    record_log(store, user_id, filename, processed, status, None)?;

    Ok(UploadOutcome {
        message: "CSV uploaded successfully".to_string(),
        layout,
        processed,
        total,
        transactions,
    })
}

fn record_log(
    store: &Store,
    user_id: &str,
    filename: &str,
    rows_processed: usize,
    status: UploadStatus,
    error_message: Option<String>,
) -> Result<()> {
    let log = UploadLog {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        filename: filename.to_string(),
        rows_processed,
        status,
        error_message,
        created_at: Utc::now(),
    };
    store.write(|t| {
        t.upload_logs.push(log);
        Ok(())
    })
}
