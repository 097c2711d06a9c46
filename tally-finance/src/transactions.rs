//! Transaction listing, creation and deletion scoped to one user.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tally_core::analytics::category_averages;
use tally_core::{Category, NewTransaction, Transaction, categorize, detect_anomaly};

use crate::error::{FinanceError, Result};
use crate::store::Store;

/// Page size used when only an offset is given
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFilter {
    pub category: Option<String>,
    /// Inclusive lower bound
    pub start_date: Option<NaiveDate>,
    /// Inclusive upper bound
    pub end_date: Option<NaiveDate>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    /// Matches before paging
    pub total: usize,
}

impl TransactionFilter {
    fn matches(&self, t: &Transaction) -> bool {
        if let Some(c) = &self.category {
            // Unknown category names match nothing
            if Category::parse(c) != Some(t.category) {
                return false;
            }
        }
        if self.start_date.is_some_and(|d| t.date < d) {
            return false;
        }
        if self.end_date.is_some_and(|d| t.date > d) {
            return false;
        }
        true
    }

    /// Zero limit or offset counts as not given
    fn window(&self, total: usize) -> (usize, usize) {
        let offset = self.offset.filter(|&n| n > 0);
        let limit = self.limit.filter(|&n| n > 0);
        match (offset, limit) {
            (Some(offset), limit) => (offset, limit.unwrap_or(DEFAULT_PAGE_SIZE)),
            (None, Some(limit)) => (0, limit),
            (None, None) => (0, total),
        }
    }
}

pub fn list(store: &Store, user_id: &str, filter: &TransactionFilter) -> Result<TransactionPage> {
    let mut matched: Vec<Transaction> = store.read(|t| {
        t.transactions
            .iter()
            .filter(|x| x.user_id == user_id && filter.matches(x))
            .cloned()
            .collect()
    })?;
    matched.sort_by(|a, b| b.date.cmp(&a.date));

    let total = matched.len();
    let (skip, take) = filter.window(total);
    let transactions = matched.into_iter().skip(skip).take(take).collect();
    Ok(TransactionPage { transactions, total })
}

/// Categorize and anomaly-check one input against the user's prior category averages.
pub(crate) fn build_transaction(
    user_id: &str,
    input: NewTransaction,
    averages: &BTreeMap<Category, f64>,
) -> Transaction {
    let category = input.category.unwrap_or_else(|| categorize(&input.description));
    let average = averages.get(&category).copied().unwrap_or(input.amount);
    let is_anomaly = detect_anomaly(input.amount, average);

    Transaction::new(
        uuid::Uuid::new_v4().to_string(),
        user_id,
        input.date,
        input.description,
        category,
        input.amount,
        is_anomaly,
    )
}

/// Insert a batch for one user. Averages come from what was stored before the batch.
pub(crate) fn insert_batch(
    store: &Store,
    user_id: &str,
    inputs: Vec<NewTransaction>,
) -> Result<Vec<Transaction>> {
    store.write(|t| {
        let averages = category_averages(&t.transactions_of(user_id));
        let created: Vec<Transaction> = inputs
            .into_iter()
            .map(|input| build_transaction(user_id, input, &averages))
            .collect();
        t.transactions.extend(created.iter().cloned());
        Ok(created)
    })
}

pub fn create(store: &Store, user_id: &str, input: NewTransaction) -> Result<Transaction> {
    let created = insert_batch(store, user_id, vec![input])?;
    created
        .into_iter()
        .next()
        .ok_or(FinanceError::NotFound("Transaction"))
}

pub fn delete(store: &Store, user_id: &str, id: &str) -> Result<()> {
    store.write(|t| {
        let pos = t
            .transactions
            .iter()
            .position(|x| x.id == id && x.user_id == user_id)
            .ok_or(FinanceError::NotFound("Transaction"))?;
        t.transactions.remove(pos);
        Ok(())
    })?;
    tracing::info!(user_id, transaction_id = id, "transaction deleted");
    Ok(())
}
