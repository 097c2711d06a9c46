//! Table storage for users, transactions, insights, upload logs and summaries.
//!
//! Everything lives in memory behind one lock. When opened with a path the
//! tables are loaded from a JSON file and rewritten after every mutation.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tally_core::{AnalyticsSummary, StoredInsight, Transaction, UploadLog, User};

use crate::error::{FinanceError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub insights: Vec<StoredInsight>,
    #[serde(default)]
    pub upload_logs: Vec<UploadLog>,
    #[serde(default)]
    pub summaries: Vec<AnalyticsSummary>,
}

impl Tables {
    /// Clone out one user's transactions
    pub fn transactions_of(&self, user_id: &str) -> Vec<Transaction> {
        self.transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct Store {
    path: Option<PathBuf>,
    tables: Mutex<Tables>,
}

impl Store {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a JSON-backed store, starting empty when the file does not exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            let s = fs::read_to_string(&path)?;
            serde_json::from_str(&s)?
        } else {
            Tables::default()
        };
        tracing::debug!(path = %path.display(), "opened store");
        Ok(Self {
            path: Some(path),
            tables: Mutex::new(tables),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn read<R>(&self, f: impl FnOnce(&Tables) -> R) -> Result<R> {
        let guard = self.tables.lock().map_err(|_| FinanceError::Poisoned)?;
        Ok(f(&guard))
    }

    /// Mutate the tables and persist them. The change is applied to a copy and
    /// only becomes visible once it is on disk, so an error from `f` or from
    /// the file write leaves both memory and file as they were.
    pub fn write<R>(&self, f: impl FnOnce(&mut Tables) -> Result<R>) -> Result<R> {
        let mut guard = self.tables.lock().map_err(|_| FinanceError::Poisoned)?;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        if let Some(path) = &self.path {
            persist(path, &next)?;
        }
        *guard = next;
        Ok(out)
    }
}

fn persist(path: &Path, tables: &Tables) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(tables)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
