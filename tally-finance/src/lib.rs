//! tally-finance: storage, CSV upload pipeline, and the transaction,
//! analytics, advisor and admin services built on them.

pub mod admin;
pub mod advisor;
pub mod error;
pub mod pipeline;
pub mod reports;
pub mod store;
pub mod transactions;

pub use error::{FinanceError, Result};
pub use pipeline::{UploadOutcome, ingest_upload};
pub use store::{Store, Tables};
pub use transactions::{TransactionFilter, TransactionPage};
