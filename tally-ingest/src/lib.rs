//! tally-ingest: statement CSV parsing (generic and AMEX layouts) and row validation.

pub mod parsers;
pub mod types;
pub mod validate;

use anyhow::{Context, Result};

pub use types::{CsvRow, StatementLayout, ValidRow};
pub use validate::validate_row;

/// Pick the layout for an uploaded file
pub fn detect_layout(bytes: &[u8]) -> StatementLayout {
    if parsers::amex::looks_amex(bytes) {
        StatementLayout::Amex
    } else {
        StatementLayout::Generic
    }
}

/// Parse an uploaded statement into raw rows, detecting its layout.
pub fn parse_statement(bytes: &[u8]) -> Result<(StatementLayout, Vec<CsvRow>)> {
    let layout = detect_layout(bytes);
    let rows = match layout {
        StatementLayout::Amex => parsers::amex::parse_amex_csv(bytes),
        StatementLayout::Generic => parsers::generic::parse_generic_csv(bytes),
    }
    .with_context(|| format!("parsing {layout:?} statement"))?;
    Ok((layout, rows))
}
