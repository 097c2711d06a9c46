//! Generic bank export: a header row naming `date`, `description`, `amount`
//! and optionally `category`, in any order.
//!
//!   date,description,amount,category
//!   2026-01-04,Joe's Pizza,18.50,
//!   2026-01-05,Shell Gas,42.10,Transport

use anyhow::{Context, Result, bail};
use csv::StringRecord;

use crate::types::CsvRow;

struct Columns {
    date: usize,
    description: usize,
    amount: usize,
    category: Option<usize>,
}

impl Columns {
    fn locate(header: &StringRecord) -> Option<Self> {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
        };
        Some(Self {
            date: find("date")?,
            description: find("description")?,
            amount: find("amount")?,
            category: find("category"),
        })
    }
}

pub fn parse_generic_csv(bytes: &[u8]) -> Result<Vec<CsvRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let header = rdr.headers().context("reading CSV header")?.clone();
    let Some(cols) = Columns::locate(&header) else {
        bail!("CSV header must contain date, description and amount columns");
    };

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.context("reading CSV record")?;
        let cell = |i: usize| record.get(i).unwrap_or("").to_string();
        rows.push(CsvRow {
            date: cell(cols.date),
            description: cell(cols.description),
            amount: cell(cols.amount),
            category: cols
                .category
                .map(cell)
                .filter(|c| !c.is_empty()),
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_basic_rows() {
        let csv = "date,description,amount,category\n\
                   2026-01-04,Joe's Pizza,18.50,\n\
                   2026-01-05,Shell Gas,42.10,Transport\n";
        let rows = parse_generic_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].description, "Joe's Pizza");
        assert_eq!(rows[0].category, None);
        assert_eq!(rows[1].amount, "42.10");
        assert_eq!(rows[1].category.as_deref(), Some("Transport"));
    }

    #[test]
    fn test_column_order_and_case_are_free() {
        let csv = "Amount , Description,DATE,Memo\n12.00,Coffee,2026-02-01,x\n";
        let rows = parse_generic_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].date, "2026-02-01");
        assert_eq!(rows[0].amount, "12.00");
        assert_eq!(rows[0].description, "Coffee");
    }

    #[test]
    fn test_missing_columns_is_error() {
        let csv = "when,what\n2026-01-01,thing\n";
        assert!(parse_generic_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_short_rows_yield_empty_cells() {
        let csv = "date,description,amount\n2026-01-01,Lonely\n";
        let rows = parse_generic_csv(csv.as_bytes()).unwrap();
        assert_eq!(rows[0].amount, "");
    }
}
