//! AMEX activity export.
//!
//! AMEX CSVs start with a few preamble rows, then:
//! Date,Description,Amount,Extended Details,Appears On Your Statement As,
//! Address,City/State,Zip Code,Country,Reference,Category

use anyhow::{Context, Result};

use crate::types::CsvRow;

const COL_DATE: usize = 0;
const COL_DESCRIPTION: usize = 1;
const COL_AMOUNT: usize = 2;
const COL_CATEGORY: usize = 10;

/// True when some row before the data starts with a bare `Date` cell and the
/// row also carries AMEX's trailing `Category` column
pub fn looks_amex(bytes: &[u8]) -> bool {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(bytes);
    rdr.records().flatten().take(12).any(|r| {
        r.get(COL_DATE).map(str::trim) == Some("Date")
            && r.get(COL_CATEGORY).map(str::trim) == Some("Category")
    })
}

/// Map an AMEX "Group-Sub" category onto a Tally category name, when one fits
pub fn amex_category_hint(amex_category: &str) -> Option<&'static str> {
    let c = amex_category;
    if c.contains("Groceries") || c.contains("Wholesale Stores") {
        return Some("Groceries");
    }
    if c.starts_with("Restaurant") || c.contains("Bar & Café") {
        return Some("Food");
    }
    if c.starts_with("Transportation") || c.contains("Fuel") || c.contains("Taxis") || c.contains("Rail") {
        return Some("Transport");
    }
    if c.starts_with("Travel") || c.contains("Airline") || c.contains("Lodging") {
        return Some("Travel");
    }
    if c.contains("Utilities") || c.contains("Mobile Telecom") || c.contains("Cable & Internet") {
        return Some("Utilities");
    }
    if c.starts_with("Entertainment") {
        return Some("Entertainment");
    }
    if c.contains("Pharmacies") || c.contains("Health Care") {
        return Some("Healthcare");
    }
    if c.contains("Education") {
        return Some("Education");
    }
    if c.contains("Fees & Adjustments") || c.contains("Insurance") {
        return Some("Bills");
    }
    if c.starts_with("Merchandise & Supplies") {
        return Some("Shopping");
    }
    None
}

pub fn parse_amex_csv(bytes: &[u8]) -> Result<Vec<CsvRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_reader(bytes);

    let mut rows = Vec::new();
    let mut header_found = false;

    for result in rdr.records() {
        let record = result.context("reading AMEX record")?;
        // Skip until we find the header row
        if !header_found {
            if record.get(COL_DATE).map(|s| s.trim()) == Some("Date") {
                header_found = true;
            }
            continue;
        }

        let cell = |i: usize| record.get(i).unwrap_or("").trim().to_string();
        if cell(COL_DATE).is_empty() {
            continue;
        }

        rows.push(CsvRow {
            date: cell(COL_DATE),
            description: cell(COL_DESCRIPTION),
            amount: cell(COL_AMOUNT),
            category: amex_category_hint(&cell(COL_CATEGORY)).map(str::to_string),
        });
    }

    Ok(rows)
}
