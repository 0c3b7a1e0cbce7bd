//! Header-row location for loosely structured invoice exports.
//!
//! Courier exports often start with a title block (company name, billing
//! period, account number) before the real column headers. We score the
//! first few rows against a small domain vocabulary and pick the most
//! header-like one.

use std::collections::HashSet;

use crate::model::{RawRow, RawValue};

/// Only this many leading rows are considered.
pub const MAX_SCAN_ROWS: usize = 10;

/// A row matching this many keywords is taken immediately.
pub const STRONG_MATCH: usize = 4;

const KEYWORDS: &[&str] = &[
    "awb", "waybill", "tracking", "zone", "weight", "amount", "type", "pincode", "pin", "date",
    "cod", "order", "billed", "total", "charge", "freight",
];

/// Zero-based index of the most header-like row. Defaults to 0.
pub fn locate_header_row<S: AsRef<str>>(grid: &[Vec<S>]) -> usize {
    let mut best_row = 0;
    let mut best_score = 0;

    for (idx, row) in grid.iter().take(MAX_SCAN_ROWS).enumerate() {
        let cells: Vec<String> = row
            .iter()
            .map(|c| c.as_ref().trim().to_lowercase())
            .filter(|c| !c.is_empty())
            .collect();
        if cells.len() < 2 {
            continue;
        }

        let score = KEYWORDS
            .iter()
            .filter(|kw| cells.iter().any(|c| c.contains(*kw)))
            .count();

        if score >= STRONG_MATCH {
            return idx;
        }
        // Strictly greater: ties keep the earlier row.
        if score > best_score {
            best_score = score;
            best_row = idx;
        }
    }

    best_row
}

/// Split a grid at `header_row` into header names and keyed data rows.
///
/// Blank header cells become `Column N` (1-based) and repeated names get a
/// ` (2)`, ` (3)` suffix so every cell keeps a distinct key. Data rows with
/// no non-blank cell are skipped.
pub fn rows_from_grid<S: AsRef<str>>(grid: &[Vec<S>], header_row: usize) -> (Vec<String>, Vec<RawRow>) {
    let Some(header_cells) = grid.get(header_row) else {
        return (Vec::new(), Vec::new());
    };

    let width = grid
        .iter()
        .skip(header_row)
        .map(|r| r.len())
        .max()
        .unwrap_or(0);

    let mut used: HashSet<String> = HashSet::new();
    let headers: Vec<String> = (0..width)
        .map(|col| {
            let raw = header_cells.get(col).map(|c| c.as_ref().trim()).unwrap_or("");
            let base = if raw.is_empty() {
                format!("Column {}", col + 1)
            } else {
                raw.to_string()
            };
            // A suffixed name may itself appear later in the row.
            let mut name = base.clone();
            let mut n = 1;
            while used.contains(&name) {
                n += 1;
                name = format!("{base} ({n})");
            }
            used.insert(name.clone());
            name
        })
        .collect();

    let rows = grid
        .iter()
        .skip(header_row + 1)
        .filter(|r| r.iter().any(|c| !c.as_ref().trim().is_empty()))
        .map(|r| {
            headers
                .iter()
                .enumerate()
                .map(|(col, h)| {
                    let value = r
                        .get(col)
                        .map(|c| RawValue::from_cell(c.as_ref()))
                        .unwrap_or(RawValue::Empty);
                    (h.clone(), value)
                })
                .collect::<RawRow>()
        })
        .collect();

    (headers, rows)
}
