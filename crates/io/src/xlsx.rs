// Excel/ODS invoice reading (xlsx, xlsm, xlsb, xls, ods)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};

use crate::IoError;

/// Read the first worksheet that holds any data as a grid of display strings.
pub fn read_grid(path: &Path) -> Result<Vec<Vec<String>>, IoError> {
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(|e| IoError::Read {
        path: path.to_path_buf(),
        message: format!("Failed to open Excel file: {}", e),
    })?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(IoError::Empty(path.to_path_buf()));
    }

    for sheet_name in &sheet_names {
        let range = workbook.worksheet_range(sheet_name).map_err(|e| IoError::Parse {
            path: path.to_path_buf(),
            message: format!("Failed to read sheet '{}': {}", sheet_name, e),
        })?;

        let grid: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();

        if grid.iter().any(|row| row.iter().any(|c| !c.is_empty())) {
            log::debug!(
                "reading sheet '{}' of {}: {} rows",
                sheet_name,
                path.display(),
                grid.len()
            );
            return Ok(grid);
        }
    }

    Err(IoError::Empty(path.to_path_buf()))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // Integers without decimals: pincodes and AWBs are often numeric cells
        Data::Float(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => format!("{}", n),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{:?}", e),
        // Date serial; 1900 date system assumed
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
    }
}
