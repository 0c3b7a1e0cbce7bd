// Invoice file loading and persistent storage

use std::fmt;
use std::path::{Path, PathBuf};

use shipaudit_audit::{prepare_grid, PreparedInvoice};

pub mod csv;
pub mod extraction;
pub mod store;
pub mod xlsx;

pub use extraction::{ExtractionOutput, ExtractionSource};
pub use store::SqliteStorage;

#[derive(Debug)]
pub enum IoError {
    /// File could not be opened or read.
    Read { path: PathBuf, message: String },
    /// File was read but its contents are malformed.
    Parse { path: PathBuf, message: String },
    /// File contains no cells.
    Empty(PathBuf),
    /// Extension is not one we know how to load.
    UnsupportedFormat(String),
    /// Store could not be opened or initialized.
    Store(String),
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, message } => write!(f, "cannot read {}: {message}", path.display()),
            Self::Parse { path, message } => write!(f, "cannot parse {}: {message}", path.display()),
            Self::Empty(path) => write!(f, "{} contains no data", path.display()),
            Self::UnsupportedFormat(ext) => write!(f, "unsupported invoice format: {ext}"),
            Self::Store(msg) => write!(f, "store error: {msg}"),
        }
    }
}

impl std::error::Error for IoError {}

/// A loaded invoice before header detection.
#[derive(Debug, Clone)]
pub enum InvoiceSource {
    /// Cell grid from a spreadsheet or delimited text file.
    Grid(Vec<Vec<String>>),
    /// Keyed rows returned by a PDF extraction service.
    Extracted(ExtractionOutput),
}

impl InvoiceSource {
    pub fn prepare(self) -> PreparedInvoice {
        match self {
            Self::Grid(grid) => prepare_grid(&grid),
            Self::Extracted(output) => {
                log::debug!(
                    "extraction output: {} rows from {} pages ({:?})",
                    output.rows.len(),
                    output.pages,
                    output.source
                );
                let (headers, rows) = output.into_raw_rows();
                shipaudit_audit::prepare_rows(headers, rows, 0)
            }
        }
    }
}

/// Load an invoice, choosing the reader from the file extension.
pub fn load_invoice(path: &Path) -> Result<InvoiceSource, IoError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let source = match ext.as_str() {
        "csv" | "txt" => InvoiceSource::Grid(csv::read_grid(path)?),
        "tsv" => InvoiceSource::Grid(csv::read_grid_with_delimiter(path, b'\t')?),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => InvoiceSource::Grid(xlsx::read_grid(path)?),
        "json" => InvoiceSource::Extracted(extraction::read(path)?),
        "" => return Err(IoError::UnsupportedFormat("(no extension)".to_string())),
        other => return Err(IoError::UnsupportedFormat(other.to_string())),
    };

    let empty = match &source {
        InvoiceSource::Grid(grid) => grid.iter().all(|row| row.iter().all(|c| c.trim().is_empty())),
        InvoiceSource::Extracted(output) => output.rows.is_empty(),
    };
    if empty {
        return Err(IoError::Empty(path.to_path_buf()));
    }
    Ok(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn dispatch_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("invoice.CSV");
        fs::write(&path, "AWB,Amount\nA1,10\n").unwrap();
        assert!(matches!(load_invoice(&path).unwrap(), InvoiceSource::Grid(_)));

        let path = dir.path().join("invoice.json");
        fs::write(&path, r#"{"rows":[{"AWB":"A1","Amount":10}],"source":"text","pages":1}"#).unwrap();
        assert!(matches!(load_invoice(&path).unwrap(), InvoiceSource::Extracted(_)));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_invoice(Path::new("invoice.pdf")).unwrap_err();
        assert!(matches!(err, IoError::UnsupportedFormat(ref e) if e == "pdf"));
    }

    #[test]
    fn blank_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blank.csv");
        fs::write(&path, "\n,,\n").unwrap();
        assert!(matches!(load_invoice(&path).unwrap_err(), IoError::Empty(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_invoice(Path::new("/nonexistent/invoice.csv")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/invoice.csv"));
    }
}
