// Output of the PDF extraction service
//
// The service reads a PDF invoice (text layer first, AI model as fallback)
// and returns keyed rows. We only consume its JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shipaudit_audit::model::{RawRow, RawValue};

use crate::IoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionSource {
    /// Rows came from the PDF text layer.
    Text,
    /// Rows were read by a vision/language model.
    Ai,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub rows: Vec<Map<String, Value>>,
    pub source: ExtractionSource,
    #[serde(default)]
    pub pages: u32,
}

impl ExtractionOutput {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Headers in first-seen order plus one RawRow per record.
    pub fn into_raw_rows(self) -> (Vec<String>, Vec<RawRow>) {
        let mut headers: Vec<String> = Vec::new();
        let rows = self
            .rows
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .map(|(key, value)| {
                        if !headers.contains(&key) {
                            headers.push(key.clone());
                        }
                        (key, raw_value(value))
                    })
                    .collect::<RawRow>()
            })
            .collect();
        (headers, rows)
    }
}

fn raw_value(value: Value) -> RawValue {
    match value {
        Value::Null => RawValue::Empty,
        Value::Number(n) => n.as_f64().map(RawValue::Number).unwrap_or(RawValue::Empty),
        Value::String(s) => RawValue::from_cell(&s),
        Value::Bool(b) => RawValue::Text(b.to_string()),
        other => RawValue::Text(other.to_string()),
    }
}

pub fn read(path: &Path) -> Result<ExtractionOutput, IoError> {
    let content = std::fs::read_to_string(path).map_err(|e| IoError::Read {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    ExtractionOutput::from_json(&content).map_err(|e| IoError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
