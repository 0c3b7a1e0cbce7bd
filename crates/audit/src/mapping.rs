use crate::error::AuditError;
use crate::model::{CanonicalField, CanonicalRow, ColumnMapping, RawRow};

/// Project raw rows onto canonical names using a confirmed mapping.
///
/// Rows without an AWB or without a billed amount cannot be audited and
/// are dropped.
pub fn apply_mapping(rows: &[RawRow], mapping: &ColumnMapping) -> Vec<CanonicalRow> {
    let mapped: Vec<CanonicalRow> = rows
        .iter()
        .map(|raw| {
            let mut row = CanonicalRow::default();
            for (field, header) in mapping.mapped() {
                if let Some(value) = raw.get(header) {
                    row.insert(field, value.clone());
                }
            }
            row
        })
        .filter(is_auditable)
        .collect();

    let dropped = rows.len() - mapped.len();
    if dropped > 0 {
        log::debug!("mapping dropped {dropped} of {} rows without AWB or amount", rows.len());
    }
    mapped
}

/// Apply manual `FIELD=HEADER` corrections on top of a detected mapping.
/// Headers must exist in the invoice; field names are case-insensitive.
pub fn with_overrides<S: AsRef<str>>(
    mapping: ColumnMapping,
    overrides: &[S],
    headers: &[String],
) -> Result<ColumnMapping, AuditError> {
    overrides.iter().try_fold(mapping, |mapping, pair| {
        let pair = pair.as_ref();
        let (field, header) = pair
            .split_once('=')
            .ok_or_else(|| AuditError::UnknownField(pair.to_string()))?;
        let field: CanonicalField = field.parse()?;
        let header = header.trim();
        if !headers.iter().any(|h| h == header) {
            return Err(AuditError::UnknownHeader(header.to_string()));
        }
        Ok(mapping.with_override(field, header))
    })
}

fn is_auditable(row: &CanonicalRow) -> bool {
    let has = |field| row.get(field).is_some_and(|v| !v.is_blank());
    has(CanonicalField::Awb) && has(CanonicalField::TotalBilledAmount)
}
