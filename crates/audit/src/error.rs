use std::fmt;

#[derive(Debug)]
pub enum AuditError {
    /// TOML / JSON parse error while reading a rate card.
    ContractParse(String),
    /// Rate card parsed but holds an unusable value.
    ContractValidation(String),
    /// A manual mapping override names a header the invoice does not have.
    UnknownHeader(String),
    /// A manual mapping override names a field that is not canonical.
    UnknownField(String),
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContractParse(msg) => write!(f, "contract parse error: {msg}"),
            Self::ContractValidation(msg) => write!(f, "contract validation error: {msg}"),
            Self::UnknownHeader(header) => write!(f, "no column named '{header}' in invoice"),
            Self::UnknownField(field) => write!(f, "unknown canonical field: {field}"),
        }
    }
}

impl std::error::Error for AuditError {}
