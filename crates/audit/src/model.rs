use std::borrow::Cow;
use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuditError;

// ---------------------------------------------------------------------------
// Raw input
// ---------------------------------------------------------------------------

/// An untyped cell value as it came out of a file or an extraction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Empty,
}

impl RawValue {
    /// Build from a grid cell. Blank cells become `Empty`; everything else
    /// stays text so the normalizer decides how to read it.
    pub fn from_cell(cell: &str) -> Self {
        if cell.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(cell.to_string())
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(n) => !n.is_finite(),
        }
    }

    /// Textual form of the value, trimmed. Whole numbers print without a
    /// fractional part (pincodes and AWBs often arrive as spreadsheet numbers).
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Self::Empty => None,
            Self::Text(s) => {
                let t = s.trim();
                if t.is_empty() {
                    None
                } else {
                    Some(Cow::Borrowed(t))
                }
            }
            Self::Number(n) if !n.is_finite() => None,
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(Cow::Owned(format!("{}", *n as i64)))
            }
            Self::Number(n) => Some(Cow::Owned(n.to_string())),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// One invoice row keyed by whatever header strings the file used.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow {
    pub cells: BTreeMap<String, RawValue>,
}

impl RawRow {
    pub fn get(&self, header: &str) -> Option<&RawValue> {
        self.cells.get(header)
    }
}

impl<K: Into<String>, V: Into<RawValue>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical fields
// ---------------------------------------------------------------------------

/// The fixed set of fields the audit understands. Declaration order is the
/// assignment priority used by the column matcher: required fields first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanonicalField {
    #[serde(rename = "AWB")]
    Awb,
    TotalBilledAmount,
    OrderType,
    BilledWeight,
    ActualWeight,
    BilledZone,
    ActualZone,
    Length,
    Width,
    Height,
    OriginPincode,
    DestPincode,
    #[serde(rename = "CODAmount")]
    CodAmount,
    ShipmentDate,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 14] = [
        Self::Awb,
        Self::TotalBilledAmount,
        Self::OrderType,
        Self::BilledWeight,
        Self::ActualWeight,
        Self::BilledZone,
        Self::ActualZone,
        Self::Length,
        Self::Width,
        Self::Height,
        Self::OriginPincode,
        Self::DestPincode,
        Self::CodAmount,
        Self::ShipmentDate,
    ];

    /// Header string used for canonical (already-mapped) invoices.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Awb => "AWB",
            Self::TotalBilledAmount => "TotalBilledAmount",
            Self::OrderType => "OrderType",
            Self::BilledWeight => "BilledWeight",
            Self::ActualWeight => "ActualWeight",
            Self::BilledZone => "BilledZone",
            Self::ActualZone => "ActualZone",
            Self::Length => "Length",
            Self::Width => "Width",
            Self::Height => "Height",
            Self::OriginPincode => "OriginPincode",
            Self::DestPincode => "DestPincode",
            Self::CodAmount => "CODAmount",
            Self::ShipmentDate => "ShipmentDate",
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(
            self,
            Self::Awb
                | Self::TotalBilledAmount
                | Self::OrderType
                | Self::BilledWeight
                | Self::ActualWeight
                | Self::BilledZone
                | Self::ActualZone
        )
    }

    pub fn required() -> impl Iterator<Item = CanonicalField> {
        Self::ALL.into_iter().filter(|f| f.is_required())
    }
}

impl std::fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CanonicalField {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AuditError::UnknownField(wanted.to_string()))
    }
}

/// A row projected onto canonical field names. Values are still raw; the
/// normalizer turns this into a [`Shipment`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalRow {
    pub fields: BTreeMap<CanonicalField, RawValue>,
}

impl CanonicalRow {
    pub fn get(&self, field: CanonicalField) -> Option<&RawValue> {
        self.fields.get(&field)
    }

    pub fn insert(&mut self, field: CanonicalField, value: impl Into<RawValue>) {
        self.fields.insert(field, value.into());
    }

    pub fn contains(&self, field: CanonicalField) -> bool {
        self.fields.contains_key(&field)
    }
}

// ---------------------------------------------------------------------------
// Column mapping + detection
// ---------------------------------------------------------------------------

/// Canonical field -> raw header. `None` means the field is not mapped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnMapping {
    pub fields: BTreeMap<CanonicalField, Option<String>>,
}

impl ColumnMapping {
    pub fn get(&self, field: CanonicalField) -> Option<&str> {
        self.fields.get(&field).and_then(|h| h.as_deref())
    }

    pub fn set(&mut self, field: CanonicalField, header: Option<String>) {
        self.fields.insert(field, header);
    }

    /// Pin `field` to `header`. Any other field holding the same header
    /// loses it, so a header still maps to at most one field.
    pub fn with_override(mut self, field: CanonicalField, header: &str) -> Self {
        for (other, mapped) in self.fields.iter_mut() {
            if *other != field && mapped.as_deref() == Some(header) {
                *mapped = None;
            }
        }
        self.fields.insert(field, Some(header.to_string()));
        self
    }

    /// Mapped (field, header) pairs in priority order.
    pub fn mapped(&self) -> impl Iterator<Item = (CanonicalField, &str)> {
        self.fields
            .iter()
            .filter_map(|(f, h)| h.as_deref().map(|h| (*f, h)))
    }

    pub fn unmapped_required(&self) -> Vec<CanonicalField> {
        CanonicalField::required()
            .filter(|f| self.get(*f).is_none())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DetectionResult {
    pub mapping: ColumnMapping,
    pub confidence: BTreeMap<CanonicalField, f64>,
    /// Required fields that are unmapped or mapped below the review threshold.
    pub low_confidence: Vec<CanonicalField>,
    pub needs_review: bool,
}

// ---------------------------------------------------------------------------
// Normalized shipment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Zone {
    A,
    B,
    C,
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
            Self::C => write!(f, "C"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderType {
    Cod,
    Prepaid,
    Rto,
    Other(String),
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cod => write!(f, "COD"),
            Self::Prepaid => write!(f, "Prepaid"),
            Self::Rto => write!(f, "RTO"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A fully normalized invoice line. Weights are kilograms.
#[derive(Debug, Clone, PartialEq)]
pub struct Shipment {
    pub awb: String,
    pub order_type: OrderType,
    pub billed_weight: f64,
    pub actual_weight: f64,
    pub billed_zone: Option<Zone>,
    pub actual_zone: Option<Zone>,
    pub total_billed_amount: f64,
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub origin_pincode: Option<String>,
    pub dest_pincode: Option<String>,
    pub cod_amount: Option<f64>,
    pub shipment_date: Option<String>,
}

// ---------------------------------------------------------------------------
// Engine output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub awb: String,
    /// Issue labels joined with ", ".
    pub issue_type: String,
    pub billed_amount: f64,
    pub correct_amount: f64,
    pub difference: f64,
}

impl Discrepancy {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.issue_type
            .split(',')
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub discrepancies: Vec<Discrepancy>,
    pub total_overcharge: f64,
    pub total_rows: usize,
    pub total_billed: f64,
}

/// Round half away from zero to two decimals.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Round half away from zero to four decimals.
pub fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
