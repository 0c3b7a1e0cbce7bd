//! Per-field value normalization.
//!
//! All functions here are total: unparseable input degrades to a default
//! (0 for numbers, absent for pincodes) instead of failing the row.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{CanonicalField, CanonicalRow, OrderType, RawValue, Shipment, Zone};

static WEIGHT_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([0-9]*\.?[0-9]+)\s*(grams|gram|g|kgs|kg)$").expect("valid weight regex")
});

static CURRENCY_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)rs\.?|inr|[₹$€£,\s]").expect("valid currency regex"));

/// Weight in kilograms. Negative readings clamp to 0.
pub fn normalize_weight(value: &RawValue) -> f64 {
    let kg = match value {
        RawValue::Number(n) => *n,
        RawValue::Empty => 0.0,
        RawValue::Text(s) => {
            let s = s.trim();
            match WEIGHT_UNIT.captures(s) {
                Some(caps) => {
                    let n: f64 = caps[1].parse().unwrap_or(0.0);
                    if caps[2].to_ascii_lowercase().starts_with('k') {
                        n
                    } else {
                        n / 1000.0
                    }
                }
                None => s.parse().unwrap_or(0.0),
            }
        }
    };
    if kg.is_finite() && kg > 0.0 {
        kg
    } else {
        0.0
    }
}

/// Money amount with currency symbols, thousands separators and spaces removed.
pub fn normalize_amount(value: &RawValue) -> f64 {
    let n = match value {
        RawValue::Number(n) => *n,
        RawValue::Empty => 0.0,
        RawValue::Text(s) => CURRENCY_NOISE.replace_all(s, "").parse().unwrap_or(0.0),
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Six-digit postal code, or `None` when the value cannot be one.
pub fn normalize_pincode(value: &RawValue) -> Option<String> {
    let text = value.as_text()?;
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() == 6 && compact.chars().all(|c| c.is_ascii_digit()) {
        Some(compact)
    } else {
        None
    }
}

/// Accepts `A`, `b`, `Zone C`, `zone-a`.
pub fn normalize_zone(value: &RawValue) -> Option<Zone> {
    let text = value.as_text()?.to_lowercase();
    let stripped: String = text
        .trim_start_matches("zone")
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect();
    match stripped.as_str() {
        "a" => Some(Zone::A),
        "b" => Some(Zone::B),
        "c" => Some(Zone::C),
        _ => None,
    }
}

pub fn normalize_order_type(value: &RawValue) -> OrderType {
    let Some(text) = value.as_text() else {
        return OrderType::Other(String::new());
    };
    let lower = text.to_lowercase();
    let squashed: String = lower.chars().filter(|c| c.is_alphanumeric()).collect();
    match squashed.as_str() {
        "cod" | "cashondelivery" | "codorder" => OrderType::Cod,
        "prepaid" | "ppd" | "prepaidorder" | "online" => OrderType::Prepaid,
        "rto" | "returntoorigin" | "return" => OrderType::Rto,
        _ => OrderType::Other(text.into_owned()),
    }
}

fn optional_number(row: &CanonicalRow, field: CanonicalField) -> Option<f64> {
    row.get(field)
        .filter(|v| !v.is_blank())
        .map(normalize_amount)
}

/// Normalize the recognized fields of a row in place. Invalid pincodes are
/// removed rather than blanked so "not provided" stays detectable by key
/// absence; fields without a normalizer are left as they are.
pub fn normalize_row(mut row: CanonicalRow) -> CanonicalRow {
    for field in [CanonicalField::BilledWeight, CanonicalField::ActualWeight] {
        if let Some(v) = row.get(field) {
            let kg = normalize_weight(v);
            row.insert(field, kg);
        }
    }
    for field in [CanonicalField::TotalBilledAmount, CanonicalField::CodAmount] {
        if let Some(v) = row.get(field) {
            let amount = normalize_amount(v);
            row.insert(field, amount);
        }
    }
    for field in [CanonicalField::OriginPincode, CanonicalField::DestPincode] {
        if let Some(v) = row.get(field) {
            match normalize_pincode(v) {
                Some(pin) => row.insert(field, RawValue::Text(pin)),
                None => {
                    row.fields.remove(&field);
                }
            }
        }
    }
    row
}

/// Typed view of a normalized row.
pub fn to_shipment(row: &CanonicalRow) -> Shipment {
    let text = |field| row.get(field).and_then(|v| v.as_text()).map(|t| t.into_owned());
    let weight = |field| row.get(field).map(normalize_weight).unwrap_or(0.0);

    Shipment {
        awb: text(CanonicalField::Awb).unwrap_or_default(),
        order_type: row
            .get(CanonicalField::OrderType)
            .map(normalize_order_type)
            .unwrap_or(OrderType::Other(String::new())),
        billed_weight: weight(CanonicalField::BilledWeight),
        actual_weight: weight(CanonicalField::ActualWeight),
        billed_zone: row.get(CanonicalField::BilledZone).and_then(normalize_zone),
        actual_zone: row.get(CanonicalField::ActualZone).and_then(normalize_zone),
        total_billed_amount: row
            .get(CanonicalField::TotalBilledAmount)
            .map(normalize_amount)
            .unwrap_or(0.0),
        length: optional_number(row, CanonicalField::Length),
        width: optional_number(row, CanonicalField::Width),
        height: optional_number(row, CanonicalField::Height),
        origin_pincode: row.get(CanonicalField::OriginPincode).and_then(normalize_pincode),
        dest_pincode: row.get(CanonicalField::DestPincode).and_then(normalize_pincode),
        cod_amount: optional_number(row, CanonicalField::CodAmount),
        shipment_date: text(CanonicalField::ShipmentDate),
    }
}
