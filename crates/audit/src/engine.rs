use serde::Serialize;

use crate::contract::ContractRules;
use crate::header::{locate_header_row, rows_from_grid};
use crate::mapping::apply_mapping;
use crate::matcher::{detect_columns, identity_mapping, is_canonical};
use crate::model::{
    round2, AnalysisResult, CanonicalRow, ColumnMapping, DetectionResult, Discrepancy, OrderType,
    RawRow, Shipment,
};
use crate::normalize::{normalize_row, to_shipment};

/// Differences at or below this amount are billing noise, not overcharges.
pub const TOLERANCE: f64 = 1.0;

pub const LABEL_ZONE_MISMATCH: &str = "Zone Mismatch";
pub const LABEL_WEIGHT_OVERCHARGE: &str = "Weight Overcharge";
/// Prepaid row overbilled with evidence of a COD fee: a reported COD amount,
/// or a total matching freight plus the COD percentage. Without that
/// evidence the row reads as a rate overcharge.
pub const LABEL_INVALID_COD: &str = "Invalid COD Charge";
pub const LABEL_RATE_OVERCHARGE: &str = "Rate Overcharge";

/// Evaluate every shipment against the rate card.
pub fn analyze(shipments: &[Shipment], contract: &ContractRules) -> AnalysisResult {
    let mut discrepancies = Vec::new();
    let mut total_billed = 0.0;

    for s in shipments {
        total_billed += s.total_billed_amount;

        // The rate follows the true zone; the carrier bills by billed weight.
        let Some(actual_zone) = s.actual_zone else {
            log::debug!("{}: no usable actual zone, skipped", s.awb);
            continue;
        };
        let expected_freight = contract.base_rate(actual_zone) * s.billed_weight;
        let expected_total = if s.order_type == OrderType::Cod {
            expected_freight * (1.0 + contract.cod_fee_percentage / 100.0)
        } else {
            expected_freight
        };

        // Compare in whole paise so 1.00 over stays clean.
        let difference = round2(s.total_billed_amount - expected_total);
        if difference <= TOLERANCE {
            continue;
        }

        let mut labels = Vec::new();
        if s.billed_zone != s.actual_zone {
            labels.push(LABEL_ZONE_MISMATCH);
        }
        if s.billed_weight > s.actual_weight {
            labels.push(LABEL_WEIGHT_OVERCHARGE);
        }
        if s.order_type == OrderType::Prepaid
            && round2(s.total_billed_amount - expected_freight) > TOLERANCE
            && carries_cod_fee(s, expected_freight, contract)
        {
            labels.push(LABEL_INVALID_COD);
        }
        if labels.is_empty() {
            labels.push(LABEL_RATE_OVERCHARGE);
        }

        discrepancies.push(Discrepancy {
            awb: s.awb.clone(),
            issue_type: labels.join(", "),
            billed_amount: s.total_billed_amount,
            correct_amount: round2(expected_total),
            difference,
        });
    }

    let total_overcharge = round2(discrepancies.iter().map(|d| d.difference).sum());

    AnalysisResult {
        discrepancies,
        total_overcharge,
        total_rows: shipments.len(),
        total_billed,
    }
}

/// Evidence that a COD fee landed on the bill: a COD amount was reported,
/// or the billed total matches freight plus the COD percentage.
fn carries_cod_fee(s: &Shipment, expected_freight: f64, contract: &ContractRules) -> bool {
    let with_fee = expected_freight * (1.0 + contract.cod_fee_percentage / 100.0);
    s.cod_amount.is_some_and(|c| c > 0.0) || (s.total_billed_amount - with_fee).abs() <= TOLERANCE
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// How the column mapping was obtained.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingSource {
    /// Headers already use canonical names.
    Canonical { mapping: ColumnMapping },
    /// Headers were fuzzy-matched.
    Detected(DetectionResult),
}

impl MappingSource {
    pub fn mapping(&self) -> &ColumnMapping {
        match self {
            Self::Canonical { mapping } => mapping,
            Self::Detected(d) => &d.mapping,
        }
    }

    pub fn needs_review(&self) -> bool {
        match self {
            Self::Canonical { .. } => false,
            Self::Detected(d) => d.needs_review,
        }
    }
}

/// An invoice whose header row and columns are located but not yet audited.
#[derive(Debug, Clone)]
pub struct PreparedInvoice {
    pub header_row: usize,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    pub source: MappingSource,
}

/// Output of one audit over a prepared invoice.
#[derive(Debug, Clone)]
pub struct AuditRun {
    pub canonical_rows: Vec<CanonicalRow>,
    pub shipments: Vec<Shipment>,
    pub result: AnalysisResult,
    /// Raw rows discarded for missing AWB or billed amount.
    pub dropped_rows: usize,
}

/// Locate headers in a raw grid and work out the column mapping.
pub fn prepare_grid<S: AsRef<str>>(grid: &[Vec<S>]) -> PreparedInvoice {
    let header_row = locate_header_row(grid);
    let (headers, rows) = rows_from_grid(grid, header_row);
    log::debug!(
        "header row {header_row}: {} columns, {} data rows",
        headers.len(),
        rows.len()
    );
    prepare_rows(headers, rows, header_row)
}

/// Work out the column mapping for rows that already carry header keys
/// (for example, records returned by an extraction service).
pub fn prepare_rows(headers: Vec<String>, rows: Vec<RawRow>, header_row: usize) -> PreparedInvoice {
    let source = if is_canonical(&headers) {
        MappingSource::Canonical {
            mapping: identity_mapping(&headers),
        }
    } else {
        MappingSource::Detected(detect_columns(&headers))
    };
    PreparedInvoice {
        header_row,
        headers,
        rows,
        source,
    }
}

impl PreparedInvoice {
    /// Map, normalize and analyze with a confirmed mapping.
    pub fn audit(&self, mapping: &ColumnMapping, contract: &ContractRules) -> AuditRun {
        let canonical_rows: Vec<CanonicalRow> = apply_mapping(&self.rows, mapping)
            .into_iter()
            .map(normalize_row)
            .collect();
        let shipments: Vec<Shipment> = canonical_rows.iter().map(to_shipment).collect();
        let result = analyze(&shipments, contract);

        log::debug!(
            "audited {} shipments: {} discrepancies, overcharge {:.2}",
            result.total_rows,
            result.discrepancies.len(),
            result.total_overcharge
        );

        AuditRun {
            dropped_rows: self.rows.len() - canonical_rows.len(),
            canonical_rows,
            shipments,
            result,
        }
    }
}
