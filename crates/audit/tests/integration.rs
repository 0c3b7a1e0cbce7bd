use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use shipaudit_audit::engine::prepare_grid;
use shipaudit_audit::history::{AuditHistory, AuditRecord};
use shipaudit_audit::mapping::with_overrides;
use shipaudit_audit::model::{CanonicalField, RawRow, RawValue};
use shipaudit_audit::regression::{points_from_shipments, WeightTracker};
use shipaudit_audit::{prepare_rows, ContractRules, MappingSource, MemoryStorage};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn read_fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

/// Fixtures are plain comma-separated with no quoting.
fn grid(name: &str) -> Vec<Vec<String>> {
    read_fixture(name)
        .lines()
        .map(|line| line.split(',').map(|c| c.to_string()).collect())
        .collect()
}

fn contract() -> ContractRules {
    ContractRules::from_toml(&read_fixture("standard.toml")).unwrap()
}

// -------------------------------------------------------------------------
// Messy carrier export
// -------------------------------------------------------------------------

#[test]
fn messy_export_end_to_end() {
    let prepared = prepare_grid(&grid("bluedart-march.csv"));
    assert_eq!(prepared.header_row, 2);
    assert!(matches!(prepared.source, MappingSource::Detected(_)));
    assert!(!prepared.source.needs_review());

    let run = prepared.audit(prepared.source.mapping(), &contract());
    assert_eq!(run.dropped_rows, 1);
    assert_eq!(run.result.total_rows, 6);
    assert!((run.result.total_billed - 1317.1).abs() < 1e-6);

    let issues: Vec<(&str, &str, f64)> = run
        .result
        .discrepancies
        .iter()
        .map(|d| (d.awb.as_str(), d.issue_type.as_str(), d.difference))
        .collect();
    assert_eq!(
        issues,
        vec![
            ("BD1001", "Zone Mismatch", 9.4),
            ("BD1002", "Rate Overcharge", 5.0),
            ("BD1003", "Weight Overcharge", 5.0),
        ]
    );
    assert_eq!(run.result.total_overcharge, 19.4);

    // Short destination pincode was dropped, the rest kept.
    let bd1003 = run.shipments.iter().find(|s| s.awb == "BD1003").unwrap();
    assert_eq!(bd1003.dest_pincode, None);
    assert_eq!(bd1003.origin_pincode.as_deref(), Some("110001"));
    assert_eq!(bd1003.actual_weight, 1.5);
}

#[test]
fn manual_override_changes_outcome() {
    let prepared = prepare_grid(&grid("bluedart-march.csv"));
    // Audit against the charged zone instead of the expected one.
    let mapping = with_overrides(
        prepared.source.mapping().clone(),
        &["ActualZone=Charged Zone", "BilledZone=Expected Zone"],
        &prepared.headers,
    )
    .unwrap();

    let run = prepared.audit(&mapping, &contract());
    let bd1001 = run.result.discrepancies.iter().find(|d| d.awb == "BD1001");
    // Zone B COD: 55 * 1.015 = 55.825 > 50, so no longer overbilled.
    assert!(bd1001.is_none());
}

// -------------------------------------------------------------------------
// Canonical input and extraction-style rows
// -------------------------------------------------------------------------

#[test]
fn canonical_export_uses_fast_path() {
    let prepared = prepare_grid(&grid("canonical.csv"));
    assert_eq!(prepared.header_row, 0);
    assert!(matches!(prepared.source, MappingSource::Canonical { .. }));

    let run = prepared.audit(prepared.source.mapping(), &contract());
    let labels: Vec<&str> = run
        .result
        .discrepancies
        .iter()
        .map(|d| d.issue_type.as_str())
        .collect();
    assert_eq!(labels, vec!["Rate Overcharge", "Zone Mismatch", "Invalid COD Charge"]);
    assert_eq!(run.result.total_overcharge, 16.65);
}

#[test]
fn keyed_rows_go_through_detection() {
    let headers = vec![
        "AWB No.".to_string(),
        "Order Type".to_string(),
        "Billed Weight".to_string(),
        "Actual Weight".to_string(),
        "Billed Zone".to_string(),
        "Actual Zone".to_string(),
        "Total Amount".to_string(),
    ];
    let row: RawRow = headers
        .iter()
        .cloned()
        .zip([
            RawValue::from("E-1"),
            RawValue::from("Prepaid"),
            RawValue::from(1.0),
            RawValue::from(1.0),
            RawValue::from("A"),
            RawValue::from("A"),
            RawValue::from(45.0),
        ])
        .collect();

    let prepared = prepare_rows(headers, vec![row], 0);
    assert_eq!(
        prepared.source.mapping().get(CanonicalField::Awb),
        Some("AWB No.")
    );
    let run = prepared.audit(prepared.source.mapping(), &contract());
    assert_eq!(run.result.discrepancies.len(), 1);
    assert_eq!(run.result.discrepancies[0].correct_amount, 40.0);
}

// -------------------------------------------------------------------------
// History + weight trend over a shared store
// -------------------------------------------------------------------------

#[test]
fn history_and_weights_share_one_store() {
    let prepared = prepare_grid(&grid("bluedart-march.csv"));
    let run = prepared.audit(prepared.source.mapping(), &contract());
    let at = Utc.with_ymd_and_hms(2024, 4, 2, 9, 30, 0).unwrap();

    let mut store = MemoryStorage::new();
    {
        let mut history = AuditHistory::new(&mut store);
        history.record(AuditRecord::from_result(&run.result, "BlueDart", "bluedart-march.csv", at));
    }
    {
        let mut weights = WeightTracker::new(&mut store);
        weights.append(points_from_shipments("BlueDart", &run.shipments, at));
    }

    let history = AuditHistory::new(&mut store);
    let records = history.load();
    assert_eq!(records.len(), 1);
    let by_type = records[0].overcharge_by_type;
    assert_eq!(by_type.zone, 9.4);
    assert_eq!(by_type.weight, 5.0);
    assert_eq!(by_type.other, 5.0);
    assert_eq!(records[0].discrepancy_count, 3);

    let weights = WeightTracker::new(&mut store);
    assert_eq!(weights.load().len(), 6);
    // Six points is not enough for a trend.
    assert!(weights.analyze("BlueDart").is_none());
}
