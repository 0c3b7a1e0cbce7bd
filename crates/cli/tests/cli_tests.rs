// CLI integration tests for the shipaudit binary.
// Every run gets its own settings file and data directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_shipaudit"))
            .args(args)
            .env("SHIPAUDIT_CONFIG", self.path().join("settings.json"))
            .env("SHIPAUDIT_DATA_DIR", self.path().join("data"))
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to run shipaudit")
    }
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn json(out: &Output) -> serde_json::Value {
    serde_json::from_slice(&out.stdout)
        .unwrap_or_else(|e| panic!("stdout is not JSON ({e}):\n{}", stdout(out)))
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

// ============================================================================
// audit
// ============================================================================

#[test]
fn audit_with_discrepancies_exits_1() {
    let sb = Sandbox::new();
    let invoice = fixture("bluedart-march.csv");
    let out = sb.run(&["audit", path_str(&invoice), "--preset", "standard"]);

    assert_eq!(out.status.code(), Some(1), "stderr: {}", stderr(&out));
    let table = stdout(&out);
    assert!(table.contains("BD1001"));
    assert!(table.contains("Zone Mismatch"));
    assert!(table.contains("BD1003"));
    assert!(!table.contains("BD1004"));
    assert!(stderr(&out).contains("discrepancies found"));
}

#[test]
fn clean_invoice_exits_0() {
    let sb = Sandbox::new();
    let invoice = fixture("clean.csv");
    let rates = fixture("rates.toml");
    let out = sb.run(&["audit", path_str(&invoice), "--contract", path_str(&rates)]);

    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(stdout(&out).is_empty());
    assert!(stderr(&out).contains("3 rows audited"));
}

#[test]
fn audit_json_is_one_document() {
    let sb = Sandbox::new();
    let invoice = fixture("bluedart-march.csv");
    let out = sb.run(&[
        "audit",
        path_str(&invoice),
        "--preset",
        "standard",
        "--provider",
        "BlueDart",
        "--json",
    ]);

    assert_eq!(out.status.code(), Some(1));
    let report = json(&out);
    assert_eq!(report["file"], "bluedart-march.csv");
    assert_eq!(report["provider"], "BlueDart");
    assert_eq!(report["contract"], "preset:standard");
    assert_eq!(report["header_row"], 2);
    assert_eq!(report["dropped_rows"], 1);
    assert_eq!(report["total_rows"], 6);
    assert_eq!(report["total_overcharge"], 19.4);
    assert_eq!(report["discrepancies"].as_array().unwrap().len(), 3);
    assert_eq!(report["mapping"]["ActualZone"], "Expected Zone");
    assert_eq!(report["overcharge_by_type"]["zone"], 9.4);
}

#[test]
fn output_file_receives_report() {
    let sb = Sandbox::new();
    let invoice = fixture("clean.csv");
    let report_path = sb.path().join("report.json");
    let out = sb.run(&[
        "audit",
        path_str(&invoice),
        "--output",
        path_str(&report_path),
    ]);

    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(written["total_rows"], 3);
    assert_eq!(written["discrepancies"], serde_json::json!([]));
}

#[test]
fn doubtful_mapping_needs_review() {
    let sb = Sandbox::new();
    let invoice = fixture("unlabelled-zone.csv");
    let out = sb.run(&["audit", path_str(&invoice)]);

    assert_eq!(out.status.code(), Some(10));
    let err = stderr(&out);
    assert!(err.contains("needs review"));
    assert!(err.contains("ActualZone"));
    assert!(err.contains("--map"));
}

#[test]
fn allow_review_audits_anyway() {
    let sb = Sandbox::new();
    let invoice = fixture("unlabelled-zone.csv");
    let out = sb.run(&["audit", path_str(&invoice), "--allow-review"]);

    // Without a true zone no row can be checked.
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(stderr(&out).contains("2 rows audited"));
}

#[test]
fn map_override_resolves_review() {
    let sb = Sandbox::new();
    let invoice = fixture("unlabelled-zone.csv");
    let out = sb.run(&["audit", path_str(&invoice), "--map", "ActualZone=Z2", "--json"]);

    assert_eq!(out.status.code(), Some(1), "stderr: {}", stderr(&out));
    let report = json(&out);
    let issues = report["discrepancies"].as_array().unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0]["awb"], "U2");
    assert_eq!(issues[0]["issue_type"], "Zone Mismatch");
}

#[test]
fn map_to_missing_column_is_usage_error() {
    let sb = Sandbox::new();
    let invoice = fixture("unlabelled-zone.csv");
    let out = sb.run(&["audit", path_str(&invoice), "--map", "ActualZone=Delivery Zone"]);

    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("invoice columns:"));
}

#[test]
fn unknown_preset_lists_choices() {
    let sb = Sandbox::new();
    let invoice = fixture("clean.csv");
    let out = sb.run(&["audit", path_str(&invoice), "--preset", "overnight"]);

    assert_eq!(out.status.code(), Some(2));
    let err = stderr(&out);
    assert!(err.contains("unknown preset"));
    assert!(err.contains("economy"));
}

// ============================================================================
// input errors
// ============================================================================

#[test]
fn missing_invoice_exits_3() {
    let sb = Sandbox::new();
    let missing = sb.path().join("nope.csv");
    let out = sb.run(&["audit", path_str(&missing)]);
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn unsupported_extension_exits_4() {
    let sb = Sandbox::new();
    let invoice = sb.path().join("invoice.pdf");
    std::fs::write(&invoice, b"%PDF-1.4").unwrap();
    let out = sb.run(&["audit", path_str(&invoice)]);

    assert_eq!(out.status.code(), Some(4));
    assert!(stderr(&out).contains("supported:"));
}

#[test]
fn blank_invoice_exits_4() {
    let sb = Sandbox::new();
    let invoice = sb.path().join("blank.csv");
    std::fs::write(&invoice, "\n,,\n\n").unwrap();
    let out = sb.run(&["audit", path_str(&invoice)]);
    assert_eq!(out.status.code(), Some(4));
}

// ============================================================================
// detect
// ============================================================================

#[test]
fn detect_reports_mapping() {
    let sb = Sandbox::new();
    let invoice = fixture("bluedart-march.csv");
    let out = sb.run(&["detect", path_str(&invoice), "--json"]);

    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let report = json(&out);
    assert_eq!(report["header_row"], 2);
    assert_eq!(report["kind"], "detected");
    assert_eq!(report["mapping"]["AWB"], "Waybill Number");
    assert_eq!(report["mapping"]["ActualZone"], "Expected Zone");
    assert_eq!(report["low_confidence"], serde_json::json!([]));
}

#[test]
fn detect_table_flags_review() {
    let sb = Sandbox::new();
    let invoice = fixture("unlabelled-zone.csv");
    let out = sb.run(&["detect", path_str(&invoice)]);

    assert_eq!(out.status.code(), Some(0));
    let table = stdout(&out);
    let zone_line = table.lines().find(|l| l.starts_with("ActualZone")).unwrap();
    assert!(zone_line.contains("review"));
    assert!(stderr(&out).contains("needs review"));
}

// ============================================================================
// contract & presets
// ============================================================================

#[test]
fn contract_validate_accepts_good_card() {
    let sb = Sandbox::new();
    let rates = fixture("rates.toml");
    let out = sb.run(&["contract", "validate", path_str(&rates)]);

    assert_eq!(out.status.code(), Some(0));
    assert!(stderr(&out).contains("40/55/75"));
}

#[test]
fn contract_validate_rejects_negative_rate() {
    let sb = Sandbox::new();
    let rates = fixture("negative-rates.toml");
    let out = sb.run(&["contract", "validate", path_str(&rates)]);

    assert_eq!(out.status.code(), Some(5));
    assert!(stderr(&out).contains("zone_b_rate"));
}

#[test]
fn json_contract_is_accepted() {
    let sb = Sandbox::new();
    let rates = sb.path().join("rates.json");
    std::fs::write(
        &rates,
        r#"{"zone_a_rate": 40, "zone_b_rate": 55, "zone_c_rate": 75, "cod_fee_percentage": 1.5}"#,
    )
    .unwrap();
    let invoice = fixture("clean.csv");
    let out = sb.run(&["audit", path_str(&invoice), "--contract", path_str(&rates)]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
}

#[test]
fn presets_json_lists_builtin_cards() {
    let sb = Sandbox::new();
    let out = sb.run(&["presets", "--json"]);

    assert_eq!(out.status.code(), Some(0));
    let list = json(&out);
    let names: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["standard", "economy", "express"]);
    assert_eq!(list[0]["zone_a_rate"], 40.0);
}

// ============================================================================
// history & trend
// ============================================================================

#[test]
fn audits_are_recorded_and_cleared() {
    let sb = Sandbox::new();
    let messy = fixture("bluedart-march.csv");
    let clean = fixture("clean.csv");

    sb.run(&["audit", path_str(&messy), "--provider", "BlueDart"]);
    sb.run(&["audit", path_str(&clean), "--provider", "BlueDart"]);
    sb.run(&["audit", path_str(&clean), "--provider", "Delhivery", "--no-history"]);

    let out = sb.run(&["history", "--json"]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let records = json(&out);
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["file_name"], "bluedart-march.csv");
    assert_eq!(records[0]["total_overcharge"], 19.4);

    let out = sb.run(&["history", "--by-provider", "--json"]);
    let summaries = json(&out);
    assert_eq!(summaries.as_array().unwrap().len(), 1);
    assert_eq!(summaries[0]["provider"], "BlueDart");
    assert_eq!(summaries[0]["runs"], 2);

    let out = sb.run(&["history", "clear"]);
    assert_eq!(out.status.code(), Some(0));
    let out = sb.run(&["history", "--json"]);
    assert_eq!(json(&out), serde_json::json!([]));

    // Weight data survives a plain clear.
    let out = sb.run(&["trend", "--json"]);
    assert_eq!(json(&out).as_array().unwrap().len(), 1);
}

#[test]
fn trend_needs_enough_points() {
    let sb = Sandbox::new();
    let invoice = fixture("bluedart-march.csv");
    sb.run(&["audit", path_str(&invoice), "--provider", "BlueDart"]);

    let out = sb.run(&["trend", "BlueDart", "--json"]);
    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let reports = json(&out);
    assert_eq!(reports[0]["provider"], "BlueDart");
    assert_eq!(reports[0]["points"], 6);
    assert!(reports[0]["regression"].is_null());
    assert_eq!(reports[0]["systematic_inflation"], false);

    let out = sb.run(&["trend", "BlueDart"]);
    assert!(stdout(&out).contains("not enough for a trend"));

    let out = sb.run(&["trend", "Nobody"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn history_clear_weights_empties_trend() {
    let sb = Sandbox::new();
    let invoice = fixture("clean.csv");
    sb.run(&["audit", path_str(&invoice)]);

    sb.run(&["history", "clear", "--weights"]);
    let out = sb.run(&["trend", "--json"]);
    assert_eq!(json(&out), serde_json::json!([]));
}

#[test]
fn disabled_history_setting_is_honored() {
    let sb = Sandbox::new();
    std::fs::write(
        sb.path().join("settings.json"),
        r#"{ "audit.recordHistory": false }"#,
    )
    .unwrap();
    let invoice = fixture("clean.csv");
    sb.run(&["audit", path_str(&invoice)]);

    let out = sb.run(&["history", "--json"]);
    assert_eq!(json(&out), serde_json::json!([]));
}
