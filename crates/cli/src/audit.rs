//! `shipaudit audit` and `shipaudit detect`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use clap::Args;
use serde::Serialize;
use shipaudit_audit::history::{categorize, OverchargeByType};
use shipaudit_audit::mapping::with_overrides;
use shipaudit_audit::model::{AnalysisResult, CanonicalField, ColumnMapping};
use shipaudit_audit::regression::points_from_shipments;
use shipaudit_audit::{AuditHistory, AuditRecord, AuditRun, MappingSource, PreparedInvoice, WeightTracker};
use shipaudit_config::Settings;
use shipaudit_io::load_invoice;

use crate::contract::resolve_contract;
use crate::exit_codes::{EXIT_DISCREPANCIES, EXIT_NEEDS_REVIEW};
use crate::{emit_json, open_store, CliError};

#[derive(Args)]
pub struct AuditArgs {
    /// Invoice file (csv, tsv, txt, xlsx, xls, xlsm, xlsb, ods, json)
    pub invoice: PathBuf,

    /// Rate card file (.toml or .json)
    #[arg(long, conflicts_with = "preset")]
    pub contract: Option<PathBuf>,

    /// Built-in rate card (see `shipaudit presets`)
    #[arg(long)]
    pub preset: Option<String>,

    /// Provider name recorded in history (default: audit.defaultProvider)
    #[arg(long)]
    pub provider: Option<String>,

    /// Pin a canonical field to an invoice column. Repeatable.
    /// Example: --map ActualZone='Expected Zone'
    #[arg(long = "map", value_name = "FIELD=HEADER")]
    pub maps: Vec<String>,

    /// Output JSON to stdout instead of the discrepancy table
    #[arg(long)]
    pub json: bool,

    /// Write JSON report to file
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Do not record this run in history or weight data
    #[arg(long)]
    pub no_history: bool,

    /// Audit even when column detection wants a manual review
    #[arg(long)]
    pub allow_review: bool,
}

#[derive(Serialize)]
struct AuditReport<'a> {
    file: String,
    provider: &'a str,
    contract: &'a str,
    header_row: usize,
    mapping: &'a ColumnMapping,
    dropped_rows: usize,
    overcharge_by_type: OverchargeByType,
    #[serde(flatten)]
    result: &'a AnalysisResult,
}

#[derive(Serialize)]
struct DetectReport<'a> {
    file: String,
    header_row: usize,
    headers: &'a [String],
    #[serde(flatten)]
    source: &'a MappingSource,
}

fn prepare(path: &Path) -> Result<PreparedInvoice, CliError> {
    let source = load_invoice(path).map_err(CliError::input)?;
    Ok(source.prepare())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Required fields still in doubt after manual overrides.
fn unresolved_fields(source: &MappingSource, mapping: &ColumnMapping, maps: &[String]) -> Vec<CanonicalField> {
    let overridden: Vec<CanonicalField> = maps
        .iter()
        .filter_map(|m| m.split_once('=').and_then(|(f, _)| f.parse().ok()))
        .collect();

    let mut fields: Vec<CanonicalField> = match source {
        MappingSource::Detected(d) => d
            .low_confidence
            .iter()
            .copied()
            .filter(|f| !overridden.contains(f))
            .collect(),
        MappingSource::Canonical { .. } => Vec::new(),
    };
    for f in mapping.unmapped_required() {
        if !fields.contains(&f) {
            fields.push(f);
        }
    }
    fields.sort();
    fields
}

pub fn cmd_audit(args: AuditArgs, settings: &Settings) -> Result<(), CliError> {
    let (contract, contract_label) =
        resolve_contract(args.contract.as_deref(), args.preset.as_deref(), settings)?;
    let provider = args
        .provider
        .clone()
        .unwrap_or_else(|| settings.default_provider.clone());

    let prepared = prepare(&args.invoice)?;
    let mapping = with_overrides(prepared.source.mapping().clone(), &args.maps, &prepared.headers)
        .map_err(|e| {
            CliError::args(e.to_string())
                .with_hint(format!("invoice columns: {}", prepared.headers.join(", ")))
        })?;

    let unresolved = unresolved_fields(&prepared.source, &mapping, &args.maps);
    if !unresolved.is_empty() {
        let names: Vec<&str> = unresolved.iter().map(|f| f.name()).collect();
        if !args.allow_review {
            return Err(CliError::new(
                EXIT_NEEDS_REVIEW,
                format!("column mapping needs review: {}", names.join(", ")),
            )
            .with_hint("confirm with --map FIELD=HEADER (see `shipaudit detect`) or pass --allow-review"));
        }
        log::warn!("auditing with unconfirmed columns: {}", names.join(", "));
    }

    let run = prepared.audit(&mapping, &contract);
    let file = file_name(&args.invoice);

    let report = AuditReport {
        file: file.clone(),
        provider: &provider,
        contract: &contract_label,
        header_row: prepared.header_row,
        mapping: &mapping,
        dropped_rows: run.dropped_rows,
        overcharge_by_type: categorize(&run.result),
        result: &run.result,
    };

    if args.json || args.output.is_some() {
        emit_json(&report, args.json, args.output.as_ref())?;
    }
    if !args.json {
        print_discrepancies(&run.result);
    }

    // Human summary to stderr
    let r = &run.result;
    eprintln!(
        "{}: {} rows audited ({} dropped), {} discrepancies, overcharge {:.2} of {:.2} billed",
        file,
        r.total_rows,
        run.dropped_rows,
        r.discrepancies.len(),
        r.total_overcharge,
        r.total_billed,
    );

    if !args.no_history && settings.record_history {
        persist_run(&run, &provider, &file, settings);
    }

    if !run.result.discrepancies.is_empty() {
        return Err(CliError::new(EXIT_DISCREPANCIES, "discrepancies found"));
    }
    Ok(())
}

fn print_discrepancies(result: &AnalysisResult) {
    if result.discrepancies.is_empty() {
        return;
    }
    println!("{:<20} {:>10} {:>10} {:>10}  ISSUE", "AWB", "BILLED", "CORRECT", "DIFF");
    for d in &result.discrepancies {
        println!(
            "{:<20} {:>10.2} {:>10.2} {:>10.2}  {}",
            d.awb, d.billed_amount, d.correct_amount, d.difference, d.issue_type
        );
    }
}

/// Record history and weight points. Best effort: the audit result
/// stands even when the store is unavailable.
fn persist_run(run: &AuditRun, provider: &str, file: &str, settings: &Settings) {
    let mut store = match open_store(settings) {
        Ok(s) => s,
        Err(e) => {
            log::warn!("history not recorded: {}", e.message);
            return;
        }
    };
    let now = Utc::now();

    let mut history = AuditHistory::new(&mut store);
    history.record(AuditRecord::from_result(&run.result, provider, file, now));

    let mut weights = WeightTracker::new(&mut store);
    weights.append(points_from_shipments(provider, &run.shipments, now));
}

pub fn cmd_detect(invoice: PathBuf, json: bool) -> Result<(), CliError> {
    let prepared = prepare(&invoice)?;

    if json {
        let report = DetectReport {
            file: file_name(&invoice),
            header_row: prepared.header_row,
            headers: &prepared.headers,
            source: &prepared.source,
        };
        return emit_json(&report, true, None);
    }

    println!("header row: {} (0-based)", prepared.header_row);
    let mapping = prepared.source.mapping();
    let (confidence, low) = match &prepared.source {
        MappingSource::Canonical { .. } => {
            println!("headers are canonical; detection skipped");
            (None, Vec::new())
        }
        MappingSource::Detected(d) => (Some(&d.confidence), d.low_confidence.clone()),
    };

    println!("{:<18} {:<30} {:>6}", "FIELD", "COLUMN", "SCORE");
    for field in CanonicalField::ALL {
        let column = mapping.get(field).unwrap_or("-");
        let score = confidence
            .and_then(|c| c.get(&field))
            .map(|s| format!("{s:.2}"))
            .unwrap_or_else(|| "-".to_string());
        let flag = if low.contains(&field) {
            "  review"
        } else if field.is_required() {
            ""
        } else {
            "  (optional)"
        };
        println!("{:<18} {:<30} {:>6}{}", field.name(), column, score, flag);
    }

    if prepared.source.needs_review() {
        eprintln!("mapping needs review; confirm with `shipaudit audit --map FIELD=HEADER`");
    }
    Ok(())
}
