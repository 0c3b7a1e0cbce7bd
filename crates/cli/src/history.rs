//! `shipaudit history` and `shipaudit trend`.

use clap::Subcommand;
use serde::Serialize;
use shipaudit_audit::regression::{is_systematic_inflation, sample_for_plot, MIN_POINTS, PLOT_SAMPLE};
use shipaudit_audit::{AuditHistory, RegressionResult, WeightTracker};
use shipaudit_config::Settings;

use crate::{emit_json, open_store, CliError};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Delete recorded audits
    Clear {
        /// Also delete weight data used by `trend`
        #[arg(long)]
        weights: bool,
    },
}

pub fn cmd_history(
    action: Option<HistoryAction>,
    by_provider: bool,
    json: bool,
    settings: &Settings,
) -> Result<(), CliError> {
    let mut store = open_store(settings)?;

    if let Some(HistoryAction::Clear { weights }) = action {
        AuditHistory::new(&mut store).clear();
        if weights {
            WeightTracker::new(&mut store).clear();
        }
        eprintln!("history cleared{}", if weights { " (including weight data)" } else { "" });
        return Ok(());
    }

    let history = AuditHistory::new(store);

    if by_provider {
        let summaries = history.provider_summaries();
        if json {
            return emit_json(&summaries, true, None);
        }
        println!("{:<20} {:>5} {:>12} {:>12}  LAST AUDIT", "PROVIDER", "RUNS", "BILLED", "OVERCHARGE");
        for s in &summaries {
            println!(
                "{:<20} {:>5} {:>12.2} {:>12.2}  {}",
                s.provider,
                s.runs,
                s.total_billed,
                s.total_overcharge,
                s.last_audited.format("%Y-%m-%d %H:%M")
            );
        }
        return Ok(());
    }

    let records = history.load();
    if json {
        return emit_json(&records, true, None);
    }
    if records.is_empty() {
        eprintln!("no audits recorded");
        return Ok(());
    }
    println!(
        "{:<17} {:<16} {:<24} {:>6} {:>6} {:>11}",
        "WHEN", "PROVIDER", "FILE", "ROWS", "ISSUES", "OVERCHARGE"
    );
    for r in records.iter().rev() {
        println!(
            "{:<17} {:<16} {:<24} {:>6} {:>6} {:>11.2}",
            r.timestamp.format("%Y-%m-%d %H:%M"),
            r.provider,
            r.file_name,
            r.total_rows,
            r.discrepancy_count,
            r.total_overcharge
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct TrendReport {
    provider: String,
    points: usize,
    plot_sample: usize,
    regression: Option<RegressionResult>,
    systematic_inflation: bool,
}

pub fn cmd_trend(provider: Option<String>, json: bool, settings: &Settings) -> Result<(), CliError> {
    let store = open_store(settings)?;
    let tracker = WeightTracker::new(store);

    let mut groups = tracker.by_provider();
    if let Some(name) = &provider {
        groups.retain(|p, _| p == name);
        if groups.is_empty() {
            return Err(CliError::args(format!("no weight data for provider \"{name}\"")));
        }
    }

    let reports: Vec<TrendReport> = groups
        .into_iter()
        .map(|(provider, points)| {
            let regression = shipaudit_audit::regression::fit(&points);
            TrendReport {
                systematic_inflation: regression.as_ref().is_some_and(is_systematic_inflation),
                plot_sample: sample_for_plot(&points, PLOT_SAMPLE).len(),
                points: points.len(),
                provider,
                regression,
            }
        })
        .collect();

    if json {
        return emit_json(&reports, true, None);
    }
    if reports.is_empty() {
        eprintln!("no weight data recorded");
        return Ok(());
    }

    for t in &reports {
        match &t.regression {
            Some(r) => println!(
                "{}: {} points, billed = {:.4} x declared {:+.2} g, R² {:.4}, avg overcharge {:.2}%{}",
                t.provider,
                t.points,
                r.slope,
                r.intercept,
                r.r_squared,
                r.avg_overcharge_pct,
                if t.systematic_inflation { "  SYSTEMATIC INFLATION" } else { "" }
            ),
            None => println!(
                "{}: {} points, not enough for a trend (need {} with varied weights)",
                t.provider, t.points, MIN_POINTS
            ),
        }
    }
    Ok(())
}
