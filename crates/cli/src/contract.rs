//! `shipaudit presets` and `shipaudit contract`: rate card handling.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;
use shipaudit_audit::ContractRules;
use shipaudit_config::{preset, preset_names, presets::presets, Settings};

use crate::{emit_json, CliError};

#[derive(Subcommand)]
pub enum ContractCommands {
    /// Check that a rate card file parses and holds sane values
    #[command(after_help = "\
Examples:
  shipaudit contract validate rates.toml
  shipaudit contract validate rates.json")]
    Validate {
        /// Rate card (.toml or .json)
        file: PathBuf,
    },
}

pub fn cmd_contract(cmd: ContractCommands) -> Result<(), CliError> {
    match cmd {
        ContractCommands::Validate { file } => {
            let rules = load_contract_file(&file)?;
            eprintln!(
                "ok: zones A/B/C = {}/{}/{} per kg, COD {}%, RTO {}",
                rules.zone_a_rate,
                rules.zone_b_rate,
                rules.zone_c_rate,
                rules.cod_fee_percentage,
                rules.rto_flat_fee
            );
            Ok(())
        }
    }
}

/// Read a rate card, parsing JSON for `.json` files and TOML otherwise.
pub fn load_contract_file(path: &Path) -> Result<ContractRules, CliError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::contract(format!("cannot read {}: {e}", path.display())))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        ContractRules::from_json(&content)
    } else {
        ContractRules::from_toml(&content)
    };
    parsed.map_err(|e| CliError::contract(format!("{}: {e}", path.display())))
}

/// Pick the rate card for an audit: explicit file, then explicit preset,
/// then the configured default preset. Returns the card and a label.
pub fn resolve_contract(
    file: Option<&Path>,
    preset_name: Option<&str>,
    settings: &Settings,
) -> Result<(ContractRules, String), CliError> {
    if let Some(path) = file {
        return Ok((load_contract_file(path)?, path.display().to_string()));
    }

    let name = preset_name.or(settings.default_preset.as_deref()).ok_or_else(|| {
        CliError::args("no rate card given")
            .with_hint("pass --contract FILE or --preset NAME, or set audit.defaultPreset")
    })?;

    let found = preset(name).ok_or_else(|| {
        CliError::args(format!("unknown preset: \"{name}\""))
            .with_hint(format!("available presets: {}", preset_names().join(", ")))
    })?;
    Ok((found.rules, format!("preset:{}", found.name)))
}

#[derive(Serialize)]
struct PresetEntry<'a> {
    name: &'a str,
    description: &'a str,
    #[serde(flatten)]
    rules: &'a ContractRules,
}

pub fn cmd_presets(json: bool) -> Result<(), CliError> {
    let all = presets();
    if json {
        let entries: Vec<PresetEntry> = all
            .iter()
            .map(|p| PresetEntry {
                name: p.name,
                description: p.description,
                rules: &p.rules,
            })
            .collect();
        return emit_json(&entries, true, None);
    }

    println!("{:<10} {:>7} {:>7} {:>7} {:>6} {:>6}  DESCRIPTION", "NAME", "ZONE A", "ZONE B", "ZONE C", "COD%", "RTO");
    for p in &all {
        let r = &p.rules;
        println!(
            "{:<10} {:>7.2} {:>7.2} {:>7.2} {:>6.2} {:>6.2}  {}",
            p.name, r.zone_a_rate, r.zone_b_rate, r.zone_c_rate, r.cod_fee_percentage, r.rto_flat_fee, p.description
        );
    }
    Ok(())
}
