// shipaudit CLI - courier invoice audits from the shell

mod audit;
mod contract;
mod exit_codes;
mod history;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use shipaudit_config::Settings;
use shipaudit_io::{IoError, SqliteStorage};

use exit_codes::{
    EXIT_CONTRACT_INVALID, EXIT_ERROR, EXIT_INPUT_FORMAT, EXIT_INPUT_READ, EXIT_STORE_UNAVAILABLE,
    EXIT_SUCCESS, EXIT_USAGE,
};

#[derive(Parser)]
#[command(name = "shipaudit")]
#[command(about = "Audit courier invoices against a negotiated rate card")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Settings file (default: ~/.config/shipaudit/settings.json)
    #[arg(long, global = true, env = "SHIPAUDIT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for audit history and weight data
    #[arg(long, global = true, env = "SHIPAUDIT_DATA_DIR", value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit an invoice and report overbilled shipments
    #[command(after_help = "\
Examples:
  shipaudit audit march.csv --preset standard --provider Delhivery
  shipaudit audit march.xlsx --contract rates.toml --json
  shipaudit audit march.csv --map ActualZone='Expected Zone' --map AWB='Docket'
  shipaudit audit extracted.json --allow-review --output report.json

Exit codes: 0 = no discrepancies, 1 = discrepancies found")]
    Audit(audit::AuditArgs),

    /// Show the detected header row and column mapping without auditing
    #[command(after_help = "\
Examples:
  shipaudit detect march.csv
  shipaudit detect march.xlsx --json")]
    Detect {
        /// Invoice file (csv, tsv, txt, xlsx, xls, xlsm, xlsb, ods, json)
        invoice: PathBuf,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// List past audits, or clear them
    #[command(after_help = "\
Examples:
  shipaudit history
  shipaudit history --by-provider --json
  shipaudit history clear --weights")]
    History {
        #[command(subcommand)]
        action: Option<history::HistoryAction>,

        /// Aggregate runs per provider
        #[arg(long)]
        by_provider: bool,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Billed-vs-declared weight regression per provider
    #[command(after_help = "\
Examples:
  shipaudit trend
  shipaudit trend Delhivery --json")]
    Trend {
        /// Only this provider
        provider: Option<String>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// List built-in rate card presets
    Presets {
        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Rate card utilities
    #[command(subcommand)]
    Contract(contract::ContractCommands),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    if let Some(dir) = cli.data_dir.clone() {
        settings.data_dir = Some(dir);
    }

    if let Err(e) = logging::init_logging(cli.verbose, cli.quiet, &settings.log_level) {
        eprintln!("warning: {e}");
    }
    tracing::debug!("store: {}", settings.store_path().display());

    let result = match cli.command {
        None => {
            // No subcommand = show usage
            eprintln!("Usage: shipaudit <command> [options]");
            eprintln!("       shipaudit --help for more information");
            Ok(())
        }
        Some(Commands::Audit(args)) => audit::cmd_audit(args, &settings),
        Some(Commands::Detect { invoice, json }) => audit::cmd_detect(invoice, json),
        Some(Commands::History { action, by_provider, json }) => {
            history::cmd_history(action, by_provider, json, &settings)
        }
        Some(Commands::Trend { provider, json }) => history::cmd_trend(provider, json, &settings),
        Some(Commands::Presets { json }) => contract::cmd_presets(json),
        Some(Commands::Contract(cmd)) => contract::cmd_contract(cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn contract(msg: impl Into<String>) -> Self {
        Self::new(EXIT_CONTRACT_INVALID, msg)
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    /// Map a loading failure to its exit code.
    pub fn input(err: IoError) -> Self {
        let code = match &err {
            IoError::Read { .. } => EXIT_INPUT_READ,
            IoError::Parse { .. } | IoError::Empty(_) | IoError::UnsupportedFormat(_) => {
                EXIT_INPUT_FORMAT
            }
            IoError::Store(_) => EXIT_STORE_UNAVAILABLE,
        };
        let hint = match &err {
            IoError::UnsupportedFormat(_) => {
                Some("supported: csv, tsv, txt, xlsx, xls, xlsm, xlsb, ods, json".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Open the history/weight store named by the settings.
pub(crate) fn open_store(settings: &Settings) -> Result<SqliteStorage, CliError> {
    let path = settings.store_path();
    SqliteStorage::open(&path).map_err(|e| {
        CliError::new(EXIT_STORE_UNAVAILABLE, e.to_string())
            .with_hint(format!("check permissions on {}", settings.data_dir().display()))
    })
}

/// Write pretty JSON to stdout and/or a file.
pub(crate) fn emit_json<T: serde::Serialize>(
    value: &T,
    to_stdout: bool,
    output: Option<&PathBuf>,
) -> Result<(), CliError> {
    let json_str = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::other(format!("JSON serialization error: {e}")))?;

    if let Some(path) = output {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::other(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if to_stdout {
        println!("{json_str}");
    }
    Ok(())
}
