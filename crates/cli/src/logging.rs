//! Logging setup for the `shipaudit` binary.
//!
//! Library crates log through the `log` facade; the fmt subscriber's
//! `tracing-log` bridge forwards those records.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Resolve the effective level.
///
/// `-q` wins, then `-v` (1 = DEBUG, 2+ = TRACE), then the configured level.
pub fn level_for(verbose: u8, quiet: bool, configured: &str) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::ERROR,
        (false, 0) => configured.parse().unwrap_or(LevelFilter::WARN),
        (false, 1) => LevelFilter::DEBUG,
        (false, _) => LevelFilter::TRACE,
    }
}

/// Install the global subscriber on stderr. `RUST_LOG` overrides the level
/// unless `-v` or `-q` was given.
pub fn init_logging(verbose: u8, quiet: bool, configured: &str) -> Result<(), String> {
    let level = level_for(verbose, quiet, configured);
    let filter = if verbose == 0 && !quiet {
        EnvFilter::builder()
            .with_default_directive(level.into())
            .from_env_lossy()
    } else {
        EnvFilter::default().add_directive(level.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}
