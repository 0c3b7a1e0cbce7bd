//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                                  |
//! |---------|-----------|----------------------------------------------|
//! | 0       | Universal | Success (audit: no discrepancies)            |
//! | 1       | Universal | General error; audit: discrepancies found    |
//! | 2       | Universal | CLI usage error (bad args, unknown preset)   |
//! | 3-9     | input     | Invoice and rate card loading                |
//! | 10-19   | audit     | Column mapping review                        |
//! | 20-29   | store     | History / weight store                       |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Audit found overbilled shipments.
/// Like `diff(1)`, exit 1 means "something differs", not a crash.
pub const EXIT_DISCREPANCIES: u8 = 1;

// =============================================================================
// Input (3-9)
// =============================================================================

/// Invoice file could not be opened or read.
pub const EXIT_INPUT_READ: u8 = 3;

/// Invoice file was read but is empty, malformed, or of an unknown type.
pub const EXIT_INPUT_FORMAT: u8 = 4;

/// Rate card failed to parse or holds invalid values.
pub const EXIT_CONTRACT_INVALID: u8 = 5;

// =============================================================================
// Audit (10-19)
// =============================================================================

/// Column detection is not confident about a required field and the user
/// did not confirm the mapping (`--map` or `--allow-review`).
pub const EXIT_NEEDS_REVIEW: u8 = 10;

// =============================================================================
// Store (20-29)
// =============================================================================

/// History store could not be opened (history / trend commands only;
/// `audit` treats persistence as best effort).
pub const EXIT_STORE_UNAVAILABLE: u8 = 20;
