//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract — scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 60-69   | recon            | Reconciliation run outcomes              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use conciliar_recon::ReconError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - run completed and every reconcilable movement matched.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
/// Raised by clap itself before any command runs.
#[allow(dead_code)]
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Recon (60-69)
// =============================================================================

/// Run file cannot be parsed or fails validation.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 60;

/// Input file missing or malformed, or the engine failed mid-run.
pub const EXIT_RECON_RUNTIME: u8 = 61;

/// Run completed but left movements in the exceptions table.
pub const EXIT_RECON_EXCEPTIONS: u8 = 62;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_RECON_INVALID_CONFIG,
        ReconError::MissingColumn { .. }
        | ReconError::DateParse { .. }
        | ReconError::AmountParse { .. }
        | ReconError::InvalidField { .. }
        | ReconError::Io(_) => EXIT_RECON_RUNTIME,
        ReconError::EntryUnavailable(_) => EXIT_ERROR,
    }
}
