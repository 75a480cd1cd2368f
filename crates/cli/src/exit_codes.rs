//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success                                                  |
//! | 2    | Usage error (bad arguments, missing input)               |
//! | 3    | I/O error (cannot read an input, cannot write an output) |
//! | 4    | Parse or shape error (unreadable sheet, missing column, invalid roster day, unresolved period) |
//! | 5    | Invalid config                                           |
//! | 6    | Discrepancies found and `--strict` was given             |

use provjera_io::IoError;
use provjera_recon::ReconError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required inputs.
pub const EXIT_USAGE: u8 = 2;

/// Filesystem error reading inputs or writing outputs.
pub const EXIT_IO: u8 = 3;

/// Input could not be interpreted: container unreadable, required column
/// absent, roster day invalid for the month, period not derivable.
pub const EXIT_PARSE: u8 = 4;

/// Config file failed to parse or validate.
pub const EXIT_CONFIG: u8 = 5;

/// At least one discrepancy report is non-empty (only with `--strict`).
pub const EXIT_DISCREPANCIES: u8 = 6;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_CONFIG,
        ReconError::MissingInput(_) => EXIT_USAGE,
        ReconError::MissingColumn { .. }
        | ReconError::PeriodUnresolved(_)
        | ReconError::InvalidRosterDay { .. } => EXIT_PARSE,
    }
}

/// Map a reader/writer error to its exit code.
pub fn io_exit_code(err: &IoError) -> u8 {
    match err {
        IoError::Write(_) => EXIT_IO,
        _ => EXIT_PARSE,
    }
}
