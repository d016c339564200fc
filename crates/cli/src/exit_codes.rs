//! CLI Exit Code Registry
//!
//! Single source of truth for `comrec` exit codes. Scripts rely on them.
//!
//! | Range   | Domain     | Description                                  |
//! |---------|------------|----------------------------------------------|
//! | 0       | Universal  | Success                                      |
//! | 2       | Universal  | CLI usage error (bad args)                   |
//! | 3-4     | Local I/O  | Reading/writing files, bad input documents   |
//! | 60-69   | sheets     | Google Sheets retrieval                      |

use comrec_sheets_client::SheetsError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments or invalid values (same code clap uses).
pub const EXIT_USAGE: u8 = 2;

/// File could not be read or written (settings, sheet store, output file).
pub const EXIT_IO: u8 = 3;

/// Input document is not a valid retrieval snapshot.
pub const EXIT_INPUT: u8 = 4;

// =============================================================================
// Sheets (60-69)
// =============================================================================

/// Spreadsheet ids not configured for the account.
pub const EXIT_MISSING_CONFIG: u8 = 60;

/// Service-account credentials missing, unparseable, or rejected.
pub const EXIT_CREDENTIALS: u8 = 61;

/// Token endpoint or Sheets API unavailable (HTTP error, network, timeout).
pub const EXIT_UPSTREAM: u8 = 62;

/// Map a retrieval error to its exit code.
pub fn sheets_exit_code(err: &SheetsError) -> u8 {
    match err {
        SheetsError::MissingConfiguration(_) => EXIT_MISSING_CONFIG,
        SheetsError::Configuration(_) => EXIT_CREDENTIALS,
        // The token endpoint answers 400/401 for a bad signature or unknown account.
        SheetsError::TokenExchange { status: Some(400 | 401 | 403), .. } => EXIT_CREDENTIALS,
        SheetsError::TokenExchange { .. } => EXIT_UPSTREAM,
        SheetsError::SourceUnavailable { .. } => EXIT_UPSTREAM,
        SheetsError::RefreshInProgress => EXIT_UPSTREAM,
    }
}
