//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, missing file) |
//! | 3       | Universal        | IO error reading or writing files        |
//! | 10-19   | procedure        | Definition and run outcome codes         |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use accord_recon::ProcedureError;

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unknown participant code.
pub const EXIT_USAGE: u8 = 2;

/// Cannot read the definition or settings, or cannot write output.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Procedure (10-19)
// =============================================================================

/// Definition does not parse, or the procedure cannot be built from it.
pub const EXIT_PROCEDURE_INVALID: u8 = 10;

/// Settings file exists but does not parse.
pub const EXIT_SETTINGS_INVALID: u8 = 11;

/// Run completed, but some participant failed to collect or to accept
/// delivery. The report is still written.
pub const EXIT_RUN_PARTIAL: u8 = 12;

/// Map a ProcedureError to its exit code.
pub fn procedure_exit_code(err: &ProcedureError) -> u8 {
    match err {
        ProcedureError::ConfigParse(_)
        | ProcedureError::ConfigValidation(_)
        | ProcedureError::UnknownFieldType { .. }
        | ProcedureError::EmptyFieldName { .. }
        | ProcedureError::DuplicateField { .. }
        | ProcedureError::DuplicateParticipant(_)
        | ProcedureError::UnknownParticipant(_)
        | ProcedureError::UnknownField { .. }
        | ProcedureError::BadFieldRef(_)
        | ProcedureError::UnknownAdapter { .. }
        | ProcedureError::Adapter { .. }
        | ProcedureError::EmptyProcedureField(_)
        | ProcedureError::DuplicateProcedureField(_)
        | ProcedureError::UnknownProcedureField(_)
        | ProcedureError::ParticipantFieldReused { .. }
        | ProcedureError::InvalidRule(_) => EXIT_PROCEDURE_INVALID,
    }
}

/// A short remedy for the errors that have an obvious one.
pub fn procedure_hint(err: &ProcedureError) -> Option<String> {
    match err {
        ProcedureError::UnknownFieldType { .. } => Some("run `accord types` for the available codes".into()),
        ProcedureError::UnknownAdapter { .. } => Some("built-in adapters are \"csv\" and \"memory\"".into()),
        ProcedureError::BadFieldRef(_) => Some("field references look like \"participant.field\"".into()),
        ProcedureError::ParticipantFieldReused { .. } => {
            Some("each participant field belongs to at most one procedure field".into())
        }
        _ => None,
    }
}
