//! Exit codes for the cp-core CLI.
//!
//! Exit codes communicate the resolution outcome without requiring output
//! parsing.
//!
//! Exit code ranges:
//! - 0: Configuration resolved
//! - 10-19: User errors (fix the option bag or the filesystem it points at)
//! - 20-29: Internal and I/O errors

use cp_common::{Error, ErrorCategory};

/// Exit codes for cp-core operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Configuration resolved and valid
    Clean = 0,

    // ========================================================================
    // User Errors (10-19)
    // ========================================================================
    /// Unknown option, ill-typed value, or missing required option
    ArgsError = 10,

    /// Resolution stage failed (checkpoints, chunks, kernel function)
    ResolutionError = 11,

    /// Cross-field validation rejected the configuration
    ValidationError = 12,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error
    IoError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Codes 10-19 can be resolved by changing the options.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    pub fn is_internal_error(self) -> bool {
        (self as i32) >= 20
    }

    /// Exit code for a resolution failure.
    pub fn from_error(error: &Error) -> Self {
        match error.category() {
            ErrorCategory::Registry => ExitCode::InternalError,
            ErrorCategory::Ingestion => ExitCode::ArgsError,
            ErrorCategory::Resolution => ExitCode::ResolutionError,
            ErrorCategory::Validation => ExitCode::ValidationError,
            ErrorCategory::Io => ExitCode::IoError,
        }
    }

    /// Get the error code name as a string constant (for JSON output).
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_RESOLVED",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ResolutionError => "ERR_RESOLUTION",
            ExitCode::ValidationError => "ERR_VALIDATION",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code.as_i32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::ArgsError.as_i32(), 10);
        assert_eq!(ExitCode::ValidationError.as_i32(), 12);
        assert_eq!(ExitCode::IoError.as_i32(), 21);
    }

    #[test]
    fn test_ranges() {
        assert!(ExitCode::Clean.is_success());
        assert!(ExitCode::ResolutionError.is_user_error());
        assert!(!ExitCode::ResolutionError.is_internal_error());
        assert!(ExitCode::InternalError.is_internal_error());
    }

    #[test]
    fn test_from_error_by_category() {
        let unknown = Error::UnknownOption {
            name: "bogus".to_string(),
        };
        assert_eq!(ExitCode::from_error(&unknown), ExitCode::ArgsError);

        let missing = Error::NoCheckpointsFound {
            dir: PathBuf::from("/nowhere"),
        };
        assert_eq!(ExitCode::from_error(&missing), ExitCode::ResolutionError);

        let io = Error::io(
            "/nowhere",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(ExitCode::from_error(&io), ExitCode::IoError);
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::ArgsError.to_string(), "ERR_ARGS (10)");
    }
}
