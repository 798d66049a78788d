//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero status.

use std::fmt;
use std::io;

use crate::audit::AuditError;
use crate::checks::CheckError;
use crate::edge::EdgeError;
use crate::manifest::ManifestError;
use crate::registry::RegistryError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file or environment error
    ConfigError,
    /// I/O error (stdin/stdout, log files)
    IoError,
    /// Manifests, inventory or edges could not be loaded
    InputError,
    /// One or more checks reported a violation or failed to run
    CheckFailed,
    /// The working tree was left on the wrong revision
    Fatal,
    /// The audit service stopped on an error
    AuditFailed,
    /// The audit completed with rejected transactions
    AuditRejected,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "PROMOTER_CLI_CONFIG_ERROR",
            Self::IoError => "PROMOTER_CLI_IO_ERROR",
            Self::InputError => "PROMOTER_CLI_INPUT_ERROR",
            Self::CheckFailed => "PROMOTER_CLI_CHECK_FAILED",
            Self::Fatal => "PROMOTER_CLI_FATAL",
            Self::AuditFailed => "PROMOTER_CLI_AUDIT_FAILED",
            Self::AuditRejected => "PROMOTER_CLI_AUDIT_REJECTED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn input_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InputError, msg)
    }

    pub fn audit_rejected(rejected: usize) -> Self {
        Self::new(
            CliErrorCode::AuditRejected,
            format!("{} transaction(s) could not be validated", rejected),
        )
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<RegistryError> for CliError {
    fn from(e: RegistryError) -> Self {
        Self::input_error(e.to_string())
    }
}

impl From<ManifestError> for CliError {
    fn from(e: ManifestError) -> Self {
        Self::input_error(e.to_string())
    }
}

impl From<EdgeError> for CliError {
    fn from(e: EdgeError) -> Self {
        Self::input_error(e.to_string())
    }
}

impl From<CheckError> for CliError {
    fn from(e: CheckError) -> Self {
        let code = if e.is_fatal() {
            CliErrorCode::Fatal
        } else {
            match &e {
                CheckError::InvalidRevision { .. } | CheckError::InvalidConfig(_) => {
                    CliErrorCode::ConfigError
                }
                _ => CliErrorCode::CheckFailed,
            }
        };
        Self::new(code, e.to_string())
    }
}

impl From<AuditError> for CliError {
    fn from(e: AuditError) -> Self {
        Self::new(CliErrorCode::AuditFailed, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
