//! Audit error types

use thiserror::Error;

/// Result type for audit operations
pub type AuditResult<T> = Result<T, AuditError>;

/// Errors raised at the ingestion boundary or by the transaction sink.
///
/// A rejected transaction is a verdict, not an error, and never appears here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    #[error("Malformed event payload: {0}")]
    MalformedPayload(String),

    #[error("Unsupported event action {0:?}")]
    UnsupportedAction(String),

    #[error("Image reference {0:?} has no digest")]
    MissingDigest(String),

    #[error("Invalid image reference {reference:?}: {message}")]
    InvalidReference { reference: String, message: String },

    #[error("Digest reference path {digest_path:?} does not match tag reference path {tag_path:?}")]
    PathMismatch {
        digest_path: String,
        tag_path: String,
    },

    #[error("Failed to write transaction log: {0}")]
    LogWrite(String),
}

impl AuditError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedPayload(_) => "PROMOTER_AUDIT_MALFORMED_PAYLOAD",
            Self::UnsupportedAction(_) => "PROMOTER_AUDIT_UNSUPPORTED_ACTION",
            Self::MissingDigest(_) => "PROMOTER_AUDIT_MISSING_DIGEST",
            Self::InvalidReference { .. } => "PROMOTER_AUDIT_INVALID_REFERENCE",
            Self::PathMismatch { .. } => "PROMOTER_AUDIT_PATH_MISMATCH",
            Self::LogWrite(_) => "PROMOTER_AUDIT_LOG_WRITE",
        }
    }

    /// Errors rejected at ingestion; the service keeps running after these.
    pub fn is_malformed_event(&self) -> bool {
        !matches!(self, Self::LogWrite(_))
    }
}
