//! Manifest error types

use thiserror::Error;

/// Result type for manifest operations
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors raised while discovering, parsing or validating manifests
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("Failed to read manifest {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse manifest {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid manifest {path}: {message}")]
    Invalid { path: String, message: String },

    #[error("No promoter manifests found under {0}")]
    NoManifests(String),
}

impl ManifestError {
    pub(crate) fn invalid(path: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.to_string(),
            message: message.into(),
        }
    }
}
