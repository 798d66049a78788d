//! Registry error types

use thiserror::Error;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors raised while validating registry names or reading inventories
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Invalid digest: {0:?} (expected sha256:<64 lowercase hex>)")]
    InvalidDigest(String),

    #[error("Invalid tag: {0:?}")]
    InvalidTag(String),

    #[error("Invalid image name: {0:?}")]
    InvalidImageName(String),

    #[error("Invalid registry name: {0:?}")]
    InvalidRegistryName(String),

    #[error("Failed to read inventory {path}: {message}")]
    InventoryIo { path: String, message: String },

    #[error("Invalid inventory {path}: {message}")]
    InventoryParse { path: String, message: String },
}

impl RegistryError {
    /// Error code string, in the same family as the CLI codes
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidDigest(_) => "PROMOTER_REGISTRY_INVALID_DIGEST",
            Self::InvalidTag(_) => "PROMOTER_REGISTRY_INVALID_TAG",
            Self::InvalidImageName(_) => "PROMOTER_REGISTRY_INVALID_IMAGE",
            Self::InvalidRegistryName(_) => "PROMOTER_REGISTRY_INVALID_REGISTRY",
            Self::InventoryIo { .. } => "PROMOTER_REGISTRY_INVENTORY_IO",
            Self::InventoryParse { .. } => "PROMOTER_REGISTRY_INVENTORY_PARSE",
        }
    }
}
