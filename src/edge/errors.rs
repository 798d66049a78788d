//! Edge construction errors

use std::fmt;

use thiserror::Error;

use super::edge::DstImageTag;
use crate::manifest::ManifestError;
use crate::registry::Digest;

/// Result type for edge construction
pub type EdgeResult<T> = Result<T, EdgeError>;

/// A tagged destination that two or more edges bind to different digests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagConflict {
    pub dst: DstImageTag,
    pub digests: Vec<Digest>,
}

impl fmt::Display for TagConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digests: Vec<&str> = self.digests.iter().map(Digest::as_str).collect();
        write!(f, "{} -> {}", self.dst, digests.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EdgeError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("Manifest {0} has no source registry")]
    MissingSourceRegistry(String),

    #[error("Tags bound to more than one digest:\n{}", render_conflicts(.0))]
    TagConflicts(Vec<TagConflict>),
}

fn render_conflicts(conflicts: &[TagConflict]) -> String {
    conflicts
        .iter()
        .map(TagConflict::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
