//! Promoter manifests
//!
//! Declarative intent: which images, by digest and tag, should exist in which
//! destination registries. Manifests are immutable once loaded from a given
//! revision of the manifest repository.

mod errors;
mod loader;
mod types;

pub use errors::{ManifestError, ManifestResult};
pub use loader::{ManifestLoader, MANIFEST_FILE_NAME};
pub use types::{Image, Manifest, ManifestSnapshot, RegistryContext, Renames};
