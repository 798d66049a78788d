//! Registry vocabulary
//!
//! Validated names (registry, image, tag, digest), the MiB/byte conversion,
//! and the read-only inventory snapshot supplied by the fetch collaborator.

mod errors;
mod inventory;
mod types;

pub use errors::{RegistryError, RegistryResult};
pub use inventory::{DigestImageSize, ManifestListResolver, RegistryInventory};
pub use types::{
    bytes_to_mib, mib_to_bytes, Digest, ImageName, RegistryName, Tag, MAX_CONVERTIBLE_MIB,
};
