//! Read-only registry inventory snapshot
//!
//! The inventory is fetched by an external collaborator and handed to the
//! core as a JSON document:
//!
//! ```json
//! {
//!   "images": { "gcr.io/prod/pause": { "sha256:...": ["3.9"] } },
//!   "sizes": { "sha256:...": 734003 },
//!   "manifest_lists": { "sha256:<parent>": ["sha256:<child>"] }
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{RegistryError, RegistryResult};
use super::types::{Digest, Tag};

/// Digest to reported byte size.
///
/// A size of zero or less is a broken inventory entry, never an empty image.
pub type DigestImageSize = BTreeMap<Digest, i64>;

/// Resolves a manifest-list digest to the digests of its children.
pub trait ManifestListResolver {
    /// Children of `digest`, or `None` if it is not a manifest list.
    fn children(&self, digest: &Digest) -> Option<&[Digest]>;
}

/// Live state of a set of registries at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryInventory {
    /// Full image path -> digest -> tags present.
    #[serde(default)]
    pub images: BTreeMap<String, BTreeMap<Digest, BTreeSet<Tag>>>,

    /// Digest -> byte size.
    #[serde(default)]
    pub sizes: DigestImageSize,

    /// Manifest-list digest -> child digests, from the source registry.
    #[serde(default)]
    pub manifest_lists: BTreeMap<Digest, Vec<Digest>>,
}

impl RegistryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load an inventory snapshot from a JSON file.
    pub fn load(path: &Path) -> RegistryResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| RegistryError::InventoryIo {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| RegistryError::InventoryParse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Record that `path` holds `digest`, optionally under `tag`.
    pub fn insert_image(&mut self, path: impl Into<String>, digest: Digest, tag: Option<Tag>) {
        let tags = self
            .images
            .entry(path.into())
            .or_default()
            .entry(digest)
            .or_default();
        if let Some(tag) = tag {
            tags.insert(tag);
        }
    }

    pub fn insert_size(&mut self, digest: Digest, size: i64) {
        self.sizes.insert(digest, size);
    }

    pub fn insert_manifest_list(&mut self, parent: Digest, children: Vec<Digest>) {
        self.manifest_lists.insert(parent, children);
    }

    /// Whether `path` already holds `digest`, under `tag` when one is given.
    pub fn contains(&self, path: &str, digest: &Digest, tag: Option<&Tag>) -> bool {
        let Some(tags) = self.images.get(path).and_then(|digests| digests.get(digest)) else {
            return false;
        };
        match tag {
            Some(tag) => tags.contains(tag),
            None => true,
        }
    }

    /// Recorded size of `digest`; missing entries read as 0.
    pub fn size_of(&self, digest: &Digest) -> i64 {
        self.sizes.get(digest).copied().unwrap_or(0)
    }
}

impl ManifestListResolver for RegistryInventory {
    fn children(&self, digest: &Digest) -> Option<&[Digest]> {
        self.manifest_lists.get(digest).map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn digest(c: char) -> Digest {
        Digest::new(format!("sha256:{}", c.to_string().repeat(64))).unwrap()
    }

    #[test]
    fn test_contains_with_and_without_tag() {
        let mut inventory = RegistryInventory::new();
        inventory.insert_image("gcr.io/prod/pause", digest('a'), Some(Tag::new("3.9").unwrap()));

        assert!(inventory.contains("gcr.io/prod/pause", &digest('a'), None));
        assert!(inventory.contains(
            "gcr.io/prod/pause",
            &digest('a'),
            Some(&Tag::new("3.9").unwrap())
        ));
        assert!(!inventory.contains(
            "gcr.io/prod/pause",
            &digest('a'),
            Some(&Tag::new("3.8").unwrap())
        ));
        assert!(!inventory.contains("gcr.io/prod/pause", &digest('b'), None));
    }

    #[test]
    fn test_missing_size_reads_zero() {
        let mut inventory = RegistryInventory::new();
        inventory.insert_size(digest('a'), 42);

        assert_eq!(inventory.size_of(&digest('a')), 42);
        assert_eq!(inventory.size_of(&digest('b')), 0);
    }

    #[test]
    fn test_manifest_list_children() {
        let mut inventory = RegistryInventory::new();
        inventory.insert_manifest_list(digest('f'), vec![digest('1'), digest('2')]);

        assert_eq!(inventory.children(&digest('f')).map(<[Digest]>::len), Some(2));
        assert!(inventory.children(&digest('1')).is_none());
    }

    #[test]
    fn test_load_from_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        let json = format!(
            r#"{{"sizes": {{"{}": 1048576}}, "manifest_lists": {{"{}": ["{}"]}}}}"#,
            digest('a'),
            digest('f'),
            digest('a')
        );
        std::fs::write(&path, json).unwrap();

        let inventory = RegistryInventory::load(&path).unwrap();
        assert_eq!(inventory.size_of(&digest('a')), 1_048_576);
        assert!(inventory.images.is_empty());
    }

    #[test]
    fn test_load_rejects_bad_digest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(&path, r#"{"sizes": {"sha256:zz": 1}}"#).unwrap();

        let err = RegistryInventory::load(&path).unwrap_err();
        assert_eq!(err.code(), "PROMOTER_REGISTRY_INVENTORY_PARSE");
    }
}
