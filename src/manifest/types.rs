//! Manifest data types
//!
//! Shape of a promoter manifest file:
//!
//! ```yaml
//! registries:
//! - name: gcr.io/k8s-staging-foo
//!   src: true
//! - name: us.gcr.io/k8s-artifacts-prod/foo
//!   service-account: promoter@k8s-artifacts-prod.iam.gserviceaccount.com
//! images:
//! - name: pause
//!   dmap:
//!     "sha256:...": ["3.9"]
//! renames:
//! - ["gcr.io/k8s-staging-foo/pause", "us.gcr.io/k8s-artifacts-prod/foo/pause-amd64"]
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::errors::{ManifestError, ManifestResult};
use crate::registry::{Digest, ImageName, RegistryName, Tag};

/// A registry declared by a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryContext {
    pub name: RegistryName,

    /// Whether this registry is the promotion source.
    #[serde(default)]
    pub src: bool,

    /// Identity used by the copy engine. Not consulted by the core.
    #[serde(default, rename = "service-account", skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
}

/// A named image and its digest -> tags map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub name: ImageName,

    #[serde(default)]
    pub dmap: BTreeMap<Digest, Vec<Tag>>,
}

/// One parsed promoter manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub registries: Vec<RegistryContext>,

    #[serde(default)]
    pub images: Vec<Image>,

    /// Groups of equivalent image paths, one per registry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub renames: Vec<Vec<String>>,

    /// Where the manifest was read from, for error messages.
    #[serde(skip)]
    pub origin: String,
}

impl Manifest {
    /// The source registry. Valid manifests have exactly one.
    pub fn src_registry(&self) -> Option<&RegistryContext> {
        self.registries.iter().find(|r| r.src)
    }

    /// All non-source registries, in declaration order.
    pub fn dst_registries(&self) -> impl Iterator<Item = &RegistryContext> {
        self.registries.iter().filter(|r| !r.src)
    }

    /// Check the structural rules a manifest must satisfy before edges are built.
    pub fn validate(&self) -> ManifestResult<()> {
        let src_count = self.registries.iter().filter(|r| r.src).count();
        if src_count != 1 {
            return Err(ManifestError::invalid(
                &self.origin,
                format!("expected exactly one source registry, found {}", src_count),
            ));
        }

        let mut registry_names = BTreeSet::new();
        for registry in &self.registries {
            if !registry_names.insert(&registry.name) {
                return Err(ManifestError::invalid(
                    &self.origin,
                    format!("registry {} declared more than once", registry.name),
                ));
            }
        }

        let mut image_names = BTreeSet::new();
        for image in &self.images {
            if !image_names.insert(&image.name) {
                return Err(ManifestError::invalid(
                    &self.origin,
                    format!("image {} declared more than once", image.name),
                ));
            }
        }

        self.renames().map(|_| ())
    }

    /// Resolve the rename groups into a lookup from (source image, destination
    /// registry) to the destination image name.
    pub fn renames(&self) -> ManifestResult<Renames> {
        let mut renames = Renames::default();
        let Some(src) = self.src_registry() else {
            return Ok(renames);
        };

        for group in &self.renames {
            if group.len() < 2 {
                return Err(ManifestError::invalid(
                    &self.origin,
                    format!("rename group {:?} needs at least two paths", group),
                ));
            }

            let mut members: BTreeMap<&RegistryName, ImageName> = BTreeMap::new();
            for path in group {
                let (registry, image) = self.split_declared_path(path)?;
                if members.insert(registry, image).is_some() {
                    return Err(ManifestError::invalid(
                        &self.origin,
                        format!("rename group {:?} names registry {} twice", group, registry),
                    ));
                }
            }

            let Some(src_image) = members.get(&src.name).cloned() else {
                return Err(ManifestError::invalid(
                    &self.origin,
                    format!("rename group {:?} has no path under the source registry", group),
                ));
            };
            if !self.images.iter().any(|image| image.name == src_image) {
                return Err(ManifestError::invalid(
                    &self.origin,
                    format!("rename group {:?} refers to unknown image {}", group, src_image),
                ));
            }

            for (registry, image) in members {
                if registry != &src.name {
                    renames
                        .entries
                        .insert((src_image.clone(), registry.clone()), image);
                }
            }
        }

        Ok(renames)
    }

    /// Split a full path against the longest declared registry prefix.
    fn split_declared_path(&self, path: &str) -> ManifestResult<(&RegistryName, ImageName)> {
        self.registries
            .iter()
            .filter_map(|r| r.name.strip_image_path(path).map(|image| (&r.name, image)))
            .max_by_key(|(registry, _)| registry.as_str().len())
            .ok_or_else(|| {
                ManifestError::invalid(
                    &self.origin,
                    format!("rename path {} is not under any declared registry", path),
                )
            })
    }
}

/// Destination image names that differ from the source image name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Renames {
    entries: BTreeMap<(ImageName, RegistryName), ImageName>,
}

impl Renames {
    /// Name `src_image` takes in `dst_registry`.
    pub fn destination_name<'a>(
        &'a self,
        src_image: &'a ImageName,
        dst_registry: &RegistryName,
    ) -> &'a ImageName {
        self.entries
            .get(&(src_image.clone(), dst_registry.clone()))
            .unwrap_or(src_image)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The full parsed state of a manifest repository at one revision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestSnapshot {
    pub manifests: Vec<Manifest>,
}

impl ManifestSnapshot {
    pub fn new(manifests: Vec<Manifest>) -> Self {
        Self { manifests }
    }

    pub fn len(&self) -> usize {
        self.manifests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.is_empty()
    }
}
