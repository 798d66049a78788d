//! Promotion edge builder
//!
//! Reduces a manifest snapshot to its set of promotion edges:
//!
//! 1. Renames are resolved first, so every alias lands on one destination path
//!    per registry.
//! 2. Each `(image, digest, tag)` mapping yields one edge per destination
//!    registry; a digest with no tags yields one untagged edge.
//! 3. When a manifest-list resolver is supplied, every child of a declared
//!    fat manifest yields an untagged edge carrying the parent digest.
//! 4. No tagged destination may be bound to two digests.
//!
//! The result depends only on the inputs, never on enumeration order.

use std::collections::{BTreeMap, BTreeSet};

use super::edge::{DstImageTag, EdgeSet, PromotionEdge};
use super::errors::{EdgeError, EdgeResult, TagConflict};
use crate::manifest::{Manifest, ManifestSnapshot};
use crate::observability::{log_event_with_fields, Event};
use crate::registry::{Digest, ManifestListResolver};

/// Builds promotion edge sets from manifests.
#[derive(Default)]
pub struct EdgeBuilder<'a> {
    resolver: Option<&'a dyn ManifestListResolver>,
}

impl<'a> EdgeBuilder<'a> {
    /// A builder that does not expand fat manifests.
    pub fn new() -> Self {
        Self { resolver: None }
    }

    /// A builder that expands fat manifests against a source inventory.
    pub fn with_resolver(resolver: &'a dyn ManifestListResolver) -> Self {
        Self {
            resolver: Some(resolver),
        }
    }

    /// Build the edge set of a whole snapshot.
    pub fn build(&self, snapshot: &ManifestSnapshot) -> EdgeResult<EdgeSet> {
        let mut edges = EdgeSet::new();
        for manifest in &snapshot.manifests {
            edges.extend(self.declared_edges(manifest)?);
        }

        let children = self.expand_fat_manifests(&edges);
        edges.extend(children);

        check_tag_conflicts(&edges)?;

        log_event_with_fields(
            Event::EdgesBuilt,
            &[
                ("edges", &edges.len().to_string()),
                ("manifests", &snapshot.len().to_string()),
            ],
        );

        Ok(edges)
    }

    /// Edges declared directly by one manifest.
    fn declared_edges(&self, manifest: &Manifest) -> EdgeResult<Vec<PromotionEdge>> {
        let src = manifest
            .src_registry()
            .ok_or_else(|| EdgeError::MissingSourceRegistry(manifest.origin.clone()))?;
        let renames = manifest.renames()?;

        let mut edges = Vec::new();
        for image in &manifest.images {
            for (digest, tags) in &image.dmap {
                for dst in manifest.dst_registries() {
                    let dst_name = renames.destination_name(&image.name, &dst.name);
                    let image_path = dst.name.image_path(dst_name);

                    let make = |tag| PromotionEdge {
                        dst: DstImageTag::new(image_path.clone(), tag),
                        digest: digest.clone(),
                        parent_digest: None,
                        src_registry: src.name.clone(),
                        src_image: image.name.clone(),
                        dst_registry: dst.name.clone(),
                    };

                    if tags.is_empty() {
                        edges.push(make(None));
                    } else {
                        edges.extend(tags.iter().map(|tag| make(Some(tag.clone()))));
                    }
                }
            }
        }

        Ok(edges)
    }

    /// Untagged child edges for every declared fat manifest.
    fn expand_fat_manifests(&self, declared: &EdgeSet) -> Vec<PromotionEdge> {
        let Some(resolver) = self.resolver else {
            return Vec::new();
        };

        let mut children = Vec::new();
        for edge in declared {
            let Some(child_digests) = resolver.children(&edge.digest) else {
                continue;
            };
            for child in child_digests {
                children.push(PromotionEdge {
                    dst: DstImageTag::new(edge.dst.image_path.clone(), None),
                    digest: child.clone(),
                    parent_digest: Some(edge.digest.clone()),
                    src_registry: edge.src_registry.clone(),
                    src_image: edge.src_image.clone(),
                    dst_registry: edge.dst_registry.clone(),
                });
            }
        }
        children
    }
}

/// A tag is bound to exactly one digest at any instant.
fn check_tag_conflicts(edges: &EdgeSet) -> EdgeResult<()> {
    let mut bindings: BTreeMap<&DstImageTag, BTreeSet<&Digest>> = BTreeMap::new();
    for edge in edges.iter().filter(|edge| edge.dst.tag.is_some()) {
        bindings.entry(&edge.dst).or_default().insert(&edge.digest);
    }

    let conflicts: Vec<TagConflict> = bindings
        .into_iter()
        .filter(|(_, digests)| digests.len() > 1)
        .map(|(dst, digests)| TagConflict {
            dst: dst.clone(),
            digests: digests.into_iter().cloned().collect(),
        })
        .collect();

    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(EdgeError::TagConflicts(conflicts))
    }
}
