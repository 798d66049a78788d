//! Promotion edges and edge sets

use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;

use crate::registry::{Digest, ImageName, RegistryInventory, RegistryName, Tag};

/// Destination image path and optional tag.
///
/// `image_path` is the full path, registry included, e.g.
/// `us.gcr.io/k8s-artifacts-prod/pause`. The tag is `None` for untagged
/// pushes such as fat-manifest children.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DstImageTag {
    pub image_path: String,
    pub tag: Option<Tag>,
}

impl DstImageTag {
    pub fn new(image_path: impl Into<String>, tag: Option<Tag>) -> Self {
        Self {
            image_path: image_path.into(),
            tag,
        }
    }

    /// Tag as text; empty when untagged.
    pub fn tag_str(&self) -> &str {
        self.tag.as_ref().map_or("", Tag::as_str)
    }
}

impl fmt::Display for DstImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}:{}", self.image_path, tag),
            None => f.write_str(&self.image_path),
        }
    }
}

/// One image that should exist at a destination with a given digest.
///
/// Equality and ordering are structural over every field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PromotionEdge {
    pub dst: DstImageTag,
    pub digest: Digest,
    /// Digest of the enclosing fat manifest when this edge is one of its children.
    pub parent_digest: Option<Digest>,
    pub src_registry: RegistryName,
    pub src_image: ImageName,
    pub dst_registry: RegistryName,
}

impl PromotionEdge {
    /// The `(DstImageTag, Digest)` pair the removal check compares on.
    pub fn projection(&self) -> EdgeProjection {
        EdgeProjection {
            dst: self.dst.clone(),
            digest: self.digest.clone(),
        }
    }

    /// Name used when reporting this edge: the destination image path.
    pub fn image_name(&self) -> &str {
        &self.dst.image_path
    }

    pub fn is_fat_manifest_child(&self) -> bool {
        self.parent_digest.is_some()
    }

    /// Source image path, e.g. `gcr.io/k8s-staging-foo/pause`.
    pub fn src_path(&self) -> String {
        self.src_registry.image_path(&self.src_image)
    }
}

impl fmt::Display for PromotionEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} -> {}", self.src_path(), self.digest, self.dst)?;
        if let Some(parent) = &self.parent_digest {
            write!(f, " (parent digest {})", parent)?;
        }
        Ok(())
    }
}

/// Projection of an edge onto its destination and digest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeProjection {
    pub dst: DstImageTag,
    pub digest: Digest,
}

/// Set of promotion edges. No ordering is implied by the domain; iteration
/// order is the structural order so that every consumer is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeSet {
    edges: BTreeSet<PromotionEdge>,
}

impl EdgeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an edge. Returns false if an equal edge was already present.
    pub fn insert(&mut self, edge: PromotionEdge) -> bool {
        self.edges.insert(edge)
    }

    pub fn contains(&self, edge: &PromotionEdge) -> bool {
        self.edges.contains(edge)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, PromotionEdge> {
        self.edges.iter()
    }

    /// All `(DstImageTag, Digest)` projections in the set.
    pub fn projections(&self) -> BTreeSet<EdgeProjection> {
        self.edges.iter().map(PromotionEdge::projection).collect()
    }

    /// Edges that stem from expanding the fat manifest `parent`.
    pub fn children_of<'a>(
        &'a self,
        parent: &'a Digest,
    ) -> impl Iterator<Item = &'a PromotionEdge> + 'a {
        self.edges
            .iter()
            .filter(move |edge| edge.parent_digest.as_ref() == Some(parent))
    }

    /// Edges whose destination does not yet hold the digest (and tag) in the
    /// live inventory: the work the copy engine still has to do.
    pub fn pending_against(&self, inventory: &RegistryInventory) -> EdgeSet {
        self.edges
            .iter()
            .filter(|edge| {
                !inventory.contains(&edge.dst.image_path, &edge.digest, edge.dst.tag.as_ref())
            })
            .cloned()
            .collect()
    }
}

impl FromIterator<PromotionEdge> for EdgeSet {
    fn from_iter<I: IntoIterator<Item = PromotionEdge>>(iter: I) -> Self {
        Self {
            edges: iter.into_iter().collect(),
        }
    }
}

impl Extend<PromotionEdge> for EdgeSet {
    fn extend<I: IntoIterator<Item = PromotionEdge>>(&mut self, iter: I) {
        self.edges.extend(iter);
    }
}

impl IntoIterator for EdgeSet {
    type Item = PromotionEdge;
    type IntoIter = btree_set::IntoIter<PromotionEdge>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.into_iter()
    }
}

impl<'a> IntoIterator for &'a EdgeSet {
    type Item = &'a PromotionEdge;
    type IntoIter = btree_set::Iter<'a, PromotionEdge>;

    fn into_iter(self) -> Self::IntoIter {
        self.edges.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest(c: char) -> Digest {
        Digest::new(format!("sha256:{}", c.to_string().repeat(64))).unwrap()
    }

    fn edge(tag: Option<&str>, d: char, parent: Option<char>) -> PromotionEdge {
        PromotionEdge {
            dst: DstImageTag::new("us.gcr.io/prod/pause", tag.map(|t| Tag::new(t).unwrap())),
            digest: digest(d),
            parent_digest: parent.map(digest),
            src_registry: RegistryName::new("gcr.io/staging").unwrap(),
            src_image: ImageName::new("pause").unwrap(),
            dst_registry: RegistryName::new("us.gcr.io/prod").unwrap(),
        }
    }

    #[test]
    fn test_set_deduplicates_by_value() {
        let mut set = EdgeSet::new();
        assert!(set.insert(edge(Some("1.0"), 'a', None)));
        assert!(!set.insert(edge(Some("1.0"), 'a', None)));
        assert!(set.insert(edge(Some("1.1"), 'a', None)));

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_parent_digest_distinguishes_edges_but_not_projections() {
        let set: EdgeSet = [edge(None, 'c', Some('f')), edge(None, 'c', Some('e'))]
            .into_iter()
            .collect();

        assert_eq!(set.len(), 2);
        assert_eq!(set.projections().len(), 1);
    }

    #[test]
    fn test_children_of() {
        let set: EdgeSet = [
            edge(Some("1.0"), 'f', None),
            edge(None, '1', Some('f')),
            edge(None, '2', Some('f')),
            edge(None, '3', Some('e')),
        ]
        .into_iter()
        .collect();

        let parent = digest('f');
        assert_eq!(set.children_of(&parent).count(), 2);
    }

    #[test]
    fn test_pending_against_inventory() {
        let set: EdgeSet = [edge(Some("1.0"), 'a', None), edge(Some("1.1"), 'b', None)]
            .into_iter()
            .collect();
        let mut inventory = RegistryInventory::new();
        inventory.insert_image("us.gcr.io/prod/pause", digest('a'), Some(Tag::new("1.0").unwrap()));

        let pending = set.pending_against(&inventory);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending.iter().next().unwrap().digest, digest('b'));
    }

    #[test]
    fn test_display() {
        let e = edge(None, '1', Some('f'));
        let text = e.to_string();
        assert!(text.starts_with("gcr.io/staging/pause@sha256:1111"));
        assert!(text.contains("(parent digest sha256:ffff"));
        assert_eq!(edge(Some("1.0"), 'a', None).dst.to_string(), "us.gcr.io/prod/pause:1.0");
    }
}
