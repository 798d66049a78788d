//! Registry mutation events
//!
//! Notifications arrive as JSON payloads of the form
//! `{"action": "INSERT", "digest": "<path>@<digest>", "tag": "<path>:<tag>"}`.
//! `tag` may be absent or empty for untagged pushes. Parsing is the ingestion
//! boundary: anything that does not fit is rejected here and never reaches
//! the verifier.

use std::fmt;

use serde::Deserialize;

use super::errors::{AuditError, AuditResult};
use crate::edge::{DstImageTag, EdgeProjection};
use crate::registry::{Digest, Tag};

/// Mutation kind. Only insertions are audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Insert,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Insert => "INSERT",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
struct Payload {
    action: String,
    digest: String,
    #[serde(default)]
    tag: Option<String>,
}

/// One observed registry mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEvent {
    pub action: Action,
    /// `<path>@<digest>`
    pub fqin: String,
    /// `<path>:<tag>`, empty when untagged
    pub pqin: String,
    pub path: String,
    pub digest: Digest,
    pub tag: Option<Tag>,
}

impl RegistryEvent {
    /// Build an insertion event from its parts.
    pub fn insert(path: impl Into<String>, digest: Digest, tag: Option<Tag>) -> Self {
        let path = path.into();
        let fqin = format!("{}@{}", path, digest);
        let pqin = tag
            .as_ref()
            .map_or_else(String::new, |t| format!("{}:{}", path, t));
        Self {
            action: Action::Insert,
            fqin,
            pqin,
            path,
            digest,
            tag,
        }
    }

    /// Parse a JSON notification payload.
    pub fn parse(payload: &[u8]) -> AuditResult<Self> {
        let payload: Payload = serde_json::from_slice(payload)
            .map_err(|e| AuditError::MalformedPayload(e.to_string()))?;

        if payload.action != Action::Insert.as_str() {
            return Err(AuditError::UnsupportedAction(payload.action));
        }

        let (path, digest) = split_fqin(&payload.digest)?;
        let tag = match payload.tag.as_deref() {
            None | Some("") => None,
            Some(pqin) => {
                let (tag_path, tag) = split_pqin(pqin)?;
                if tag_path != path {
                    return Err(AuditError::PathMismatch {
                        digest_path: path.to_string(),
                        tag_path: tag_path.to_string(),
                    });
                }
                Some(tag)
            }
        };

        Ok(Self::insert(path, digest, tag))
    }

    /// The `(DstImageTag, Digest)` pair matched against promotion edges.
    pub fn projection(&self) -> EdgeProjection {
        EdgeProjection {
            dst: DstImageTag::new(self.path.clone(), self.tag.clone()),
            digest: self.digest.clone(),
        }
    }

    pub fn tag_str(&self) -> &str {
        self.tag.as_ref().map_or("", Tag::as_str)
    }
}

fn invalid(reference: &str, message: impl Into<String>) -> AuditError {
    AuditError::InvalidReference {
        reference: reference.to_string(),
        message: message.into(),
    }
}

fn split_fqin(fqin: &str) -> AuditResult<(&str, Digest)> {
    let (path, digest) = fqin
        .split_once('@')
        .ok_or_else(|| AuditError::MissingDigest(fqin.to_string()))?;
    if path.is_empty() {
        return Err(invalid(fqin, "empty image path"));
    }
    let digest = Digest::new(digest).map_err(|e| invalid(fqin, e.to_string()))?;
    Ok((path, digest))
}

/// Split `<path>:<tag>`. The path may itself contain `:` (a registry port),
/// so the tag is whatever follows the last `:` as long as it has no `/`.
fn split_pqin(pqin: &str) -> AuditResult<(&str, Tag)> {
    let (path, tag) = pqin
        .rsplit_once(':')
        .filter(|(path, tag)| !path.is_empty() && !tag.contains('/'))
        .ok_or_else(|| invalid(pqin, "expected <path>:<tag>"))?;
    let tag = Tag::new(tag).map_err(|e| invalid(pqin, e.to_string()))?;
    Ok((path, tag))
}
