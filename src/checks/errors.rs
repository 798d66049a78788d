//! Check errors and policy violations
//!
//! Policy violations (removed images, oversized or invalid images) are
//! results, not faults. They are carried as structured data and rendered on
//! demand, so callers can consume either the fields or the text.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use crate::edge::{EdgeError, EdgeProjection};
use crate::manifest::ManifestError;
use crate::registry::{bytes_to_mib, Digest};

/// Result type for checks
pub type CheckResult<T> = Result<T, CheckError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    /// A revision identifier is missing or malformed.
    #[error("The {variable} environment variable is invalid: {reason}")]
    InvalidRevision { variable: String, reason: String },

    #[error("Invalid check configuration: {0}")]
    InvalidConfig(String),

    #[error("Could not open the Git repo {path}: {message}")]
    RepositoryOpen { path: String, message: String },

    #[error("Could not checkout revision {revision} of the Git repo {path}: {message}")]
    Checkout {
        revision: String,
        path: String,
        message: String,
    },

    /// The working tree could not be put back on the candidate revision.
    #[error("Could not restore the Git repo to revision {revision}: {message}")]
    RestoreFailed { revision: String, message: String },

    #[error("Could not parse manifests: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Could not generate promotion edges from promoter manifests: {0}")]
    Edges(#[from] EdgeError),

    #[error("{0}")]
    ImagesRemoved(RemovedImages),

    #[error("{0}")]
    ImageSizes(ImageSizeViolations),

    #[error("{0}")]
    ChecksFailed(CheckFailures),
}

impl CheckError {
    /// Whether this is a policy result rather than a system fault.
    pub fn is_policy_violation(&self) -> bool {
        match self {
            Self::ImagesRemoved(_) | Self::ImageSizes(_) => true,
            Self::ChecksFailed(failures) => failures
                .failures
                .iter()
                .all(|(_, err)| err.is_policy_violation()),
            _ => false,
        }
    }

    /// A failed restore leaves shared state behind; nothing else is fatal.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::RestoreFailed { .. } => true,
            Self::ChecksFailed(failures) => failures.failures.iter().any(|(_, err)| err.is_fatal()),
            _ => false,
        }
    }
}

/// Destination images present in the baseline but absent from the candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedImages {
    pub removed: BTreeSet<EdgeProjection>,
}

impl RemovedImages {
    /// Removed image names, sorted and without duplicates.
    pub fn names(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self
            .removed
            .iter()
            .map(|p| p.dst.image_path.as_str())
            .collect();
        names.into_iter().collect()
    }
}

impl fmt::Display for RemovedImages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The following images were removed in this pull request: {}",
            self.names().join(", ")
        )
    }
}

/// One image whose recorded size breaks the size policy.
///
/// Ordered by image name, then digest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SizeViolation {
    pub image_name: String,
    pub digest: Digest,
    pub size_bytes: i64,
}

impl fmt::Display for SizeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} MiB)", self.image_name, bytes_to_mib(self.size_bytes))
    }
}

/// Oversized and invalid images found by one size check run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSizeViolations {
    pub max_image_size_mib: i64,
    pub oversized: BTreeSet<SizeViolation>,
    pub invalid: BTreeSet<SizeViolation>,
}

impl ImageSizeViolations {
    pub fn is_empty(&self) -> bool {
        self.oversized.is_empty() && self.invalid.is_empty()
    }
}

fn join_lines(violations: &BTreeSet<SizeViolation>) -> String {
    violations
        .iter()
        .map(SizeViolation::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

impl fmt::Display for ImageSizeViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.oversized.is_empty() {
            writeln!(
                f,
                "The following images were over the max file size of {}MiB:\n{}",
                self.max_image_size_mib,
                join_lines(&self.oversized)
            )?;
        }
        if !self.invalid.is_empty() {
            writeln!(
                f,
                "The following images had an invalid file size of 0 bytes or less:\n{}",
                join_lines(&self.invalid)
            )?;
        }
        Ok(())
    }
}

/// Every check that failed in one `run_checks` pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckFailures {
    pub failures: Vec<(&'static str, CheckError)>,
}

impl fmt::Display for CheckFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} check(s) failed", self.failures.len())?;
        for (name, err) in &self.failures {
            write!(f, "\n[{}] {}", name, err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::DstImageTag;
    use crate::registry::mib_to_bytes;

    fn digest(c: char) -> Digest {
        Digest::new(format!("sha256:{}", c.to_string().repeat(64))).unwrap()
    }

    fn violation(name: &str, d: char, size: i64) -> SizeViolation {
        SizeViolation {
            image_name: name.to_string(),
            digest: digest(d),
            size_bytes: size,
        }
    }

    #[test]
    fn test_removed_images_text() {
        let removed: BTreeSet<EdgeProjection> = ["gcr.io/p/b", "gcr.io/p/a", "gcr.io/p/b"]
            .iter()
            .zip(['1', '2', '3'])
            .map(|(path, d)| EdgeProjection {
                dst: DstImageTag::new(*path, None),
                digest: digest(d),
            })
            .collect();
        let err = RemovedImages { removed };

        assert_eq!(
            err.to_string(),
            "The following images were removed in this pull request: gcr.io/p/a, gcr.io/p/b"
        );
    }

    #[test]
    fn test_size_violations_text_sorted() {
        let violations = ImageSizeViolations {
            max_image_size_mib: 1,
            oversized: [violation("b", 'a', mib_to_bytes(3)), violation("a", 'b', mib_to_bytes(2))]
                .into_iter()
                .collect(),
            invalid: [violation("c", 'c', 0), violation("a", 'd', -5)].into_iter().collect(),
        };

        assert_eq!(
            violations.to_string(),
            "The following images were over the max file size of 1MiB:\n\
             a (2 MiB)\nb (3 MiB)\n\
             The following images had an invalid file size of 0 bytes or less:\n\
             a (-1 MiB)\nc (0 MiB)\n"
        );
    }

    #[test]
    fn test_same_name_different_digests_both_reported() {
        let violations = ImageSizeViolations {
            max_image_size_mib: 1,
            oversized: [violation("a", 'a', mib_to_bytes(2)), violation("a", 'b', mib_to_bytes(4))]
                .into_iter()
                .collect(),
            invalid: BTreeSet::new(),
        };

        assert_eq!(violations.oversized.len(), 2);
        assert!(violations.to_string().contains("a (2 MiB)\na (4 MiB)"));
    }

    #[test]
    fn test_policy_and_fatal_classification() {
        let removed = CheckError::ImagesRemoved(RemovedImages {
            removed: BTreeSet::new(),
        });
        let restore = CheckError::RestoreFailed {
            revision: "abc".to_string(),
            message: "boom".to_string(),
        };

        assert!(removed.is_policy_violation());
        assert!(!removed.is_fatal());
        assert!(restore.is_fatal());
        assert!(!restore.is_policy_violation());

        let aggregate = CheckError::ChecksFailed(CheckFailures {
            failures: vec![("ImageRemovalCheck", removed), ("Other", restore)],
        });
        assert!(aggregate.is_fatal());
        assert!(!aggregate.is_policy_violation());
    }
}
