//! Revisions of the manifest repository
//!
//! The removal check needs the manifests as they were at the baseline
//! revision. Reading them mutates a working tree shared with the rest of the
//! promoter, so access goes through `SharedWorktree`, which hands out one
//! exclusive guard at a time.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex, MutexGuard};

use super::errors::{CheckError, CheckResult};
use crate::manifest::{ManifestLoader, ManifestSnapshot};

/// Variable naming the baseline (target branch) revision.
pub const BASELINE_SHA_VAR: &str = "PULL_BASE_SHA";
/// Variable naming the candidate (pull request) revision.
pub const CANDIDATE_SHA_VAR: &str = "PULL_PULL_SHA";

const GIT_SHA_LENGTH: usize = 40;

/// A full 40-character hexadecimal Git commit hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GitSha(String);

impl GitSha {
    /// Parse a commit hash. Returns a human-readable reason on failure.
    pub fn parse(value: &str) -> Result<Self, String> {
        if value.len() != GIT_SHA_LENGTH {
            return Err(format!(
                "Length of SHA is {} characters, should be {}",
                value.len(),
                GIT_SHA_LENGTH
            ));
        }
        hex::decode(value).map_err(|e| format!("Not a valid SHA: {}", e))?;
        Ok(Self(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GitSha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Baseline and candidate revisions, validated once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionConfig {
    pub baseline: GitSha,
    pub candidate: GitSha,
}

impl RevisionConfig {
    /// Validate two revision identifiers.
    pub fn parse(baseline: &str, candidate: &str) -> CheckResult<Self> {
        Ok(Self {
            baseline: parse_named(BASELINE_SHA_VAR, baseline)?,
            candidate: parse_named(CANDIDATE_SHA_VAR, candidate)?,
        })
    }

    /// Read `PULL_BASE_SHA` and `PULL_PULL_SHA` through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> CheckResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |variable: &str| {
            lookup(variable).ok_or_else(|| CheckError::InvalidRevision {
                variable: variable.to_string(),
                reason: "variable is not set".to_string(),
            })
        };
        let baseline = read(BASELINE_SHA_VAR)?;
        let candidate = read(CANDIDATE_SHA_VAR)?;
        Self::parse(&baseline, &candidate)
    }

    /// Read the revisions from the process environment.
    pub fn from_env() -> CheckResult<Self> {
        Self::from_lookup(|variable| env::var(variable).ok())
    }
}

fn parse_named(variable: &str, value: &str) -> CheckResult<GitSha> {
    GitSha::parse(value).map_err(|reason| CheckError::InvalidRevision {
        variable: variable.to_string(),
        reason,
    })
}

/// Access to the manifest repository at arbitrary revisions.
pub trait RevisionReader: Send {
    /// Move the working tree to `revision` and parse its manifests.
    fn materialize(&mut self, revision: &GitSha) -> CheckResult<ManifestSnapshot>;

    /// Move the working tree back to `revision`.
    fn restore(&mut self, revision: &GitSha) -> CheckResult<()>;
}

/// A revision reader behind an exclusive lock.
///
/// Clones share the same lock; holding the guard is the critical section
/// for every reader of the working tree.
pub struct SharedWorktree<R> {
    inner: Arc<Mutex<R>>,
}

impl<R: RevisionReader> SharedWorktree<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reader)),
        }
    }

    /// Acquire exclusive access. A poisoned lock is recovered; the next
    /// `restore` rewrites the checkout.
    pub fn lock(&self) -> MutexGuard<'_, R> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<R> Clone for SharedWorktree<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Revision reader over a local Git clone, driven through the `git` binary.
pub struct GitRevisionReader {
    repo_path: PathBuf,
    manifest_dir: PathBuf,
}

impl GitRevisionReader {
    /// Open the repository at `repo_path`. `manifest_dir` is relative to it.
    pub fn open(repo_path: impl Into<PathBuf>, manifest_dir: impl Into<PathBuf>) -> CheckResult<Self> {
        let repo_path = repo_path.into();
        let output = Command::new("git")
            .arg("-C")
            .arg(&repo_path)
            .args(["rev-parse", "--git-dir"])
            .output()
            .map_err(|e| CheckError::RepositoryOpen {
                path: repo_path.display().to_string(),
                message: format!("failed to run git: {}", e),
            })?;
        if !output.status.success() {
            return Err(CheckError::RepositoryOpen {
                path: repo_path.display().to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(Self {
            repo_path,
            manifest_dir: manifest_dir.into(),
        })
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn checkout(&self, revision: &GitSha) -> CheckResult<()> {
        let checkout_error = |message: String| CheckError::Checkout {
            revision: revision.to_string(),
            path: self.repo_path.display().to_string(),
            message,
        };

        let output = Command::new("git")
            .arg("-C")
            .arg(&self.repo_path)
            .args(["checkout", "--force", "--quiet", revision.as_str(), "--"])
            .output()
            .map_err(|e| checkout_error(format!("failed to run git checkout: {}", e)))?;

        if !output.status.success() {
            return Err(checkout_error(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}

impl RevisionReader for GitRevisionReader {
    fn materialize(&mut self, revision: &GitSha) -> CheckResult<ManifestSnapshot> {
        self.checkout(revision)?;
        let snapshot = ManifestLoader::new(self.repo_path.join(&self.manifest_dir)).load()?;
        Ok(snapshot)
    }

    fn restore(&mut self, revision: &GitSha) -> CheckResult<()> {
        self.checkout(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SHA_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const SHA_B: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn test_git_sha_valid() {
        assert_eq!(GitSha::parse(SHA_B).unwrap().as_str(), SHA_B);
        assert_eq!(
            GitSha::parse(&SHA_B.to_uppercase()).unwrap().as_str(),
            SHA_B
        );
    }

    #[test]
    fn test_git_sha_wrong_length() {
        let err = GitSha::parse(&SHA_A[..39]).unwrap_err();
        assert_eq!(err, "Length of SHA is 39 characters, should be 40");
    }

    #[test]
    fn test_git_sha_not_hex() {
        let bad = format!("{}g", &SHA_A[..39]);
        let err = GitSha::parse(&bad).unwrap_err();
        assert!(err.starts_with("Not a valid SHA"));
    }

    #[test]
    fn test_from_lookup_names_offending_variable() {
        let vars: HashMap<&str, String> = [
            (BASELINE_SHA_VAR, SHA_A.to_string()),
            (CANDIDATE_SHA_VAR, "short".to_string()),
        ]
        .into_iter()
        .collect();

        let err = RevisionConfig::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "The PULL_PULL_SHA environment variable is invalid: Length of SHA is 5 characters, should be 40"
        );
    }

    #[test]
    fn test_from_lookup_missing_variable() {
        let err = RevisionConfig::from_lookup(|_| None).unwrap_err();
        match err {
            CheckError::InvalidRevision { variable, .. } => assert_eq!(variable, BASELINE_SHA_VAR),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_from_lookup_valid() {
        let config = RevisionConfig::from_lookup(|k| match k {
            BASELINE_SHA_VAR => Some(SHA_A.to_string()),
            CANDIDATE_SHA_VAR => Some(SHA_B.to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.baseline.as_str(), SHA_A);
        assert_eq!(config.candidate.as_str(), SHA_B);
    }

    #[test]
    fn test_open_non_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = GitRevisionReader::open(dir.path().join("missing"), "manifests");
        assert!(matches!(result, Err(CheckError::RepositoryOpen { .. })));
    }
}
