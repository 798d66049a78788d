//! Manifest discovery and loading
//!
//! Every file named `promoter-manifest.yaml` below the root directory is one
//! manifest. Files are visited in sorted path order so that a snapshot is a
//! pure function of the directory contents.

use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{ManifestError, ManifestResult};
use super::types::{Manifest, ManifestSnapshot};
use crate::observability::{log_event_with_fields, Event};

/// File name that marks a promoter manifest.
pub const MANIFEST_FILE_NAME: &str = "promoter-manifest.yaml";

/// Loads manifests from a directory tree.
pub struct ManifestLoader {
    root: PathBuf,
}

impl ManifestLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Discover, parse and validate every manifest under the root.
    pub fn load(&self) -> ManifestResult<ManifestSnapshot> {
        let mut paths = Vec::new();
        collect_manifest_paths(&self.root, &mut paths)?;
        paths.sort();

        if paths.is_empty() {
            return Err(ManifestError::NoManifests(self.root.display().to_string()));
        }

        let manifests = paths
            .iter()
            .map(|path| Self::load_file(path))
            .collect::<ManifestResult<Vec<_>>>()?;

        log_event_with_fields(
            Event::ManifestsLoaded,
            &[
                ("count", &manifests.len().to_string()),
                ("root", &self.root.display().to_string()),
            ],
        );

        Ok(ManifestSnapshot::new(manifests))
    }

    /// Parse and validate a single manifest file.
    pub fn load_file(path: &Path) -> ManifestResult<Manifest> {
        let content = fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse and validate manifest text. `origin` names it in errors.
    pub fn parse(content: &str, origin: &str) -> ManifestResult<Manifest> {
        let mut manifest: Manifest =
            serde_yaml::from_str(content).map_err(|e| ManifestError::Parse {
                path: origin.to_string(),
                message: e.to_string(),
            })?;
        manifest.origin = origin.to_string();
        manifest.validate()?;
        Ok(manifest)
    }
}

fn collect_manifest_paths(dir: &Path, out: &mut Vec<PathBuf>) -> ManifestResult<()> {
    let io_error = |e: std::io::Error| ManifestError::Io {
        path: dir.display().to_string(),
        message: e.to_string(),
    };

    for entry in fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(io_error)?;

        if file_type.is_dir() {
            // Skip VCS metadata
            if path.file_name().map_or(false, |name| name == ".git") {
                continue;
            }
            collect_manifest_paths(&path, out)?;
        } else if path
            .file_name()
            .map_or(false, |name| name == MANIFEST_FILE_NAME)
        {
            out.push(path);
        }
    }

    Ok(())
}
