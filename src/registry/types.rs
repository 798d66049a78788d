//! Registry naming types
//!
//! Every name that ends up inside a promotion edge is validated once, when it
//! is constructed, so the rest of the crate can compare them by value without
//! re-checking.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::{RegistryError, RegistryResult};

const DIGEST_PATTERN: &str = r"^sha256:[0-9a-f]{64}$";
const TAG_PATTERN: &str = r"^[A-Za-z0-9_][A-Za-z0-9_.-]{0,127}$";
const PATH_COMPONENT_PATTERN: &str = r"^[a-z0-9]+(?:[._-][a-z0-9]+)*$";

fn digest_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(DIGEST_PATTERN).expect("digest pattern is valid"))
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TAG_PATTERN).expect("tag pattern is valid"))
}

fn path_component_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(PATH_COMPONENT_PATTERN).expect("path component pattern is valid")
    })
}

/// Content hash of an image manifest, e.g. `sha256:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

impl Digest {
    /// Parse and validate a digest string.
    pub fn new(value: impl Into<String>) -> RegistryResult<Self> {
        let value = value.into();
        if !digest_regex().is_match(&value) {
            return Err(RegistryError::InvalidDigest(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Digest {
    type Error = RegistryError;

    fn try_from(value: String) -> RegistryResult<Self> {
        Self::new(value)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mutable human-readable label bound to one digest at a time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    /// Parse and validate a tag using the Docker tag grammar.
    pub fn new(value: impl Into<String>) -> RegistryResult<Self> {
        let value = value.into();
        if !tag_regex().is_match(&value) {
            return Err(RegistryError::InvalidTag(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Tag {
    type Error = RegistryError;

    fn try_from(value: String) -> RegistryResult<Self> {
        Self::new(value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Image name relative to a registry, e.g. `pause` or `kube/apiserver`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageName(String);

impl ImageName {
    pub fn new(value: impl Into<String>) -> RegistryResult<Self> {
        let value = value.into();
        let valid = !value.is_empty()
            && value
                .split('/')
                .all(|component| path_component_regex().is_match(component));
        if !valid {
            return Err(RegistryError::InvalidImageName(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ImageName {
    type Error = RegistryError;

    fn try_from(value: String) -> RegistryResult<Self> {
        Self::new(value)
    }
}

impl From<ImageName> for String {
    fn from(name: ImageName) -> Self {
        name.0
    }
}

impl fmt::Display for ImageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Base path of an addressable image namespace, e.g. `gcr.io/k8s-staging-foo`.
///
/// The first component is a host and may carry dots or a port; the remaining
/// components follow the image path grammar.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegistryName(String);

impl RegistryName {
    pub fn new(value: impl Into<String>) -> RegistryResult<Self> {
        let value = value.into();
        let mut components = value.split('/');
        let host_ok = components.next().map_or(false, |host| {
            !host.is_empty()
                && host
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':'))
        });
        let rest_ok = components.all(|component| path_component_regex().is_match(component));
        if !host_ok || !rest_ok {
            return Err(RegistryError::InvalidRegistryName(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Full path of an image inside this registry.
    pub fn image_path(&self, image: &ImageName) -> String {
        format!("{}/{}", self.0, image.0)
    }

    /// Split a full image path into the image name under this registry.
    ///
    /// Returns `None` when the path does not live under this registry.
    pub fn strip_image_path(&self, path: &str) -> Option<ImageName> {
        let rest = path.strip_prefix(self.0.as_str())?.strip_prefix('/')?;
        ImageName::new(rest).ok()
    }
}

impl TryFrom<String> for RegistryName {
    type Error = RegistryError;

    fn try_from(value: String) -> RegistryResult<Self> {
        Self::new(value)
    }
}

impl From<RegistryName> for String {
    fn from(name: RegistryName) -> Self {
        name.0
    }
}

impl fmt::Display for RegistryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

const MIB_SHIFT: u32 = 20;

/// Convert mebibytes to bytes. Exact power-of-two shift, no rounding.
pub fn mib_to_bytes(value: i64) -> i64 {
    value << MIB_SHIFT
}

/// Convert bytes to mebibytes. Arithmetic shift, so negative sizes stay negative.
pub fn bytes_to_mib(value: i64) -> i64 {
    value >> MIB_SHIFT
}

/// Largest ceiling, in MiB, that converts to bytes without overflow.
pub const MAX_CONVERTIBLE_MIB: i64 = i64::MAX >> MIB_SHIFT;

#[cfg(test)]
mod tests {
    use super::*;

    fn sha(c: char) -> String {
        format!("sha256:{}", c.to_string().repeat(64))
    }

    #[test]
    fn test_name_patterns_compile() {
        assert!(digest_regex().is_match(&sha('0')));
        assert!(tag_regex().is_match("v1.2.3-rc_1"));
        assert!(path_component_regex().is_match("kube-apiserver"));
    }

    #[test]
    fn test_digest_accepts_sha256() {
        let digest = Digest::new(sha('a')).unwrap();
        assert_eq!(digest.as_str(), sha('a'));
    }

    #[test]
    fn test_digest_rejects_bad_values() {
        assert!(Digest::new("sha256:abc").is_err());
        assert!(Digest::new(sha('A')).is_err());
        assert!(Digest::new(format!("md5:{}", "a".repeat(64))).is_err());
        assert!(Digest::new("").is_err());
    }

    #[test]
    fn test_tag_grammar() {
        assert!(Tag::new("1.0").is_ok());
        assert!(Tag::new("v1.2.3-rc.1_x").is_ok());
        assert!(Tag::new("").is_err());
        assert!(Tag::new(".hidden").is_err());
        assert!(Tag::new("a".repeat(129)).is_err());
        assert!(Tag::new("a:b").is_err());
    }

    #[test]
    fn test_image_name_grammar() {
        assert!(ImageName::new("pause").is_ok());
        assert!(ImageName::new("kube/api-server").is_ok());
        assert!(ImageName::new("").is_err());
        assert!(ImageName::new("Upper").is_err());
        assert!(ImageName::new("a//b").is_err());
    }

    #[test]
    fn test_registry_image_path_round_trip() {
        let registry = RegistryName::new("us.gcr.io/k8s-artifacts-prod").unwrap();
        let image = ImageName::new("kube/pause").unwrap();
        let path = registry.image_path(&image);

        assert_eq!(path, "us.gcr.io/k8s-artifacts-prod/kube/pause");
        assert_eq!(registry.strip_image_path(&path), Some(image));
        assert_eq!(registry.strip_image_path("gcr.io/other/pause"), None);
    }

    #[test]
    fn test_registry_name_with_port() {
        assert!(RegistryName::new("localhost:5000/staging").is_ok());
        assert!(RegistryName::new("/staging").is_err());
    }

    #[test]
    fn test_mib_round_trip() {
        for x in [0, 1, 2, 1023, 2048, 123_456, MAX_CONVERTIBLE_MIB] {
            assert_eq!(bytes_to_mib(mib_to_bytes(x)), x);
        }
        assert_eq!(mib_to_bytes(1), 1_048_576);
    }

    #[test]
    fn test_bytes_to_mib_truncates() {
        assert_eq!(bytes_to_mib(1_048_575), 0);
        assert_eq!(bytes_to_mib(1_048_577), 1);
        assert_eq!(bytes_to_mib(-5), -1);
    }

    #[test]
    fn test_serde_rejects_invalid_digest() {
        let parsed: Result<Digest, _> = serde_json::from_str("\"sha256:nothex\"");
        assert!(parsed.is_err());
    }
}
