//! Image size check
//!
//! Every candidate edge's image must be no larger than the configured ceiling
//! and must report a positive size.

use std::collections::BTreeSet;

use super::errors::{CheckError, CheckResult, ImageSizeViolations, SizeViolation};
use super::PreCheck;
use crate::edge::EdgeSet;
use crate::registry::{mib_to_bytes, DigestImageSize, MAX_CONVERTIBLE_MIB};

#[derive(Debug)]
pub struct ImageSizeCheck {
    max_image_size_mib: i64,
    candidate_edges: EdgeSet,
    sizes: DigestImageSize,
}

impl ImageSizeCheck {
    /// Fails if the ceiling is not positive or does not fit in bytes.
    pub fn new(
        max_image_size_mib: i64,
        candidate_edges: EdgeSet,
        sizes: DigestImageSize,
    ) -> CheckResult<Self> {
        if max_image_size_mib <= 0 || max_image_size_mib > MAX_CONVERTIBLE_MIB {
            return Err(CheckError::InvalidConfig(format!(
                "max image size must be between 1 and {} MiB, got {}",
                MAX_CONVERTIBLE_MIB, max_image_size_mib
            )));
        }
        Ok(Self {
            max_image_size_mib,
            candidate_edges,
            sizes,
        })
    }

    pub fn max_image_size_mib(&self) -> i64 {
        self.max_image_size_mib
    }

    /// Report every oversized and every invalid image in one pass.
    pub fn run(&self) -> CheckResult<()> {
        let ceiling = mib_to_bytes(self.max_image_size_mib);
        let mut oversized = BTreeSet::new();
        let mut invalid = BTreeSet::new();

        for edge in &self.candidate_edges {
            // A digest missing from the inventory reads as 0
            let size = self.sizes.get(&edge.digest).copied().unwrap_or(0);
            let violation = || SizeViolation {
                image_name: edge.image_name().to_string(),
                digest: edge.digest.clone(),
                size_bytes: size,
            };

            if size > ceiling {
                oversized.insert(violation());
            }
            if size <= 0 {
                invalid.insert(violation());
            }
        }

        let violations = ImageSizeViolations {
            max_image_size_mib: self.max_image_size_mib,
            oversized,
            invalid,
        };
        if violations.is_empty() {
            Ok(())
        } else {
            Err(CheckError::ImageSizes(violations))
        }
    }
}

impl PreCheck for ImageSizeCheck {
    fn name(&self) -> &'static str {
        "ImageSizeCheck"
    }

    fn run(&self) -> CheckResult<()> {
        ImageSizeCheck::run(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::{DstImageTag, PromotionEdge};
    use crate::registry::{Digest, ImageName, RegistryName, Tag};

    fn digest(c: char) -> Digest {
        Digest::new(format!("sha256:{}", c.to_string().repeat(64))).unwrap()
    }

    fn edge(name: &str, d: char) -> PromotionEdge {
        PromotionEdge {
            dst: DstImageTag::new(format!("us.gcr.io/prod/{}", name), Some(Tag::new("1.0").unwrap())),
            digest: digest(d),
            parent_digest: None,
            src_registry: RegistryName::new("gcr.io/staging").unwrap(),
            src_image: ImageName::new(name).unwrap(),
            dst_registry: RegistryName::new("us.gcr.io/prod").unwrap(),
        }
    }

    fn check(sizes: &[(char, i64)]) -> ImageSizeCheck {
        let edges: EdgeSet = sizes
            .iter()
            .enumerate()
            .map(|(i, (d, _))| edge(&format!("img{}", i), *d))
            .collect();
        let sizes: DigestImageSize = sizes.iter().map(|(d, s)| (digest(*d), *s)).collect();
        ImageSizeCheck::new(1, edges, sizes).unwrap()
    }

    fn violations(err: CheckError) -> ImageSizeViolations {
        match err {
            CheckError::ImageSizes(v) => v,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_ceiling_boundary() {
        assert!(check(&[('a', 1_048_576)]).run().is_ok());

        let v = violations(check(&[('a', 1_048_577)]).run().unwrap_err());
        assert_eq!(v.oversized.len(), 1);
        assert!(v.invalid.is_empty());
    }

    #[test]
    fn test_zero_and_negative_are_invalid() {
        let v = violations(check(&[('a', 0), ('b', -5), ('c', 500)]).run().unwrap_err());

        assert!(v.oversized.is_empty());
        let names: Vec<&str> = v.invalid.iter().map(|s| s.image_name.as_str()).collect();
        assert_eq!(names, vec!["us.gcr.io/prod/img0", "us.gcr.io/prod/img1"]);
    }

    #[test]
    fn test_missing_size_is_invalid() {
        let edges: EdgeSet = [edge("a", 'a')].into_iter().collect();
        let check = ImageSizeCheck::new(1, edges, DigestImageSize::new()).unwrap();

        let v = violations(check.run().unwrap_err());
        assert_eq!(v.invalid.iter().next().unwrap().size_bytes, 0);
    }

    #[test]
    fn test_invalid_ceiling_rejected() {
        assert!(ImageSizeCheck::new(0, EdgeSet::new(), DigestImageSize::new()).is_err());
        assert!(ImageSizeCheck::new(-1, EdgeSet::new(), DigestImageSize::new()).is_err());
        assert!(
            ImageSizeCheck::new(MAX_CONVERTIBLE_MIB + 1, EdgeSet::new(), DigestImageSize::new())
                .is_err()
        );
        assert!(
            ImageSizeCheck::new(MAX_CONVERTIBLE_MIB, EdgeSet::new(), DigestImageSize::new())
                .is_ok()
        );
    }
}
