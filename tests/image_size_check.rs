//! Image Size Check Tests
//!
//! Boundaries of the size ceiling and the exact violation report.

use image_promoter::checks::{CheckError, ImageSizeCheck, PreCheck};
use image_promoter::edge::{EdgeBuilder, EdgeSet};
use image_promoter::manifest::{ManifestLoader, ManifestSnapshot};
use image_promoter::registry::{mib_to_bytes, Digest, DigestImageSize, RegistryInventory};

fn digest(c: char) -> Digest {
    Digest::new(format!("sha256:{}", c.to_string().repeat(64))).unwrap()
}

fn edges(images: &[(&str, char)]) -> EdgeSet {
    let mut yaml = String::from(
        "registries:\n- name: gcr.io/staging\n  src: true\n- name: us.gcr.io/prod\nimages:\n",
    );
    for (name, d) in images {
        yaml.push_str(&format!(
            "- name: {}\n  dmap:\n    \"{}\": [\"1.0\"]\n",
            name,
            digest(*d)
        ));
    }
    let snapshot = ManifestSnapshot::new(vec![ManifestLoader::parse(&yaml, "m.yaml").unwrap()]);
    EdgeBuilder::new().build(&snapshot).unwrap()
}

fn sizes(entries: &[(char, i64)]) -> DigestImageSize {
    entries.iter().map(|(d, s)| (digest(*d), *s)).collect()
}

/// Exactly the ceiling passes; one byte over fails.
#[test]
fn test_ceiling_is_inclusive() {
    let at = ImageSizeCheck::new(1, edges(&[("foo", 'a')]), sizes(&[('a', 1_048_576)])).unwrap();
    assert!(at.run().is_ok());

    let over = ImageSizeCheck::new(1, edges(&[("foo", 'a')]), sizes(&[('a', 1_048_577)])).unwrap();
    let err = over.run().unwrap_err();
    assert!(err.is_policy_violation());
    assert_eq!(
        err.to_string(),
        "The following images were over the max file size of 1MiB:\nus.gcr.io/prod/foo (1 MiB)\n"
    );
}

/// Oversized and invalid images are all reported in one run.
#[test]
fn test_full_report() {
    let check = ImageSizeCheck::new(
        10,
        edges(&[("zeta", 'a'), ("alpha", 'b'), ("empty", 'c'), ("fine", 'd'), ("missing", 'e')]),
        sizes(&[
            ('a', mib_to_bytes(30)),
            ('b', mib_to_bytes(11)),
            ('c', 0),
            ('d', mib_to_bytes(10)),
        ]),
    )
    .unwrap();

    let err = check.run().unwrap_err();
    assert_eq!(
        err.to_string(),
        "The following images were over the max file size of 10MiB:\n\
         us.gcr.io/prod/alpha (11 MiB)\n\
         us.gcr.io/prod/zeta (30 MiB)\n\
         The following images had an invalid file size of 0 bytes or less:\n\
         us.gcr.io/prod/empty (0 MiB)\n\
         us.gcr.io/prod/missing (0 MiB)\n"
    );
}

/// Report text is identical across runs.
#[test]
fn test_report_is_deterministic() {
    let build = || {
        ImageSizeCheck::new(1, edges(&[("b", 'b'), ("a", 'a')]), sizes(&[('a', -1), ('b', -1)]))
            .unwrap()
            .run()
            .unwrap_err()
            .to_string()
    };
    assert_eq!(build(), build());
}

/// Sizes can come straight from an inventory snapshot.
#[test]
fn test_sizes_from_inventory() {
    let mut inventory = RegistryInventory::new();
    inventory.insert_size(digest('a'), 512);

    let check = ImageSizeCheck::new(1, edges(&[("foo", 'a')]), inventory.sizes.clone()).unwrap();
    assert_eq!(check.name(), "ImageSizeCheck");
    assert!(check.run().is_ok());
}

/// A non-positive ceiling is a configuration error.
#[test]
fn test_bad_ceiling() {
    let err = ImageSizeCheck::new(0, EdgeSet::new(), DigestImageSize::new()).unwrap_err();
    assert!(matches!(err, CheckError::InvalidConfig(_)));
}
