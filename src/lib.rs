//! image-promoter - container image promotion gate and registry auditor
//!
//! Promotion intent is declared in manifests and reduced to a set of
//! promotion edges. The edge set is consumed by the pre-promotion checks
//! (no image may disappear, no image may exceed the size ceiling) and by the
//! auditor, which classifies observed registry mutations against it.

pub mod audit;
pub mod checks;
pub mod cli;
pub mod edge;
pub mod manifest;
pub mod observability;
pub mod registry;
