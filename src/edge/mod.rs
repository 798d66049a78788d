//! Promotion edges
//!
//! The shared vocabulary of the gate and the auditor. A promotion edge is the
//! minimal unit of intent: one image that should exist at a destination path,
//! with a given digest and optional tag.

mod builder;
#[allow(clippy::module_inception)]
mod edge;
mod errors;

pub use builder::EdgeBuilder;
pub use edge::{DstImageTag, EdgeProjection, EdgeSet, PromotionEdge};
pub use errors::{EdgeError, EdgeResult, TagConflict};
