//! Visibility collaborator for HELIOS.
//!
//! Defines the predicate-based occlusion query the power simulation consumes,
//! and a reference implementation that casts sun rays against anchored boxes.

pub use helios_core as core;

pub mod field;
pub mod los;
pub mod query;

// Re-export key types for convenience.
pub use field::{Blocker, OcclusionField};
pub use los::{bearing_to_vec, ray_hits_box};
pub use query::{VisibilityFault, VisibilityQuery};
