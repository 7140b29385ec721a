//! The visibility collaborator contract consumed by the power simulation.

use hecs::Entity;
use thiserror::Error;

use helios_core::types::{Position, RegionId};

/// A visibility query could not give a definite answer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VisibilityFault {
    #[error("ray has a non-finite origin or direction")]
    NonFiniteRay,
    #[error("query would test {count} blockers, limit is {limit}")]
    TooManyBlockers { count: usize, limit: usize },
    #[error("region {0:?} has no loaded collision data")]
    RegionUnavailable(RegionId),
}

/// Bounded-distance ray query against whatever geometry a region contains.
pub trait VisibilityQuery {
    /// Cast a ray from `origin` along `direction` (radians, 0 = North,
    /// clockwise) out to `max_distance`.
    ///
    /// `passable` names the entities allowed not to block; every other entity
    /// whose body the ray crosses within range is a hit. Returns whether any
    /// hit occurred.
    fn query_occluded(
        &self,
        region: RegionId,
        origin: Position,
        direction: f64,
        max_distance: f64,
        passable: &dyn Fn(Entity) -> bool,
    ) -> Result<bool, VisibilityFault>;
}
