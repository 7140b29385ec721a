//! Coverage calculator: how much of a panel's rating reaches it right now.
//!
//! The sun sits infinitely far along its bearing. A panel turned straight at
//! it catches its full cross-section; the catch falls off with the cosine of
//! the angle between them (Lambert's cosine law), and anything at or past a
//! right angle catches nothing. A clear line of sight toward the sun is
//! required on top of that.

use hecs::{Entity, World};
use tracing::debug;

use helios_core::components::{Occludable, Occluder};
use helios_core::types::{Position, RegionId};
use helios_occlusion::VisibilityQuery;

/// Alignment below this counts as perpendicular. Absorbs the `cos(π/2) ≈ 6e-17`
/// residue so a panel at a right angle reports exactly zero.
pub const ALIGNMENT_EPSILON: f64 = 1e-12;

/// Inputs for one panel's coverage evaluation.
#[derive(Debug, Clone, Copy)]
pub struct CoverageQuery {
    /// The panel itself, excluded from its own occlusion test.
    pub panel: Entity,
    pub region: RegionId,
    pub position: Position,
    pub panel_angle: f64,
    pub sun_angle: f64,
}

/// Geometric alignment in `[0, 1]`: `max(0, cos(panel - sun))`, hard-clamped
/// to zero at and beyond perpendicular.
pub fn alignment(panel_angle: f64, sun_angle: f64) -> f64 {
    let c = (panel_angle - sun_angle).cos();
    if c <= ALIGNMENT_EPSILON {
        0.0
    } else {
        c.min(1.0)
    }
}

/// Whether an entity stops sunlight. Entities without a body never do.
pub fn is_solid(world: &World, entity: Entity) -> bool {
    world
        .get::<&Occluder>(entity)
        .map(|occluder| occluder.is_solid())
        .unwrap_or(false)
}

/// Coverage in `[0, 1]` for one panel.
///
/// Zero alignment skips the ray cast. A blocked ray, or a visibility fault,
/// yields zero.
pub fn compute_coverage(
    world: &World,
    visibility: &dyn VisibilityQuery,
    query: &CoverageQuery,
    max_distance: f64,
) -> f64 {
    let alignment = alignment(query.panel_angle, query.sun_angle);
    if alignment == 0.0 {
        return 0.0;
    }

    let passable = |entity: Entity| entity == query.panel || !is_solid(world, entity);
    match visibility.query_occluded(
        query.region,
        query.position,
        query.sun_angle,
        max_distance,
        &passable,
    ) {
        Ok(false) => alignment,
        Ok(true) => 0.0,
        Err(fault) => {
            debug!(panel = ?query.panel, %fault, "visibility query failed, treating panel as occluded");
            0.0
        }
    }
}
