//! Line-of-sight toward the sun.
//!
//! The sun is infinitely far away, so a sun ray is a half-line from the panel
//! along the sun's bearing, cut off at a fixed check distance. Each candidate
//! blocker is tested with a slab intersection against its box.

use glam::DVec2;
use hecs::Entity;

use helios_core::types::{Position, RegionId};

use crate::field::OcclusionField;
use crate::query::{VisibilityFault, VisibilityQuery};

/// Below this a ray direction component counts as parallel to the slab.
const PARALLEL_EPSILON: f64 = 1e-12;

/// Unit vector for a bearing (0 = North = +y, clockwise toward East = +x).
pub fn bearing_to_vec(bearing: f64) -> DVec2 {
    DVec2::new(bearing.sin(), bearing.cos())
}

/// Does the segment `origin + t * dir`, `t ∈ [0, max_distance]`, touch the box
/// `[lo, hi]`? `dir` must be a unit vector. An origin inside the box is a hit.
pub fn ray_hits_box(origin: DVec2, dir: DVec2, max_distance: f64, lo: DVec2, hi: DVec2) -> bool {
    let mut t_enter = 0.0_f64;
    let mut t_exit = max_distance;

    for axis in 0..2 {
        let o = origin[axis];
        let d = dir[axis];
        if d.abs() < PARALLEL_EPSILON {
            // Parallel: must already lie between the slabs.
            if o < lo[axis] || o > hi[axis] {
                return false;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t0 = (lo[axis] - o) * inv;
        let mut t1 = (hi[axis] - o) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_enter = t_enter.max(t0);
        t_exit = t_exit.min(t1);
        if t_enter > t_exit {
            return false;
        }
    }

    true
}

impl VisibilityQuery for OcclusionField {
    fn query_occluded(
        &self,
        region: RegionId,
        origin: Position,
        direction: f64,
        max_distance: f64,
        passable: &dyn Fn(Entity) -> bool,
    ) -> Result<bool, VisibilityFault> {
        if !origin.is_finite() || !direction.is_finite() || max_distance.is_nan() {
            return Err(VisibilityFault::NonFiniteRay);
        }
        if !self.is_loaded(region) {
            return Err(VisibilityFault::RegionUnavailable(region));
        }
        if max_distance <= 0.0 {
            return Ok(false);
        }

        let o = DVec2::new(origin.x, origin.y);
        let dir = bearing_to_vec(direction);
        let end = o + dir * max_distance;
        let (seg_lo, seg_hi) = (o.min(end), o.max(end));

        // Only boxes overlapping the segment's bounds can be hit.
        let candidates: Vec<(DVec2, DVec2)> = self
            .blockers_in(region)
            .filter(|blocker| !passable(blocker.entity))
            .map(|blocker| {
                let center = DVec2::new(blocker.center.x, blocker.center.y);
                let half = DVec2::new(blocker.half_extents.0, blocker.half_extents.1);
                (center - half, center + half)
            })
            .filter(|(lo, hi)| lo.cmple(seg_hi).all() && hi.cmpge(seg_lo).all())
            .collect();

        if candidates.len() > self.limit() {
            return Err(VisibilityFault::TooManyBlockers {
                count: candidates.len(),
                limit: self.limit(),
            });
        }

        Ok(candidates
            .iter()
            .any(|(lo, hi)| ray_hits_box(o, dir, max_distance, *lo, *hi)))
    }
}
