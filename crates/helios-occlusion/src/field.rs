//! OcclusionField: the blocking bodies of every loaded region.

use std::collections::HashSet;

use hecs::Entity;

use helios_core::constants::MAX_BLOCKERS_PER_QUERY;
use helios_core::types::{Position, RegionId};

/// One axis-aligned box that can stop a sun ray.
#[derive(Debug, Clone, Copy)]
pub struct Blocker {
    pub entity: Entity,
    pub region: RegionId,
    pub center: Position,
    /// Half width (x) and half height (y).
    pub half_extents: (f64, f64),
}

/// Collision geometry for line-of-sight checks, grouped by region.
///
/// The field does not decide which bodies block; the query predicate does.
#[derive(Debug, Clone)]
pub struct OcclusionField {
    blockers: Vec<Blocker>,
    loaded: HashSet<RegionId>,
    limit: usize,
}

impl Default for OcclusionField {
    fn default() -> Self {
        Self::with_limit(MAX_BLOCKERS_PER_QUERY)
    }
}

impl OcclusionField {
    pub fn new() -> Self {
        Self::default()
    }

    /// A field that faults any query over more than `limit` blockers.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            blockers: Vec::new(),
            loaded: HashSet::new(),
            limit,
        }
    }

    /// Drop all geometry, keeping allocations for the next rebuild.
    pub fn clear(&mut self) {
        self.blockers.clear();
        self.loaded.clear();
    }

    /// Mark a region's collision data as present (possibly with no blockers).
    pub fn load_region(&mut self, region: RegionId) {
        self.loaded.insert(region);
    }

    pub fn is_loaded(&self, region: RegionId) -> bool {
        self.loaded.contains(&region)
    }

    /// Add a blocker; its region becomes loaded.
    pub fn push(&mut self, blocker: Blocker) {
        self.loaded.insert(blocker.region);
        self.blockers.push(blocker);
    }

    pub fn len(&self) -> usize {
        self.blockers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blockers.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// All blockers standing in `region`.
    pub fn blockers_in(&self, region: RegionId) -> impl Iterator<Item = &Blocker> {
        self.blockers.iter().filter(move |b| b.region == region)
    }
}
