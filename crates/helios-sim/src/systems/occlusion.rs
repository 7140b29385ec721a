//! Rebuilds the occlusion field from the world's bodies.

use hecs::World;

use helios_core::components::{Occluder, SolarSun};
use helios_core::types::{Position, RegionId};
use helios_occlusion::{Blocker, OcclusionField};

/// Refill `field` with every occluder body. Every region that owns a sun is
/// loaded even when nothing stands in it.
pub fn rebuild(world: &World, field: &mut OcclusionField) {
    field.clear();

    for (_entity, (region, _sun)) in world.query::<(&RegionId, &SolarSun)>().iter() {
        field.load_region(*region);
    }

    for (entity, (position, region, occluder)) in world
        .query::<(&Position, &RegionId, &Occluder)>()
        .iter()
    {
        field.push(Blocker {
            entity,
            region: *region,
            center: *position,
            half_extents: occluder.half_extents,
        });
    }
}
