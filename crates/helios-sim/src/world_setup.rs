//! Entity spawn factories for setting up the simulation world.
//!
//! Creates region (sun), panel, occluder, and console entities with
//! appropriate component bundles.

use std::f64::consts::TAU;

use hecs::World;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use helios_core::angular::AngularState;
use helios_core::components::*;
use helios_core::constants::*;
use helios_core::types::{NetId, Position, RegionId};

/// Draw a fresh sun anchored at `now`.
///
/// The anchor angle is uniform over the full circle; the velocity lies in
/// `SUN_BASE_VELOCITY ± SUN_VELOCITY_JITTER / 2`.
pub fn random_sun(rng: &mut ChaCha8Rng, now: f64) -> SolarSun {
    let u1: f64 = rng.gen();
    let u2: f64 = rng.gen();
    let velocity = SUN_BASE_VELOCITY + (u2 - 0.5) * SUN_VELOCITY_JITTER;
    SolarSun {
        state: AngularState::new(TAU * u1, velocity, now),
    }
}

/// Spawn a region entity carrying its sun. Marked dirty so the sun's first
/// anchor is replicated.
pub fn spawn_region(
    world: &mut World,
    region: RegionId,
    net_id: NetId,
    sun: SolarSun,
) -> hecs::Entity {
    world.spawn((region, net_id, sun, Dirty))
}

/// Spawn a panel with a solid physical body.
pub fn spawn_panel(
    world: &mut World,
    region: RegionId,
    net_id: NetId,
    position: Position,
    panel: SolarPanel,
) -> hecs::Entity {
    world.spawn((
        region,
        net_id,
        position,
        panel,
        Occluder {
            half_extents: (PANEL_HALF_EXTENT, PANEL_HALF_EXTENT),
            anchored: true,
            opaque: true,
        },
        Dirty,
    ))
}

/// Spawn a static obstruction.
pub fn spawn_occluder(
    world: &mut World,
    region: RegionId,
    position: Position,
    occluder: Occluder,
) -> hecs::Entity {
    world.spawn((region, position, occluder))
}

/// Spawn an operator console bound to a region.
pub fn spawn_console(world: &mut World, region: RegionId) -> hecs::Entity {
    world.spawn((SolarConsole, region))
}

/// Panel positions of the default array: a 4×4 grid, two units apart.
pub fn default_grid_positions() -> Vec<Position> {
    let mut positions = Vec::with_capacity(16);
    for row in 0..4 {
        for col in 0..4 {
            positions.push(Position::new(col as f64 * 2.0, row as f64 * 2.0));
        }
    }
    positions
}

/// The default array's wall: a long anchored slab north of the grid's
/// western half.
pub fn default_wall() -> (Position, Occluder) {
    (
        Position::new(1.0, 12.0),
        Occluder {
            half_extents: (2.0, 0.5),
            anchored: true,
            opaque: true,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_random_sun_within_band() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        for _ in 0..100 {
            let sun = random_sun(&mut rng, 3.0);
            let v = sun.state.angular_velocity();
            assert!(v >= SUN_BASE_VELOCITY - SUN_VELOCITY_JITTER / 2.0 - 1e-15);
            assert!(v < SUN_BASE_VELOCITY + SUN_VELOCITY_JITTER / 2.0);
            assert!((0.0..TAU).contains(&sun.state.anchor_angle()));
            assert_eq!(sun.state.anchor_time(), 3.0);
        }
    }

    #[test]
    fn test_spawn_panel_has_solid_body() {
        let mut world = World::new();
        let panel = SolarPanel::new(AngularState::fixed(0.0, 0.0), 100.0);
        let e = spawn_panel(
            &mut world,
            RegionId(1),
            NetId(5),
            Position::new(1.0, 1.0),
            panel,
        );
        assert!(world.get::<&Occluder>(e).unwrap().is_solid());
        assert!(world.get::<&Dirty>(e).is_ok());
    }

    #[test]
    fn test_default_grid_is_sixteen_panels() {
        let positions = default_grid_positions();
        assert_eq!(positions.len(), 16);
        assert_eq!(positions[15], Position::new(6.0, 6.0));
    }
}
