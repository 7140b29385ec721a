//! Snapshot system: queries the ECS world and builds a complete SimSnapshot.
//!
//! This system is read-only; it never modifies the world.

use hecs::World;

use helios_core::components::{SolarPanel, SolarSun};
use helios_core::enums::SimPhase;
use helios_core::events::SimEvent;
use helios_core::state::*;
use helios_core::types::{NetId, Position, RegionId, SimTime};

/// Build a complete SimSnapshot from the current world state.
/// `view_time` is the instant sun bearings are evaluated at (frozen while paused).
pub fn build_snapshot(
    world: &World,
    time: &SimTime,
    phase: SimPhase,
    view_time: f64,
    total_output: f64,
    console: Vec<ConsoleState>,
    events: Vec<SimEvent>,
) -> SimSnapshot {
    SimSnapshot {
        time: *time,
        phase,
        suns: build_suns(world, view_time),
        panels: build_panels(world),
        total_output,
        console,
        events,
    }
}

/// Build SunView list from every region entity.
fn build_suns(world: &World, view_time: f64) -> Vec<SunView> {
    let mut suns: Vec<SunView> = world
        .query::<(&RegionId, &SolarSun)>()
        .iter()
        .map(|(_, (region, sun))| SunView {
            region: *region,
            angle: sun.state.angle_at(view_time),
            angular_velocity: sun.state.angular_velocity(),
        })
        .collect();

    suns.sort_by_key(|s| s.region);
    suns
}

/// Build PanelView list from all panel entities.
fn build_panels(world: &World) -> Vec<PanelView> {
    let mut panels: Vec<PanelView> = world
        .query::<(&NetId, &RegionId, &Position, &SolarPanel)>()
        .iter()
        .map(|(_, (net_id, region, position, panel))| PanelView {
            net_id: *net_id,
            region: *region,
            position: *position,
            angle: panel.angle,
            enabled: panel.enabled,
            current_output: panel.current_output,
            max_output: panel.max_output,
        })
        .collect();

    panels.sort_by_key(|p| p.net_id);
    panels
}
