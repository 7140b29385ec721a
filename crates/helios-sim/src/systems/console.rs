//! Operator console: throttled state pushes and bulk panel retargeting.

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};

use helios_core::angular::normalize_angle;
use helios_core::components::{Dirty, SolarConsole, SolarPanel};
use helios_core::state::ConsoleState;
use helios_core::types::RegionId;

use super::panel_power::sun_angles;

/// The rotation every panel is told to follow. Shared by all panels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelTargets {
    /// Anchor angle applied at the command instant (radians).
    pub angle: f64,
    /// Angular velocity applied from the command instant (rad/s).
    pub velocity: f64,
}

impl PanelTargets {
    /// Validate and apply an operator request. Absent or non-finite fields are
    /// ignored; the rotation is normalized and the velocity clamped to
    /// `±max_velocity` with its sign kept.
    ///
    /// Returns true if any field was accepted.
    pub fn apply(
        &mut self,
        rotation: Option<f64>,
        angular_velocity: Option<f64>,
        max_velocity: f64,
    ) -> bool {
        let mut updated = false;

        if let Some(rotation) = rotation.filter(|r| r.is_finite()) {
            self.angle = normalize_angle(rotation);
            updated = true;
        }

        if let Some(velocity) = angular_velocity.filter(|v| v.is_finite()) {
            let limit = max_velocity.abs();
            self.velocity = velocity.min(limit).max(-limit);
            updated = true;
        }

        updated
    }
}

/// Re-anchor every panel to `now` with the targets and mark it dirty.
/// Returns the number of panels touched.
pub fn refresh_all_panels(
    world: &mut World,
    targets: &PanelTargets,
    now: f64,
    dirty_buffer: &mut Vec<Entity>,
) -> u32 {
    dirty_buffer.clear();

    for (entity, panel) in world.query_mut::<&mut SolarPanel>() {
        panel.state.reanchor(targets.angle, targets.velocity, now);
        dirty_buffer.push(entity);
    }

    let count = dirty_buffer.len() as u32;
    for entity in dirty_buffer.drain(..) {
        let _ = world.insert_one(entity, Dirty);
    }
    count
}

/// Fires at most once per interval of host time. Runs while paused.
#[derive(Debug, Clone)]
pub struct ConsoleThrottle {
    interval: f64,
    elapsed: f64,
}

/// Slack for accumulated tick-length rounding.
const THROTTLE_EPSILON: f64 = 1e-9;

impl ConsoleThrottle {
    pub fn new(interval_secs: f64) -> Self {
        Self {
            interval: interval_secs,
            elapsed: 0.0,
        }
    }

    /// Accumulate `frame_secs`; true when a push is due.
    pub fn update(&mut self, frame_secs: f64) -> bool {
        if self.interval <= 0.0 {
            return true;
        }
        self.elapsed += frame_secs;
        if self.elapsed + THROTTLE_EPSILON >= self.interval {
            self.elapsed -= self.interval;
            true
        } else {
            false
        }
    }
}

/// One `ConsoleState` per console entity, sorted by region.
pub fn build_console_states(
    world: &World,
    targets: &PanelTargets,
    total_output: f64,
    is_paused: bool,
    now: f64,
) -> Vec<ConsoleState> {
    let suns = sun_angles(world, now);

    let mut states: Vec<ConsoleState> = world
        .query::<(&SolarConsole, &RegionId)>()
        .iter()
        .map(|(_, (_, region))| ConsoleState {
            region: *region,
            target_angle: targets.angle,
            target_velocity: targets.velocity,
            total_output,
            sun_direction: suns.get(region).copied(),
            is_paused,
        })
        .collect();

    states.sort_by_key(|s| s.region);
    states
}
