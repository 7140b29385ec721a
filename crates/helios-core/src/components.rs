//! ECS components for hecs entities.
//!
//! Components are plain data structs. Simulation logic lives in systems;
//! the one exception is the `Occludable` capability, which lets the
//! visibility predicate ask an entity whether it blocks light.

use serde::{Deserialize, Serialize};

use crate::angular::AngularState;

/// The light source of a region. Attached to the region entity.
/// Infinitely distant: only its angle matters.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SolarSun {
    pub state: AngularState,
}

/// A rotating solar collector.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolarPanel {
    /// Anchored rotation. Only rewritten by operator commands, resume
    /// correction, restore, and replication.
    pub state: AngularState,
    /// Disabled panels produce nothing.
    pub enabled: bool,
    /// Rated output at perfect alignment (watts, >= 0).
    pub max_output: f64,
    /// Output computed on the last running tick (watts).
    pub current_output: f64,
    /// Orientation computed on the last running tick (radians, for display).
    pub angle: f64,
}

/// A physical body that may block sunlight, as an axis-aligned box centered on
/// the entity's `Position`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Occluder {
    /// Half width (x) and half height (y), world units.
    pub half_extents: (f64, f64),
    /// Fixed to the ground. Loose objects never cast shadows.
    pub anchored: bool,
    /// Stops light. Glass, railings and similar are not opaque.
    pub opaque: bool,
}

/// Capability: does this entity block a sun ray?
pub trait Occludable {
    fn is_solid(&self) -> bool;
}

impl Occludable for Occluder {
    fn is_solid(&self) -> bool {
        self.anchored && self.opaque
    }
}

/// Marks an entity whose angular state changed and must be pushed to observers
/// at the next synchronization opportunity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dirty;

/// Marks an operator console that receives throttled `ConsoleState` pushes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SolarConsole;

impl SolarPanel {
    pub fn new(state: AngularState, max_output: f64) -> Self {
        Self {
            state,
            enabled: true,
            max_output: max_output.max(0.0),
            current_output: 0.0,
            angle: state.anchor_angle(),
        }
    }
}
