//! Simulation snapshot: the visible state handed to viewers after each tick.

use serde::{Deserialize, Serialize};

use crate::enums::SimPhase;
use crate::events::SimEvent;
use crate::types::{NetId, Position, RegionId, SimTime};

/// Complete visible state produced by every tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimSnapshot {
    pub time: SimTime,
    pub phase: SimPhase,
    pub suns: Vec<SunView>,
    pub panels: Vec<PanelView>,
    /// Sum of every panel's current output (watts).
    pub total_output: f64,
    /// Console pushes. Empty except on ticks where the console throttle fires.
    pub console: Vec<ConsoleState>,
    pub events: Vec<SimEvent>,
}

/// A region's sun for display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SunView {
    pub region: RegionId,
    /// Current direction toward the sun (radians, 0 = North).
    pub angle: f64,
    pub angular_velocity: f64,
}

/// A panel for display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PanelView {
    pub net_id: NetId,
    pub region: RegionId,
    pub position: Position,
    /// Orientation (radians, 0 = North).
    pub angle: f64,
    pub enabled: bool,
    pub current_output: f64,
    pub max_output: f64,
}

/// Aggregate pushed to a solar control console.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsoleState {
    pub region: RegionId,
    pub target_angle: f64,
    pub target_velocity: f64,
    /// Output summed over every region, not just `region`.
    pub total_output: f64,
    /// Direction toward this region's sun, if the region has one.
    pub sun_direction: Option<f64>,
    pub is_paused: bool,
}
