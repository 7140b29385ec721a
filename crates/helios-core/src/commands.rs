//! Operator commands sent from consoles to the simulation.
//!
//! Commands are validated and queued for processing at the next tick boundary.

use serde::{Deserialize, Serialize};

use crate::types::NetId;

/// All possible operator actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OperatorCommand {
    /// Retarget every panel. A field that is absent or not finite leaves the
    /// corresponding target unchanged.
    AdjustPanels {
        #[serde(default)]
        rotation: Option<f64>,
        #[serde(default)]
        angular_velocity: Option<f64>,
    },
    /// Switch a single panel on or off.
    SetPanelEnabled { net_id: NetId, enabled: bool },
    /// Pause the simulation.
    Pause,
    /// Resume the simulation.
    Resume,
}
