//! Events emitted by the simulation for UI feedback and logging.

use serde::{Deserialize, Serialize};

use crate::types::{NetId, RegionId};

/// Something notable happened during a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimEvent {
    /// A panel came into existence.
    PanelSpawned { net_id: NetId, region: RegionId },
    /// An operator command re-anchored every panel.
    PanelsRetargeted {
        target_angle: f64,
        target_velocity: f64,
        panel_count: u32,
    },
    /// A panel was switched on or off.
    PanelToggled { net_id: NetId, enabled: bool },
    /// The simulation was paused.
    Paused,
    /// The simulation resumed; every anchor moved forward by `paused_secs`.
    Resumed { paused_secs: f64 },
}
