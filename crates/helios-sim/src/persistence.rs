//! Save and load of the rotating world as JSON.
//!
//! Only authoritative inputs are stored: anchors, targets and static bodies.
//! Derived values (panel output, cached angle) are recomputed after restore.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use helios_core::angular::AngularState;
use helios_core::components::Occluder;
use helios_core::types::{NetId, Position, RegionId};

use crate::systems::console::PanelTargets;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedRegion {
    pub region: RegionId,
    pub net_id: NetId,
    pub sun: AngularState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPanel {
    pub net_id: NetId,
    pub region: RegionId,
    pub position: Position,
    pub enabled: bool,
    pub max_output: f64,
    pub state: AngularState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedOccluder {
    pub region: RegionId,
    pub position: Position,
    pub occluder: Occluder,
}

/// A persisted world.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavedWorld {
    /// Effective sim time the save was taken at.
    pub saved_at: f64,
    pub targets: PanelTargets,
    pub regions: Vec<SavedRegion>,
    pub panels: Vec<SavedPanel>,
    #[serde(default)]
    pub occluders: Vec<SavedOccluder>,
    /// Regions with an operator console.
    #[serde(default)]
    pub consoles: Vec<RegionId>,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot serialize world: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("cannot parse saved world: {0}")]
    Parse(#[source] serde_json::Error),
}

impl SavedWorld {
    pub fn to_json(&self) -> Result<String, PersistError> {
        serde_json::to_string_pretty(self).map_err(PersistError::Serialize)
    }

    pub fn from_json(json: &str) -> Result<Self, PersistError> {
        serde_json::from_str(json).map_err(PersistError::Parse)
    }
}

pub fn save_to_file(saved: &SavedWorld, path: &Path) -> Result<(), PersistError> {
    let json = saved.to_json()?;
    fs::write(path, json).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_from_file(path: &Path) -> Result<SavedWorld, PersistError> {
    let json = fs::read_to_string(path).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    SavedWorld::from_json(&json)
}
