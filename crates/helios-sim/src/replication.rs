//! Authority → observer replication.
//!
//! Only anchors travel. A body is sent when its anchor was rewritten
//! (creation, operator command, resume correction, restore) and otherwise
//! never; observers extrapolate locally in between. Packets are encoded with
//! `serde_json` and handed to a [`ReplicationTransport`], which keeps the
//! serialization boundary explicit even when both sides share a process.

use std::sync::mpsc::Sender;

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use helios_core::angular::AngularState;
use helios_core::components::{Dirty, SolarPanel, SolarSun};
use helios_core::enums::BodyKind;
use helios_core::types::{NetId, RegionId};

/// One body's complete replicated state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub net_id: NetId,
    pub region: RegionId,
    pub kind: BodyKind,
    pub state: AngularState,
}

/// Everything an observer needs from one synchronization opportunity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReplicationPacket {
    /// Authority tick the packet was produced on. Packets older than the last
    /// applied tick are stale.
    pub tick: u64,
    /// Authority sim time when the packet was produced.
    pub server_time: f64,
    /// Authority sim time the current pause began, if paused.
    pub paused_since: Option<f64>,
    pub updates: Vec<StateUpdate>,
}

impl ReplicationPacket {
    pub fn is_paused(&self) -> bool {
        self.paused_since.is_some()
    }
}

#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("failed to encode replication packet: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode replication packet: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("replication transport closed")]
    TransportClosed,
}

pub fn encode_packet(packet: &ReplicationPacket) -> Result<Vec<u8>, ReplicationError> {
    serde_json::to_vec(packet).map_err(ReplicationError::Encode)
}

pub fn decode_packet(bytes: &[u8]) -> Result<ReplicationPacket, ReplicationError> {
    serde_json::from_slice(bytes).map_err(ReplicationError::Decode)
}

/// Where encoded packets go.
pub trait ReplicationTransport {
    fn send_bytes(&mut self, bytes: Vec<u8>) -> Result<(), ReplicationError>;

    /// Encode and send a packet.
    fn send_packet(&mut self, packet: &ReplicationPacket) -> Result<(), ReplicationError> {
        let bytes = encode_packet(packet)?;
        self.send_bytes(bytes)
    }
}

impl ReplicationTransport for Sender<Vec<u8>> {
    fn send_bytes(&mut self, bytes: Vec<u8>) -> Result<(), ReplicationError> {
        self.send(bytes).map_err(|_| ReplicationError::TransportClosed)
    }
}

/// Loopback: packets accumulate in order.
impl ReplicationTransport for Vec<Vec<u8>> {
    fn send_bytes(&mut self, bytes: Vec<u8>) -> Result<(), ReplicationError> {
        self.push(bytes);
        Ok(())
    }
}

/// Pack every dirty body and clear the markers. Updates are sorted by net id.
pub fn collect_dirty(world: &mut World, cleared: &mut Vec<Entity>) -> Vec<StateUpdate> {
    cleared.clear();
    let mut updates = Vec::new();

    for (entity, (net_id, region, sun, _)) in world
        .query::<(&NetId, &RegionId, &SolarSun, &Dirty)>()
        .iter()
    {
        updates.push(StateUpdate {
            net_id: *net_id,
            region: *region,
            kind: BodyKind::Sun,
            state: sun.state,
        });
        cleared.push(entity);
    }

    for (entity, (net_id, region, panel, _)) in world
        .query::<(&NetId, &RegionId, &SolarPanel, &Dirty)>()
        .iter()
    {
        updates.push(StateUpdate {
            net_id: *net_id,
            region: *region,
            kind: BodyKind::Panel,
            state: panel.state,
        });
        cleared.push(entity);
    }

    for entity in cleared.drain(..) {
        let _ = world.remove_one::<Dirty>(entity);
    }

    updates.sort_by_key(|u| u.net_id);
    updates
}

/// Pack every body regardless of dirtiness. Markers are left alone.
pub fn collect_all(world: &World) -> Vec<StateUpdate> {
    let mut updates: Vec<StateUpdate> = world
        .query::<(&NetId, &RegionId, &SolarSun)>()
        .iter()
        .map(|(_, (net_id, region, sun))| StateUpdate {
            net_id: *net_id,
            region: *region,
            kind: BodyKind::Sun,
            state: sun.state,
        })
        .collect();

    updates.extend(
        world
            .query::<(&NetId, &RegionId, &SolarPanel)>()
            .iter()
            .map(|(_, (net_id, region, panel))| StateUpdate {
                net_id: *net_id,
                region: *region,
                kind: BodyKind::Panel,
                state: panel.state,
            }),
    );

    updates.sort_by_key(|u| u.net_id);
    updates
}
