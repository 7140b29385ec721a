//! Observer side of replication.
//!
//! An observer never simulates. It keeps the last anchor it heard for each
//! body and evaluates orientation against its own clock whenever it wants to
//! draw.

use std::collections::HashMap;

use tracing::debug;

use helios_core::angular::AngularState;
use helios_core::enums::BodyKind;
use helios_core::types::{NetId, RegionId};

use crate::replication::{decode_packet, ReplicationError, ReplicationPacket};

/// Last-heard state of one replicated body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplicatedBody {
    pub region: RegionId,
    pub kind: BodyKind,
    pub state: AngularState,
}

/// Local mirror of the authority's rotating bodies.
#[derive(Debug, Clone, Default)]
pub struct ObserverReplica {
    bodies: HashMap<NetId, ReplicatedBody>,
    last_tick: Option<u64>,
    /// Authority time the current pause began. Evaluation freezes there.
    paused_at: Option<f64>,
}

impl ObserverReplica {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and apply an encoded packet.
    pub fn apply_bytes(&mut self, bytes: &[u8]) -> Result<bool, ReplicationError> {
        let packet = decode_packet(bytes)?;
        Ok(self.apply(&packet))
    }

    /// Apply a packet. Returns false if it was stale and ignored.
    pub fn apply(&mut self, packet: &ReplicationPacket) -> bool {
        if let Some(last) = self.last_tick {
            if packet.tick < last {
                debug!(tick = packet.tick, last, "dropping stale replication packet");
                return false;
            }
        }
        self.last_tick = Some(packet.tick);

        match (self.paused_at, packet.paused_since) {
            (None, Some(at)) => {
                self.paused_at = Some(at);
            }
            (Some(at), None) => {
                // Bodies missing from this packet still need the correction.
                let paused_secs = (packet.server_time - at).max(0.0);
                for body in self.bodies.values_mut() {
                    body.state.shift_anchor_time(paused_secs);
                }
                self.paused_at = None;
            }
            (Some(_), Some(at)) => {
                self.paused_at = Some(at);
            }
            (None, None) => {}
        }

        for update in &packet.updates {
            self.bodies.insert(
                update.net_id,
                ReplicatedBody {
                    region: update.region,
                    kind: update.kind,
                    state: update.state,
                },
            );
        }
        true
    }

    /// The instant orientation is evaluated at for a local clock reading.
    pub fn view_time(&self, local_now: f64) -> f64 {
        match self.paused_at {
            Some(at) => local_now.min(at),
            None => local_now,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    pub fn last_tick(&self) -> Option<u64> {
        self.last_tick
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn body(&self, net_id: NetId) -> Option<&ReplicatedBody> {
        self.bodies.get(&net_id)
    }

    /// Orientation of a body at `local_now`.
    pub fn angle_of(&self, net_id: NetId, local_now: f64) -> Option<f64> {
        let t = self.view_time(local_now);
        self.bodies.get(&net_id).map(|b| b.state.angle_at(t))
    }

    /// Direction toward a region's sun at `local_now`.
    pub fn sun_direction(&self, region: RegionId, local_now: f64) -> Option<f64> {
        let t = self.view_time(local_now);
        self.bodies
            .values()
            .find(|b| b.kind == BodyKind::Sun && b.region == region)
            .map(|b| b.state.angle_at(t))
    }

    /// Every panel's orientation at `local_now`, sorted by net id.
    pub fn panel_orientations(&self, local_now: f64) -> Vec<(NetId, f64)> {
        let t = self.view_time(local_now);
        let mut out: Vec<(NetId, f64)> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.kind == BodyKind::Panel)
            .map(|(id, b)| (*id, b.state.angle_at(t)))
            .collect();
        out.sort_by_key(|(id, _)| *id);
        out
    }
}
