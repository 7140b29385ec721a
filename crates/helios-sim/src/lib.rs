//! Simulation engine for HELIOS.
//!
//! Owns the hecs ECS world, runs systems at a fixed tick rate, replicates
//! rotating bodies to observers, and produces SimSnapshots for viewers.

pub mod config;
pub mod engine;
pub mod observer;
pub mod persistence;
pub mod replication;
pub mod systems;
pub mod world_setup;

pub use config::SimConfig;
pub use engine::SimulationEngine;
pub use helios_core as core;
pub use observer::ObserverReplica;
pub use replication::{ReplicationError, ReplicationPacket, ReplicationTransport};

#[cfg(test)]
mod tests;
