//! Core types and definitions for the HELIOS solar simulation.
//!
//! This crate defines the vocabulary shared across all other crates:
//! angular state, components, commands, snapshots, events, and constants.
//! It has no dependency on the ECS or any runtime framework.

pub mod angular;
pub mod commands;
pub mod components;
pub mod constants;
pub mod enums;
pub mod events;
pub mod state;
pub mod types;
