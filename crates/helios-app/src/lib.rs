//! HELIOS headless runner.
//!
//! This crate wires the simulation engine to an authority thread, feeds
//! observer threads through the replication codec, and exposes a small
//! control surface for issuing operator commands.

pub mod cli;
pub mod game_loop;
pub mod ipc;
pub mod observer;
pub mod state;

pub use helios_core as core;
