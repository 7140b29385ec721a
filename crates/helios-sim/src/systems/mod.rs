//! ECS systems that operate on the simulation world each tick.
//!
//! Systems are plain functions that take `&mut World` (or `&World` for read-only).
//! They keep no state between calls; whatever persists lives in components
//! or in the engine.

pub mod console;
pub mod coverage;
pub mod occlusion;
pub mod panel_power;
pub mod pause;
pub mod snapshot;
