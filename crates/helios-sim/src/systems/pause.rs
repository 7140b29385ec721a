//! Pause correction: paused time must never show up as rotation.
//!
//! On resume every anchor moves forward by exactly the paused duration, so
//! `t - anchor_time` reads the same immediately after resume as it did
//! immediately before the pause. Each body is shifted on its own; there is no
//! shared pause counter.

use hecs::{Entity, World};

use helios_core::components::{Dirty, SolarPanel, SolarSun};

/// Shift every sun and panel anchor by `paused_secs` and mark them dirty.
/// Returns the number of bodies corrected.
pub fn shift_anchors(world: &mut World, paused_secs: f64, dirty_buffer: &mut Vec<Entity>) -> u32 {
    dirty_buffer.clear();

    for (entity, sun) in world.query_mut::<&mut SolarSun>() {
        sun.state.shift_anchor_time(paused_secs);
        dirty_buffer.push(entity);
    }

    for (entity, panel) in world.query_mut::<&mut SolarPanel>() {
        panel.state.shift_anchor_time(paused_secs);
        dirty_buffer.push(entity);
    }

    let count = dirty_buffer.len() as u32;
    for entity in dirty_buffer.drain(..) {
        let _ = world.insert_one(entity, Dirty);
    }
    count
}
