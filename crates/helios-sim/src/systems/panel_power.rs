//! Panel power system: recomputes every panel's angle and output each running
//! tick.
//!
//! Rotation is never integrated here. The angle is evaluated from the panel's
//! anchor, so this system only writes the derived `angle` and
//! `current_output` fields and never marks anything dirty.

use std::collections::HashMap;

use hecs::{Entity, World};
use tracing::trace;

use helios_core::components::{SolarPanel, SolarSun};
use helios_core::types::{Position, RegionId};
use helios_occlusion::VisibilityQuery;

use super::coverage::{compute_coverage, CoverageQuery};

/// Result of evaluating one panel, applied after the read-only pass.
#[derive(Debug, Clone, Copy)]
pub struct PanelUpdate {
    pub entity: Entity,
    /// `None` leaves the cached angle untouched (disabled panels).
    pub angle: Option<f64>,
    pub output: f64,
}

/// Current sun bearing of every region at `now`.
pub fn sun_angles(world: &World, now: f64) -> HashMap<RegionId, f64> {
    world
        .query::<(&RegionId, &SolarSun)>()
        .iter()
        .map(|(_, (region, sun))| (*region, sun.state.angle_at(now)))
        .collect()
}

/// Run the panel power system. Returns the summed output of all panels.
/// Uses a caller-owned buffer to avoid per-tick allocation.
pub fn run(
    world: &mut World,
    visibility: &dyn VisibilityQuery,
    now: f64,
    max_distance: f64,
    buffer: &mut Vec<PanelUpdate>,
) -> f64 {
    buffer.clear();
    let suns = sun_angles(world, now);

    {
        let world_ref: &World = world;
        let mut query = world_ref.query::<(&SolarPanel, &Position, &RegionId)>();
        for (entity, (panel, position, region)) in query.iter() {
            if !panel.enabled {
                buffer.push(PanelUpdate {
                    entity,
                    angle: None,
                    output: 0.0,
                });
                continue;
            }

            let panel_angle = panel.state.angle_at(now);

            // A region without a sun provides no light.
            let output = match suns.get(region) {
                Some(&sun_angle) => {
                    let coverage = compute_coverage(
                        world_ref,
                        visibility,
                        &CoverageQuery {
                            panel: entity,
                            region: *region,
                            position: *position,
                            panel_angle,
                            sun_angle,
                        },
                        max_distance,
                    );
                    panel.max_output * coverage
                }
                None => 0.0,
            };

            buffer.push(PanelUpdate {
                entity,
                angle: Some(panel_angle),
                output: output.min(panel.max_output).max(0.0),
            });
        }
    }

    let mut total = 0.0;
    for update in buffer.iter() {
        if let Ok(mut panel) = world.get::<&mut SolarPanel>(update.entity) {
            if let Some(angle) = update.angle {
                panel.angle = angle;
            }
            panel.current_output = update.output;
            total += update.output;
        }
    }

    trace!(panels = buffer.len(), total_output = total, "panel power updated");
    total
}

/// Sum of every panel's last computed output.
pub fn total_output(world: &World) -> f64 {
    world
        .query::<&SolarPanel>()
        .iter()
        .map(|(_, panel)| panel.current_output)
        .sum()
}
