//! Simulation engine: the authoritative side of the solar array.
//!
//! `SimulationEngine` owns the hecs ECS world, processes operator commands,
//! runs all systems, and produces `SimSnapshot`s. Completely headless, which
//! keeps it deterministic under test.

use std::collections::VecDeque;

use hecs::{Entity, World};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use helios_core::angular::AngularState;
use helios_core::commands::OperatorCommand;
use helios_core::components::{Occluder, SolarConsole, SolarPanel, SolarSun};
use helios_core::enums::SimPhase;
use helios_core::events::SimEvent;
use helios_core::state::SimSnapshot;
use helios_core::types::{NetId, Position, RegionId, SimTime};
use helios_occlusion::OcclusionField;

use crate::config::SimConfig;
use crate::persistence::{SavedOccluder, SavedPanel, SavedRegion, SavedWorld};
use crate::replication::{self, ReplicationPacket};
use crate::systems;
use crate::systems::console::{ConsoleThrottle, PanelTargets};
use crate::systems::panel_power::PanelUpdate;
use crate::world_setup;

/// The simulation engine. Owns the ECS world and all sim state.
pub struct SimulationEngine {
    world: World,
    config: SimConfig,
    time: SimTime,
    phase: SimPhase,
    /// Sim time the current pause began.
    paused_at: Option<f64>,
    rng: ChaCha8Rng,
    next_net_id: u32,
    next_region_id: u32,
    targets: PanelTargets,
    command_queue: VecDeque<OperatorCommand>,
    events: Vec<SimEvent>,
    console_throttle: ConsoleThrottle,
    occlusion: OcclusionField,
    panel_buffer: Vec<PanelUpdate>,
    entity_buffer: Vec<Entity>,
    total_output: f64,
    /// Pause state carried by the last replication packet.
    replicated_paused_since: Option<f64>,
}

impl SimulationEngine {
    /// Create a new simulation engine with the given config. The world starts
    /// empty; see [`SimulationEngine::setup_default_array`].
    pub fn new(config: SimConfig) -> Self {
        Self {
            world: World::new(),
            time: SimTime::default(),
            phase: SimPhase::default(),
            paused_at: None,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            next_net_id: 0,
            next_region_id: 0,
            targets: PanelTargets::default(),
            command_queue: VecDeque::new(),
            events: Vec::new(),
            console_throttle: ConsoleThrottle::new(config.console_interval_secs),
            occlusion: OcclusionField::new(),
            panel_buffer: Vec::new(),
            entity_buffer: Vec::new(),
            total_output: 0.0,
            replicated_paused_since: None,
            config,
        }
    }

    /// Queue an operator command for processing at the next tick boundary.
    pub fn queue_command(&mut self, command: OperatorCommand) {
        self.command_queue.push_back(command);
    }

    /// Queue multiple commands.
    pub fn queue_commands(&mut self, commands: impl IntoIterator<Item = OperatorCommand>) {
        self.command_queue.extend(commands);
    }

    /// Advance the simulation by one tick and return the resulting snapshot.
    pub fn tick(&mut self) -> SimSnapshot {
        self.time.advance();
        self.process_commands();

        if self.phase == SimPhase::Running {
            self.run_systems();
        }

        let now = self.effective_now();
        let console = if self.console_throttle.update(self.time.dt()) {
            systems::console::build_console_states(
                &self.world,
                &self.targets,
                self.total_output,
                self.is_paused(),
                now,
            )
        } else {
            Vec::new()
        };

        let events = std::mem::take(&mut self.events);
        systems::snapshot::build_snapshot(
            &self.world,
            &self.time,
            self.phase,
            now,
            self.total_output,
            console,
            events,
        )
    }

    /// Pack every dirty body into a packet, clearing the dirty markers.
    ///
    /// Returns `None` when nothing changed since the last packet: no body is
    /// dirty and the pause state is unchanged.
    pub fn replicate(&mut self) -> Option<ReplicationPacket> {
        let updates = replication::collect_dirty(&mut self.world, &mut self.entity_buffer);
        let paused_since = self.paused_at;
        if updates.is_empty() && paused_since == self.replicated_paused_since {
            return None;
        }
        self.replicated_paused_since = paused_since;

        debug!(
            tick = self.time.tick,
            updates = updates.len(),
            paused = paused_since.is_some(),
            "replication packet"
        );
        Some(ReplicationPacket {
            tick: self.time.tick,
            server_time: self.time.elapsed_secs,
            paused_since,
            updates,
        })
    }

    /// Every body's state, for an observer that joins late. Dirty markers are
    /// left for the next [`SimulationEngine::replicate`].
    pub fn full_sync(&self) -> ReplicationPacket {
        ReplicationPacket {
            tick: self.time.tick,
            server_time: self.time.elapsed_secs,
            paused_since: self.paused_at,
            updates: replication::collect_all(&self.world),
        }
    }

    // --- Spawning ---

    /// Spawn a region with a randomly drawn sun.
    pub fn spawn_region(&mut self) -> RegionId {
        let now = self.effective_now();
        let sun = world_setup::random_sun(&mut self.rng, now);
        self.insert_region(sun)
    }

    /// Spawn a region whose sun starts from `sun` anchored now.
    pub fn spawn_region_with_sun(&mut self, angle: f64, angular_velocity: f64) -> RegionId {
        let sun = SolarSun {
            state: AngularState::new(angle, angular_velocity, self.effective_now()),
        };
        self.insert_region(sun)
    }

    /// Spawn a panel at the configured rating, following the current targets.
    pub fn spawn_panel(&mut self, region: RegionId, position: Position) -> NetId {
        self.spawn_panel_rated(region, position, self.config.panel_max_output)
    }

    /// Spawn a panel with an explicit rating, following the current targets.
    pub fn spawn_panel_rated(
        &mut self,
        region: RegionId,
        position: Position,
        max_output: f64,
    ) -> NetId {
        let state = AngularState::new(
            self.targets.angle,
            self.targets.velocity,
            self.effective_now(),
        );
        let net_id = self.allocate_net_id();
        world_setup::spawn_panel(
            &mut self.world,
            region,
            net_id,
            position,
            SolarPanel::new(state, max_output),
        );
        self.events.push(SimEvent::PanelSpawned { net_id, region });
        net_id
    }

    pub fn spawn_occluder(
        &mut self,
        region: RegionId,
        position: Position,
        occluder: Occluder,
    ) -> Entity {
        world_setup::spawn_occluder(&mut self.world, region, position, occluder)
    }

    pub fn spawn_console(&mut self, region: RegionId) -> Entity {
        world_setup::spawn_console(&mut self.world, region)
    }

    /// One region with a random sun, a console, a 4×4 panel grid and a wall
    /// shading part of it.
    pub fn setup_default_array(&mut self) -> RegionId {
        let region = self.spawn_region();
        self.spawn_console(region);
        for position in world_setup::default_grid_positions() {
            self.spawn_panel(region, position);
        }
        let (wall_position, wall) = world_setup::default_wall();
        self.spawn_occluder(region, wall_position, wall);
        info!(region = region.0, panels = 16, "default array ready");
        region
    }

    // --- Persistence ---

    /// Capture the authoritative state.
    pub fn save(&self) -> SavedWorld {
        let mut regions: Vec<SavedRegion> = self
            .world
            .query::<(&RegionId, &NetId, &SolarSun)>()
            .iter()
            .map(|(_, (region, net_id, sun))| SavedRegion {
                region: *region,
                net_id: *net_id,
                sun: sun.state,
            })
            .collect();
        regions.sort_by_key(|r| r.region);

        let mut panels: Vec<SavedPanel> = self
            .world
            .query::<(&NetId, &RegionId, &Position, &SolarPanel)>()
            .iter()
            .map(|(_, (net_id, region, position, panel))| SavedPanel {
                net_id: *net_id,
                region: *region,
                position: *position,
                enabled: panel.enabled,
                max_output: panel.max_output,
                state: panel.state,
            })
            .collect();
        panels.sort_by_key(|p| p.net_id);

        // Panel bodies are recreated with the panel.
        let occluders = self
            .world
            .query::<(&RegionId, &Position, &Occluder, Option<&SolarPanel>)>()
            .iter()
            .filter(|(_, (_, _, _, panel))| panel.is_none())
            .map(|(_, (region, position, occluder, _))| SavedOccluder {
                region: *region,
                position: *position,
                occluder: *occluder,
            })
            .collect();

        let mut consoles: Vec<RegionId> = self
            .world
            .query::<(&SolarConsole, &RegionId)>()
            .iter()
            .map(|(_, (_, region))| *region)
            .collect();
        consoles.sort();

        SavedWorld {
            saved_at: self.effective_now(),
            targets: self.targets,
            regions,
            panels,
            occluders,
            consoles,
        }
    }

    /// Replace the world with a saved one.
    ///
    /// Anchors from before the current instant are raised to it, so a restore
    /// never replays rotation that happened before it. Every restored body is
    /// dirty.
    pub fn restore(&mut self, saved: &SavedWorld) {
        self.world.clear();
        self.total_output = 0.0;
        let now = self.effective_now();

        let mut targets = PanelTargets::default();
        targets.apply(
            Some(saved.targets.angle),
            Some(saved.targets.velocity),
            self.config.max_panel_velocity,
        );
        self.targets = targets;

        let mut next_net_id = 0;
        let mut next_region_id = 0;

        for region in &saved.regions {
            world_setup::spawn_region(
                &mut self.world,
                region.region,
                region.net_id,
                SolarSun {
                    state: region.sun.restored_at(now),
                },
            );
            next_net_id = next_net_id.max(region.net_id.0 + 1);
            next_region_id = next_region_id.max(region.region.0 + 1);
        }

        for saved_panel in &saved.panels {
            if !saved_panel.position.is_finite() {
                warn!(net_id = saved_panel.net_id.0, "skipping panel with non-finite position");
                continue;
            }
            let mut panel = SolarPanel::new(saved_panel.state.restored_at(now), saved_panel.max_output);
            panel.enabled = saved_panel.enabled;
            world_setup::spawn_panel(
                &mut self.world,
                saved_panel.region,
                saved_panel.net_id,
                saved_panel.position,
                panel,
            );
            next_net_id = next_net_id.max(saved_panel.net_id.0 + 1);
        }

        for occluder in &saved.occluders {
            world_setup::spawn_occluder(
                &mut self.world,
                occluder.region,
                occluder.position,
                occluder.occluder,
            );
        }

        for region in &saved.consoles {
            world_setup::spawn_console(&mut self.world, *region);
        }

        self.next_net_id = self.next_net_id.max(next_net_id);
        self.next_region_id = self.next_region_id.max(next_region_id);

        info!(
            regions = saved.regions.len(),
            panels = saved.panels.len(),
            saved_at = saved.saved_at,
            now,
            "world restored"
        );
    }

    // --- Accessors ---

    /// Get the current simulation phase.
    pub fn phase(&self) -> SimPhase {
        self.phase
    }

    pub fn is_paused(&self) -> bool {
        self.phase == SimPhase::Paused
    }

    /// Sim time the current pause began, if paused.
    pub fn paused_at(&self) -> Option<f64> {
        self.paused_at
    }

    /// Get the current simulation time.
    pub fn time(&self) -> SimTime {
        self.time
    }

    /// The instant anchors are written and read at: the sim clock, frozen at
    /// the pause instant while paused.
    pub fn effective_now(&self) -> f64 {
        self.paused_at.unwrap_or(self.time.elapsed_secs)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn targets(&self) -> PanelTargets {
        self.targets
    }

    /// Summed panel output from the last running tick (watts).
    pub fn total_output(&self) -> f64 {
        self.total_output
    }

    /// Get a read-only reference to the ECS world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// A copy of a panel's component.
    pub fn panel(&self, net_id: NetId) -> Option<SolarPanel> {
        let entity = self.panel_entity(net_id)?;
        self.world.get::<&SolarPanel>(entity).ok().map(|p| *p)
    }

    /// A copy of a region's sun.
    pub fn sun(&self, region: RegionId) -> Option<SolarSun> {
        self.world
            .query::<(&RegionId, &SolarSun)>()
            .iter()
            .find(|(_, (r, _))| **r == region)
            .map(|(_, (_, sun))| *sun)
    }

    // --- Internals ---

    fn allocate_net_id(&mut self) -> NetId {
        let id = NetId(self.next_net_id);
        self.next_net_id += 1;
        id
    }

    fn insert_region(&mut self, sun: SolarSun) -> RegionId {
        let region = RegionId(self.next_region_id);
        self.next_region_id += 1;
        let net_id = self.allocate_net_id();
        world_setup::spawn_region(&mut self.world, region, net_id, sun);
        debug!(
            region = region.0,
            angle = sun.state.anchor_angle(),
            velocity = sun.state.angular_velocity(),
            "region spawned"
        );
        region
    }

    fn panel_entity(&self, net_id: NetId) -> Option<Entity> {
        self.world
            .query::<(&NetId, &SolarPanel)>()
            .iter()
            .find(|(_, (id, _))| **id == net_id)
            .map(|(entity, _)| entity)
    }

    /// Process all queued commands.
    fn process_commands(&mut self) {
        while let Some(command) = self.command_queue.pop_front() {
            self.handle_command(command);
        }
    }

    /// Handle a single operator command.
    fn handle_command(&mut self, command: OperatorCommand) {
        match command {
            OperatorCommand::AdjustPanels {
                rotation,
                angular_velocity,
            } => {
                if !self
                    .targets
                    .apply(rotation, angular_velocity, self.config.max_panel_velocity)
                {
                    debug!("ignoring panel adjustment with no usable field");
                    return;
                }
                let now = self.effective_now();
                let panel_count = systems::console::refresh_all_panels(
                    &mut self.world,
                    &self.targets,
                    now,
                    &mut self.entity_buffer,
                );
                info!(
                    target_angle = self.targets.angle,
                    target_velocity = self.targets.velocity,
                    panel_count,
                    "panels retargeted"
                );
                self.events.push(SimEvent::PanelsRetargeted {
                    target_angle: self.targets.angle,
                    target_velocity: self.targets.velocity,
                    panel_count,
                });
            }
            OperatorCommand::SetPanelEnabled { net_id, enabled } => {
                let Some(entity) = self.panel_entity(net_id) else {
                    debug!(net_id = net_id.0, "toggle for unknown panel");
                    return;
                };
                if let Ok(mut panel) = self.world.get::<&mut SolarPanel>(entity) {
                    if panel.enabled == enabled {
                        return;
                    }
                    panel.enabled = enabled;
                    if !enabled {
                        panel.current_output = 0.0;
                    }
                }
                self.total_output = systems::panel_power::total_output(&self.world);
                self.events.push(SimEvent::PanelToggled { net_id, enabled });
            }
            OperatorCommand::Pause => {
                if self.phase == SimPhase::Running {
                    let now = self.time.elapsed_secs;
                    self.phase = SimPhase::Paused;
                    self.paused_at = Some(now);
                    info!(at = now, "simulation paused");
                    self.events.push(SimEvent::Paused);
                }
            }
            OperatorCommand::Resume => {
                if let Some(paused_at) = self.paused_at.take() {
                    let paused_secs = (self.time.elapsed_secs - paused_at).max(0.0);
                    let bodies = systems::pause::shift_anchors(
                        &mut self.world,
                        paused_secs,
                        &mut self.entity_buffer,
                    );
                    self.phase = SimPhase::Running;
                    info!(paused_secs, bodies, "simulation resumed");
                    self.events.push(SimEvent::Resumed { paused_secs });
                }
            }
        }
    }

    /// Run all systems in order.
    fn run_systems(&mut self) {
        let now = self.time.elapsed_secs;
        // 1. Occlusion geometry
        systems::occlusion::rebuild(&self.world, &mut self.occlusion);
        // 2. Panel angle + output
        self.total_output = systems::panel_power::run(
            &mut self.world,
            &self.occlusion,
            now,
            self.config.occlusion_check_distance,
            &mut self.panel_buffer,
        );
    }
}
