//! Tests for the simulation engine, power systems, pause correction, and replication.

use std::cell::Cell;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_3, PI, TAU};

use hecs::{Entity, World};

use helios_core::angular::AngularState;
use helios_core::commands::OperatorCommand;
use helios_core::components::{Occluder, SolarPanel, SolarSun};
use helios_core::constants::{DT, MAX_BLOCKERS_PER_QUERY, MAX_PANEL_VELOCITY};
use helios_core::enums::{BodyKind, SimPhase};
use helios_core::events::SimEvent;
use helios_core::types::{NetId, Position, RegionId};
use helios_occlusion::{OcclusionField, VisibilityFault, VisibilityQuery};

use crate::config::SimConfig;
use crate::engine::SimulationEngine;
use crate::observer::ObserverReplica;
use crate::replication::{decode_packet, encode_packet, ReplicationPacket, ReplicationTransport, StateUpdate};
use crate::systems::console::{ConsoleThrottle, PanelTargets};
use crate::systems::{panel_power, pause};
use crate::world_setup;

const EPS: f64 = 1e-9;

/// One region with a fixed sun and a single 100 W panel at the origin facing
/// north.
fn single_panel_engine(sun_angle: f64) -> (SimulationEngine, RegionId, NetId) {
    let mut engine = SimulationEngine::new(SimConfig::default());
    let region = engine.spawn_region_with_sun(sun_angle, 0.0);
    let panel = engine.spawn_panel_rated(region, Position::new(0.0, 0.0), 100.0);
    (engine, region, panel)
}

fn wall(anchored: bool, opaque: bool) -> Occluder {
    Occluder {
        half_extents: (2.0, 0.5),
        anchored,
        opaque,
    }
}

fn output_of(engine: &SimulationEngine, net_id: NetId) -> f64 {
    engine.panel(net_id).unwrap().current_output
}

// ---- Coverage scenarios ----

#[test]
fn test_scenario_a_full_alignment() {
    let (mut engine, _, panel) = single_panel_engine(0.0);
    let snap = engine.tick();
    assert!((snap.panels[0].current_output - 100.0).abs() < EPS);
    assert!((output_of(&engine, panel) - 100.0).abs() < EPS);
}

#[test]
fn test_scenario_b_perpendicular_is_exactly_zero() {
    let (mut engine, _, panel) = single_panel_engine(FRAC_PI_2);
    engine.tick();
    assert_eq!(output_of(&engine, panel), 0.0);
}

#[test]
fn test_scenario_c_sixty_degrees_is_half() {
    let (mut engine, _, panel) = single_panel_engine(FRAC_PI_3);
    engine.tick();
    assert!((output_of(&engine, panel) - 50.0).abs() < 1e-6);
}

#[test]
fn test_facing_away_is_zero() {
    let (mut engine, _, panel) = single_panel_engine(PI);
    engine.tick();
    assert_eq!(output_of(&engine, panel), 0.0);
}

#[test]
fn test_scenario_d_velocity_clamped_with_sign() {
    let (mut engine, _, panel) = single_panel_engine(0.0);

    engine.queue_command(OperatorCommand::AdjustPanels {
        rotation: None,
        angular_velocity: Some(1.0),
    });
    engine.tick();
    assert_eq!(engine.targets().velocity, MAX_PANEL_VELOCITY);
    assert_eq!(
        engine.panel(panel).unwrap().state.angular_velocity(),
        MAX_PANEL_VELOCITY
    );

    engine.queue_command(OperatorCommand::AdjustPanels {
        rotation: None,
        angular_velocity: Some(-5.0),
    });
    engine.tick();
    assert_eq!(engine.targets().velocity, -MAX_PANEL_VELOCITY);
}

#[test]
fn test_scenario_e_pause_shifts_every_anchor_by_ten() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    let region = engine.spawn_region_with_sun(0.3, 0.01);
    let a = engine.spawn_panel(region, Position::new(0.0, 0.0));
    let b = engine.spawn_panel(region, Position::new(5.0, 0.0));
    for _ in 0..30 {
        engine.tick();
    }

    let sun_before = engine.sun(region).unwrap().state.anchor_time();
    let a_before = engine.panel(a).unwrap().state.anchor_time();
    let b_before = engine.panel(b).unwrap().state.anchor_time();

    engine.queue_command(OperatorCommand::Pause);
    engine.tick();
    for _ in 0..299 {
        engine.tick();
    }
    engine.queue_command(OperatorCommand::Resume);
    let snap = engine.tick();

    assert_eq!(engine.phase(), SimPhase::Running);
    assert!(snap
        .events
        .iter()
        .any(|e| matches!(e, SimEvent::Resumed { paused_secs } if (paused_secs - 10.0).abs() < EPS)));
    let sun_shift = engine.sun(region).unwrap().state.anchor_time() - sun_before;
    let a_shift = engine.panel(a).unwrap().state.anchor_time() - a_before;
    let b_shift = engine.panel(b).unwrap().state.anchor_time() - b_before;
    for shift in [sun_shift, a_shift, b_shift] {
        assert!((shift - 10.0).abs() < 1e-12, "anchor moved by {shift}");
    }
}

#[test]
fn test_shift_anchors_is_exact() {
    let mut world = World::new();
    world_setup::spawn_region(
        &mut world,
        RegionId(0),
        NetId(0),
        SolarSun {
            state: AngularState::new(1.0, 0.002, 3.0),
        },
    );
    world_setup::spawn_panel(
        &mut world,
        RegionId(0),
        NetId(1),
        Position::new(0.0, 0.0),
        SolarPanel::new(AngularState::new(0.0, 0.01, 4.0), 100.0),
    );

    let mut buffer = Vec::new();
    let count = pause::shift_anchors(&mut world, 10.0, &mut buffer);
    assert_eq!(count, 2);

    let sun_time = world.query::<&SolarSun>().iter().next().unwrap().1.state.anchor_time();
    let panel_time = world.query::<&SolarPanel>().iter().next().unwrap().1.state.anchor_time();
    assert_eq!(sun_time, 13.0);
    assert_eq!(panel_time, 14.0);
}

// ---- Pause ----

#[test]
fn test_pause_freezes_rotation_and_output() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    let region = engine.spawn_region_with_sun(0.0, 0.01);
    engine.spawn_panel_rated(region, Position::new(0.0, 0.0), 100.0);
    engine.queue_command(OperatorCommand::AdjustPanels {
        rotation: Some(0.2),
        angular_velocity: Some(0.005),
    });
    for _ in 0..30 {
        engine.tick();
    }

    engine.queue_command(OperatorCommand::Pause);
    let paused = engine.tick();
    assert_eq!(paused.phase, SimPhase::Paused);
    let sun_at_pause = paused.suns[0].angle;
    let output_at_pause = paused.total_output;

    let mut last = paused;
    for _ in 0..120 {
        last = engine.tick();
    }
    assert!((last.suns[0].angle - sun_at_pause).abs() < EPS);
    assert_eq!(last.total_output, output_at_pause);
    assert_eq!(engine.time().tick, 151, "the sim clock keeps running while paused");

    engine.queue_command(OperatorCommand::Resume);
    let resumed = engine.tick();
    assert!((resumed.suns[0].angle - sun_at_pause).abs() < EPS);
}

#[test]
fn test_pause_and_resume_are_idempotent() {
    let (mut engine, _, _) = single_panel_engine(0.0);
    engine.tick();
    engine.queue_command(OperatorCommand::Resume);
    let snap = engine.tick();
    assert!(snap.events.is_empty());

    engine.queue_commands([OperatorCommand::Pause, OperatorCommand::Pause]);
    let snap = engine.tick();
    assert_eq!(snap.events, vec![SimEvent::Paused]);
}

#[test]
fn test_command_while_paused_takes_effect_at_resume() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    let region = engine.spawn_region_with_sun(0.0, 0.0);
    let panel = engine.spawn_panel(region, Position::new(0.0, 0.0));
    for _ in 0..10 {
        engine.tick();
    }

    engine.queue_command(OperatorCommand::Pause);
    engine.tick();
    engine.queue_command(OperatorCommand::AdjustPanels {
        rotation: Some(1.0),
        angular_velocity: Some(0.01),
    });
    for _ in 0..60 {
        engine.tick();
    }
    engine.queue_command(OperatorCommand::Resume);
    engine.tick();

    let state = engine.panel(panel).unwrap().state;
    assert!((state.anchor_time() - engine.time().elapsed_secs).abs() < EPS);
    assert!((state.angle_at(engine.time().elapsed_secs) - 1.0).abs() < EPS);
}

// ---- Occlusion ----

#[test]
fn test_anchored_opaque_wall_blocks_sun() {
    let (mut engine, region, panel) = single_panel_engine(0.0);
    engine.spawn_occluder(region, Position::new(0.0, 5.0), wall(true, true));
    engine.tick();
    assert_eq!(output_of(&engine, panel), 0.0);
}

#[test]
fn test_loose_or_transparent_bodies_do_not_block() {
    let (mut engine, region, panel) = single_panel_engine(0.0);
    engine.spawn_occluder(region, Position::new(0.0, 5.0), wall(false, true));
    engine.spawn_occluder(region, Position::new(0.0, 8.0), wall(true, false));
    engine.tick();
    assert!((output_of(&engine, panel) - 100.0).abs() < EPS);
}

#[test]
fn test_walls_out_of_range_or_behind_do_not_block() {
    let (mut engine, region, panel) = single_panel_engine(0.0);
    engine.spawn_occluder(region, Position::new(0.0, 25.0), wall(true, true));
    engine.spawn_occluder(region, Position::new(0.0, -5.0), wall(true, true));
    engine.tick();
    assert!((output_of(&engine, panel) - 100.0).abs() < EPS);
}

#[test]
fn test_panel_ignores_its_own_body_but_not_its_neighbours() {
    let (mut engine, region, south) = single_panel_engine(0.0);
    let north = engine.spawn_panel_rated(region, Position::new(0.0, 3.0), 100.0);
    engine.tick();
    assert_eq!(output_of(&engine, south), 0.0);
    assert!((output_of(&engine, north) - 100.0).abs() < EPS);
}

#[test]
fn test_wall_in_another_region_does_not_block() {
    let (mut engine, _, panel) = single_panel_engine(0.0);
    let other = engine.spawn_region_with_sun(0.0, 0.0);
    engine.spawn_occluder(other, Position::new(0.0, 5.0), wall(true, true));
    engine.tick();
    assert!((output_of(&engine, panel) - 100.0).abs() < EPS);
}

#[test]
fn test_large_unshaded_row_keeps_full_output() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    let region = engine.spawn_region_with_sun(0.0, 0.0);
    let count = MAX_BLOCKERS_PER_QUERY + 4;
    for i in 0..count {
        engine.spawn_panel_rated(region, Position::new(i as f64 * 2.0, 0.0), 1.0);
    }
    let snap = engine.tick();
    assert!(
        (snap.total_output - count as f64).abs() < 1e-6,
        "row of {count} panels produced {}",
        snap.total_output
    );
}

struct FaultyVisibility;

impl VisibilityQuery for FaultyVisibility {
    fn query_occluded(
        &self,
        region: RegionId,
        _origin: Position,
        _direction: f64,
        _max_distance: f64,
        _passable: &dyn Fn(Entity) -> bool,
    ) -> Result<bool, VisibilityFault> {
        Err(VisibilityFault::RegionUnavailable(region))
    }
}

/// Never blocks; counts calls.
#[derive(Default)]
struct CountingVisibility {
    calls: Cell<u32>,
}

impl VisibilityQuery for CountingVisibility {
    fn query_occluded(
        &self,
        _region: RegionId,
        _origin: Position,
        _direction: f64,
        _max_distance: f64,
        _passable: &dyn Fn(Entity) -> bool,
    ) -> Result<bool, VisibilityFault> {
        self.calls.set(self.calls.get() + 1);
        Ok(false)
    }
}

fn power_world(sun_angle: f64, panel_angle: f64) -> World {
    let mut world = World::new();
    world_setup::spawn_region(
        &mut world,
        RegionId(0),
        NetId(0),
        SolarSun {
            state: AngularState::fixed(sun_angle, 0.0),
        },
    );
    world_setup::spawn_panel(
        &mut world,
        RegionId(0),
        NetId(1),
        Position::new(0.0, 0.0),
        SolarPanel::new(AngularState::fixed(panel_angle, 0.0), 100.0),
    );
    world
}

#[test]
fn test_visibility_fault_counts_as_occluded() {
    let mut world = power_world(0.0, 0.0);
    let mut buffer = Vec::new();
    let total = panel_power::run(&mut world, &FaultyVisibility, 0.0, 20.0, &mut buffer);
    assert_eq!(total, 0.0);
}

#[test]
fn test_unloaded_region_counts_as_occluded() {
    let mut world = power_world(0.0, 0.0);
    let field = OcclusionField::new();
    let mut buffer = Vec::new();
    let total = panel_power::run(&mut world, &field, 0.0, 20.0, &mut buffer);
    assert_eq!(total, 0.0);
}

#[test]
fn test_zero_alignment_skips_visibility_query() {
    let visibility = CountingVisibility::default();
    let mut buffer = Vec::new();

    let mut away = power_world(0.0, PI);
    panel_power::run(&mut away, &visibility, 0.0, 20.0, &mut buffer);
    assert_eq!(visibility.calls.get(), 0);

    let mut facing = power_world(0.0, 0.0);
    let total = panel_power::run(&mut facing, &visibility, 0.0, 20.0, &mut buffer);
    assert_eq!(visibility.calls.get(), 1);
    assert!((total - 100.0).abs() < EPS);
}

#[test]
fn test_panel_without_sun_produces_nothing() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    let panel = engine.spawn_panel_rated(RegionId(7), Position::new(0.0, 0.0), 100.0);
    engine.tick();
    assert_eq!(output_of(&engine, panel), 0.0);
}

// ---- Panel operation ----

#[test]
fn test_disabled_panel_produces_nothing() {
    let (mut engine, _, panel) = single_panel_engine(0.0);
    engine.tick();
    assert!(output_of(&engine, panel) > 0.0);

    engine.queue_command(OperatorCommand::SetPanelEnabled {
        net_id: panel,
        enabled: false,
    });
    let snap = engine.tick();
    assert_eq!(output_of(&engine, panel), 0.0);
    assert_eq!(snap.total_output, 0.0);
    assert!(!snap.panels[0].enabled);
    assert!(snap.events.contains(&SimEvent::PanelToggled {
        net_id: panel,
        enabled: false,
    }));

    engine.queue_command(OperatorCommand::SetPanelEnabled {
        net_id: panel,
        enabled: true,
    });
    engine.tick();
    assert!((output_of(&engine, panel) - 100.0).abs() < EPS);
}

#[test]
fn test_output_stays_within_rating() {
    let mut engine = SimulationEngine::new(SimConfig {
        seed: 3,
        ..Default::default()
    });
    engine.setup_default_array();
    engine.queue_command(OperatorCommand::AdjustPanels {
        rotation: Some(0.0),
        angular_velocity: Some(-MAX_PANEL_VELOCITY),
    });
    for _ in 0..600 {
        let snap = engine.tick();
        for panel in &snap.panels {
            assert!(panel.current_output >= 0.0);
            assert!(panel.current_output <= panel.max_output);
        }
    }
}

#[test]
fn test_invalid_adjustment_is_ignored() {
    let (mut engine, _, _) = single_panel_engine(0.0);
    engine.tick();
    engine.queue_command(OperatorCommand::AdjustPanels {
        rotation: Some(f64::NAN),
        angular_velocity: Some(f64::INFINITY),
    });
    let snap = engine.tick();
    assert!(snap.events.is_empty());
    assert_eq!(engine.targets(), PanelTargets::default());
}

#[test]
fn test_partial_adjustment_keeps_other_target() {
    let mut targets = PanelTargets {
        angle: 1.0,
        velocity: 0.005,
    };
    assert!(targets.apply(Some(-FRAC_PI_2), None, MAX_PANEL_VELOCITY));
    assert!((targets.angle - 3.0 * FRAC_PI_2).abs() < EPS);
    assert_eq!(targets.velocity, 0.005);

    assert!(targets.apply(Some(f64::NAN), Some(0.001), MAX_PANEL_VELOCITY));
    assert!((targets.angle - 3.0 * FRAC_PI_2).abs() < EPS);
    assert_eq!(targets.velocity, 0.001);

    assert!(!targets.apply(None, None, MAX_PANEL_VELOCITY));
}

#[test]
fn test_adjustment_reanchors_every_panel_now() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    let region = engine.spawn_region_with_sun(0.0, 0.0);
    let ids: Vec<NetId> = (0..3)
        .map(|i| engine.spawn_panel(region, Position::new(i as f64 * 3.0, 0.0)))
        .collect();
    for _ in 0..15 {
        engine.tick();
    }

    engine.queue_command(OperatorCommand::AdjustPanels {
        rotation: Some(TAU + 0.5),
        angular_velocity: Some(0.002),
    });
    let snap = engine.tick();
    assert!(snap.events.contains(&SimEvent::PanelsRetargeted {
        target_angle: engine.targets().angle,
        target_velocity: 0.002,
        panel_count: 3,
    }));

    let now = engine.time().elapsed_secs;
    for id in ids {
        let state = engine.panel(id).unwrap().state;
        assert!((state.anchor_angle() - 0.5).abs() < EPS);
        assert_eq!(state.anchor_time(), now);
        assert_eq!(state.angular_velocity(), 0.002);
    }
}

// ---- Console ----

#[test]
fn test_console_throttle_fires_once_per_second() {
    let mut throttle = ConsoleThrottle::new(1.0);
    let fired: Vec<usize> = (1..=90).filter(|_| throttle.update(DT)).collect();
    assert_eq!(fired.len(), 3);
}

#[test]
fn test_console_throttle_without_interval_always_fires() {
    let mut throttle = ConsoleThrottle::new(0.0);
    assert!(throttle.update(DT));
    assert!(throttle.update(0.0));
}

#[test]
fn test_console_pushes_on_schedule_even_while_paused() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    let region = engine.spawn_region_with_sun(1.0, 0.0);
    engine.spawn_console(region);
    engine.spawn_panel_rated(region, Position::new(0.0, 0.0), 100.0);

    let mut pushes = Vec::new();
    for _ in 0..60 {
        let snap = engine.tick();
        pushes.extend(snap.console);
    }
    assert_eq!(pushes.len(), 2);
    assert_eq!(pushes[0].region, region);
    assert_eq!(pushes[0].sun_direction, Some(1.0));
    assert!(!pushes[0].is_paused);
    assert!((pushes[0].total_output - 100.0 * (1.0_f64).cos()).abs() < 1e-6);

    engine.queue_command(OperatorCommand::Pause);
    let mut paused_pushes = Vec::new();
    for _ in 0..30 {
        let snap = engine.tick();
        paused_pushes.extend(snap.console);
    }
    assert_eq!(paused_pushes.len(), 1);
    assert!(paused_pushes[0].is_paused);
}

#[test]
fn test_console_total_spans_every_region() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    let east = engine.spawn_region_with_sun(0.0, 0.0);
    let west = engine.spawn_region_with_sun(0.0, 0.0);
    engine.spawn_console(east);
    engine.spawn_console(west);
    engine.spawn_panel_rated(east, Position::new(0.0, 0.0), 100.0);
    engine.spawn_panel_rated(west, Position::new(0.0, 0.0), 50.0);

    let mut pushes = Vec::new();
    for _ in 0..30 {
        pushes.extend(engine.tick().console);
    }
    assert_eq!(pushes.len(), 2);
    for push in &pushes {
        assert!((push.total_output - 150.0).abs() < EPS);
    }
}

// ---- Determinism ----

#[test]
fn test_determinism_same_seed() {
    let mut engine_a = SimulationEngine::new(SimConfig {
        seed: 12345,
        ..Default::default()
    });
    let mut engine_b = SimulationEngine::new(SimConfig {
        seed: 12345,
        ..Default::default()
    });
    engine_a.setup_default_array();
    engine_b.setup_default_array();

    for _ in 0..300 {
        let snap_a = engine_a.tick();
        let snap_b = engine_b.tick();

        let json_a = serde_json::to_string(&snap_a).unwrap();
        let json_b = serde_json::to_string(&snap_b).unwrap();
        assert_eq!(json_a, json_b, "Snapshots diverged with same seed");
    }
}

#[test]
fn test_determinism_different_seeds() {
    let mut engine_a = SimulationEngine::new(SimConfig {
        seed: 111,
        ..Default::default()
    });
    let mut engine_b = SimulationEngine::new(SimConfig {
        seed: 222,
        ..Default::default()
    });
    let region_a = engine_a.setup_default_array();
    let region_b = engine_b.setup_default_array();

    let sun_a = engine_a.sun(region_a).unwrap().state;
    let sun_b = engine_b.sun(region_b).unwrap().state;
    assert_ne!(sun_a, sun_b, "Different seeds should draw different suns");
}

#[test]
fn test_snapshot_sorted_by_net_id() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    engine.setup_default_array();
    let snap = engine.tick();
    assert_eq!(snap.panels.len(), 16);
    assert!(snap.panels.windows(2).all(|w| w[0].net_id < w[1].net_id));
    assert_eq!(snap.suns.len(), 1);
}

#[test]
fn test_tick_timing_30_ticks_one_second() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    for _ in 0..30 {
        engine.tick();
    }

    assert_eq!(engine.time().tick, 30);
    assert_eq!(engine.time().elapsed_secs, 1.0);
}

// ---- Replication ----

#[test]
fn test_replication_dirty_cycle() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    let region = engine.spawn_region_with_sun(0.0, 0.01);
    let panel = engine.spawn_panel(region, Position::new(0.0, 0.0));

    let first = engine.replicate().unwrap();
    assert_eq!(first.updates.len(), 2);
    assert_eq!(first.updates[0].kind, BodyKind::Sun);
    assert_eq!(first.updates[1].net_id, panel);
    assert!(engine.replicate().is_none());

    // Plain ticks move nothing onto the wire.
    for _ in 0..30 {
        engine.tick();
        assert!(engine.replicate().is_none());
    }

    engine.queue_command(OperatorCommand::AdjustPanels {
        rotation: Some(1.0),
        angular_velocity: None,
    });
    engine.tick();
    let retarget = engine.replicate().unwrap();
    assert_eq!(retarget.updates.len(), 1);
    assert_eq!(retarget.updates[0].kind, BodyKind::Panel);
    assert!(engine.replicate().is_none());

    engine.queue_command(OperatorCommand::Pause);
    engine.tick();
    let paused = engine.replicate().unwrap();
    assert!(paused.updates.is_empty());
    assert_eq!(paused.paused_since, engine.paused_at());
    assert!(engine.replicate().is_none());

    engine.queue_command(OperatorCommand::Resume);
    engine.tick();
    let resumed = engine.replicate().unwrap();
    assert!(!resumed.is_paused());
    assert_eq!(resumed.updates.len(), 2);
}

#[test]
fn test_full_sync_keeps_dirty_markers() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    engine.setup_default_array();
    let sync = engine.full_sync();
    assert_eq!(sync.updates.len(), 17);
    assert_eq!(engine.replicate().unwrap().updates.len(), 17);
    assert_eq!(engine.full_sync().updates.len(), 17);
}

#[test]
fn test_codec_round_trip() {
    let packet = ReplicationPacket {
        tick: 42,
        server_time: 1.4,
        paused_since: Some(1.2),
        updates: vec![StateUpdate {
            net_id: NetId(3),
            region: RegionId(0),
            kind: BodyKind::Panel,
            state: AngularState::new(-0.5, 0.01, 1.0),
        }],
    };
    let decoded = decode_packet(&encode_packet(&packet).unwrap()).unwrap();
    assert_eq!(decoded, packet);
    assert!((decoded.updates[0].state.anchor_angle() - (TAU - 0.5)).abs() < EPS);
}

#[test]
fn test_observer_tracks_authority_without_traffic() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    let region = engine.spawn_region_with_sun(0.4, 0.01);
    let panel = engine.spawn_panel(region, Position::new(0.0, 0.0));
    engine.queue_command(OperatorCommand::AdjustPanels {
        rotation: Some(2.0),
        angular_velocity: Some(0.015),
    });

    let mut wire: Vec<Vec<u8>> = Vec::new();
    let mut observer = ObserverReplica::new();

    for _ in 0..90 {
        engine.tick();
        if let Some(packet) = engine.replicate() {
            wire.send_packet(&packet).unwrap();
        }
        for bytes in wire.drain(..) {
            observer.apply_bytes(&bytes).unwrap();
        }
    }

    let now = engine.time().elapsed_secs;
    let panel_angle = engine.panel(panel).unwrap().state.angle_at(now);
    let sun_angle = engine.sun(region).unwrap().state.angle_at(now);
    assert!((observer.angle_of(panel, now).unwrap() - panel_angle).abs() < EPS);
    assert!((observer.sun_direction(region, now).unwrap() - sun_angle).abs() < EPS);
    assert_eq!(observer.panel_orientations(now).len(), 1);
}

#[test]
fn test_observer_drops_stale_packets() {
    let state_at = |angle: f64| StateUpdate {
        net_id: NetId(1),
        region: RegionId(0),
        kind: BodyKind::Panel,
        state: AngularState::fixed(angle, 0.0),
    };
    let mut observer = ObserverReplica::new();
    assert!(observer.apply(&ReplicationPacket {
        tick: 5,
        updates: vec![state_at(1.0)],
        ..Default::default()
    }));
    assert!(!observer.apply(&ReplicationPacket {
        tick: 3,
        updates: vec![state_at(2.0)],
        ..Default::default()
    }));
    assert_eq!(observer.angle_of(NetId(1), 10.0), Some(1.0));
    assert_eq!(observer.last_tick(), Some(5));
}

#[test]
fn test_observer_replaces_state_wholesale() {
    let mut observer = ObserverReplica::new();
    let update = |state| ReplicationPacket {
        tick: 1,
        updates: vec![StateUpdate {
            net_id: NetId(1),
            region: RegionId(0),
            kind: BodyKind::Panel,
            state,
        }],
        ..Default::default()
    };
    observer.apply(&update(AngularState::new(0.0, 0.1, 0.0)));
    observer.apply(&update(AngularState::new(1.0, 0.0, 5.0)));
    assert_eq!(
        observer.body(NetId(1)).unwrap().state,
        AngularState::new(1.0, 0.0, 5.0)
    );
    assert_eq!(observer.len(), 1);
}

#[test]
fn test_observer_freezes_and_corrects_on_its_own() {
    let mut observer = ObserverReplica::new();
    observer.apply(&ReplicationPacket {
        tick: 1,
        server_time: 0.0,
        paused_since: None,
        updates: vec![StateUpdate {
            net_id: NetId(1),
            region: RegionId(0),
            kind: BodyKind::Panel,
            state: AngularState::new(0.0, 1.0, 0.0),
        }],
    });
    observer.apply(&ReplicationPacket {
        tick: 2,
        server_time: 2.0,
        paused_since: Some(2.0),
        updates: Vec::new(),
    });
    assert!(observer.is_paused());
    assert!((observer.angle_of(NetId(1), 4.5).unwrap() - 2.0).abs() < EPS);

    // Resume packet carries no bodies: the local shift alone must agree.
    observer.apply(&ReplicationPacket {
        tick: 3,
        server_time: 7.0,
        paused_since: None,
        updates: Vec::new(),
    });
    assert!(!observer.is_paused());
    assert_eq!(observer.body(NetId(1)).unwrap().state.anchor_time(), 5.0);
    assert!((observer.angle_of(NetId(1), 7.0).unwrap() - 2.0).abs() < EPS);
    assert!((observer.angle_of(NetId(1), 8.0).unwrap() - 3.0).abs() < EPS);
}

#[test]
fn test_observer_agrees_with_authority_across_pause() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    let region = engine.spawn_region_with_sun(0.0, 0.01);
    let mut observer = ObserverReplica::new();
    observer.apply(&engine.replicate().unwrap());

    for _ in 0..30 {
        engine.tick();
    }
    engine.queue_command(OperatorCommand::Pause);
    engine.tick();
    observer.apply(&engine.replicate().unwrap());
    let frozen = engine.sun(region).unwrap().state.angle_at(engine.effective_now());

    for _ in 0..150 {
        engine.tick();
        let local_now = engine.time().elapsed_secs;
        assert!((observer.sun_direction(region, local_now).unwrap() - frozen).abs() < EPS);
    }

    engine.queue_command(OperatorCommand::Resume);
    engine.tick();
    observer.apply(&engine.replicate().unwrap());
    for _ in 0..30 {
        engine.tick();
    }
    let now = engine.time().elapsed_secs;
    let expected = engine.sun(region).unwrap().state.angle_at(now);
    assert!((observer.sun_direction(region, now).unwrap() - expected).abs() < EPS);
}

#[test]
fn test_late_joiner_sees_pause() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    let region = engine.spawn_region_with_sun(0.0, 0.01);
    for _ in 0..30 {
        engine.tick();
    }
    engine.queue_command(OperatorCommand::Pause);
    engine.tick();
    let frozen = engine.sun(region).unwrap().state.angle_at(engine.effective_now());
    for _ in 0..60 {
        engine.tick();
    }

    let mut late = ObserverReplica::new();
    late.apply(&engine.full_sync());
    assert!(late.is_paused());
    let local_now = engine.time().elapsed_secs;
    assert!((late.sun_direction(region, local_now).unwrap() - frozen).abs() < EPS);
}

// ---- Persistence ----

#[test]
fn test_restore_raises_past_anchors_to_now() {
    let mut source = SimulationEngine::new(SimConfig::default());
    source.setup_default_array();
    for _ in 0..60 {
        source.tick();
    }
    source.replicate();
    let saved = source.save();
    assert_eq!(saved.panels.len(), 16);
    assert_eq!(saved.occluders.len(), 1, "panel bodies are not saved separately");

    let mut target = SimulationEngine::new(SimConfig::default());
    for _ in 0..150 {
        target.tick();
    }
    target.restore(&saved);
    let now = target.effective_now();

    for saved_panel in &saved.panels {
        let panel = target.panel(saved_panel.net_id).unwrap();
        assert_eq!(panel.state.anchor_time(), now);
        assert_eq!(panel.state.anchor_angle(), saved_panel.state.anchor_angle());
    }
    let sun = target.sun(saved.regions[0].region).unwrap();
    assert_eq!(sun.state.anchor_time(), now);

    let packet = target.replicate().unwrap();
    assert_eq!(packet.updates.len(), 17);
}

#[test]
fn test_restore_keeps_future_anchor_and_allocates_fresh_ids() {
    let mut engine = SimulationEngine::new(SimConfig::default());
    let region = engine.spawn_region_with_sun(0.0, 0.0);
    let panel = engine.spawn_panel(region, Position::new(0.0, 0.0));
    let mut saved = engine.save();
    saved.panels[0].state = AngularState::new(0.7, 0.0, 100.0);
    saved.panels[0].net_id = NetId(40);

    let mut restored = SimulationEngine::new(SimConfig::default());
    restored.restore(&saved);
    assert!(restored.panel(panel).is_none());
    assert_eq!(restored.panel(NetId(40)).unwrap().state.anchor_time(), 100.0);

    let fresh = restored.spawn_panel(region, Position::new(4.0, 0.0));
    assert!(fresh.0 > 40);
}

#[test]
fn test_restore_clamps_saved_targets() {
    let mut saved = SimulationEngine::new(SimConfig::default()).save();
    saved.targets = PanelTargets {
        angle: -FRAC_PI_2,
        velocity: 3.0,
    };
    let mut engine = SimulationEngine::new(SimConfig::default());
    engine.restore(&saved);
    assert!((engine.targets().angle - 3.0 * FRAC_PI_2).abs() < EPS);
    assert_eq!(engine.targets().velocity, MAX_PANEL_VELOCITY);
}
