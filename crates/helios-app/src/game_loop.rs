//! Authority thread: runs the simulation engine at 30Hz and replicates to
//! observers.
//!
//! The engine is moved into this thread and handed back when the loop ends.
//! Commands arrive via `mpsc` channel. Replication packets leave through the
//! codec to every observer channel; snapshots are stored in shared state for
//! synchronous polling.

use std::io;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use helios_core::commands::OperatorCommand;
use helios_core::constants::TICK_RATE;
use helios_core::state::SimSnapshot;
use helios_sim::replication::{encode_packet, ReplicationPacket, ReplicationTransport};
use helios_sim::SimulationEngine;

use crate::state::{GameLoopCommand, SharedClock};

/// Nominal duration of one tick.
pub const TICK_DURATION: Duration = Duration::from_nanos(1_000_000_000 / TICK_RATE as u64);

/// How the loop spaces its ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pacing {
    /// Sleep to hold the tick rate against the wall clock.
    #[default]
    RealTime,
    /// Tick as fast as possible.
    Unthrottled,
}

/// An operator command due on a given tick.
#[derive(Debug, Clone)]
pub struct ScheduledCommand {
    pub tick: u64,
    pub command: OperatorCommand,
}

#[derive(Debug, Clone, Default)]
pub struct LoopSettings {
    /// Stop after this many ticks. `None` runs until shutdown.
    pub max_ticks: Option<u64>,
    pub pacing: Pacing,
    /// Commands queued on their tick, in addition to channel traffic.
    pub script: Vec<ScheduledCommand>,
}

/// Everything the authority thread needs besides the engine.
pub struct LoopContext {
    pub commands: mpsc::Receiver<GameLoopCommand>,
    pub latest_snapshot: Arc<Mutex<Option<SimSnapshot>>>,
    pub clock: SharedClock,
    pub observers: Vec<mpsc::Sender<Vec<u8>>>,
    pub settings: LoopSettings,
}

/// Spawns the authority loop in a new thread. Joining the handle returns the
/// engine in its final state.
pub fn spawn_game_loop(
    engine: SimulationEngine,
    context: LoopContext,
) -> io::Result<JoinHandle<SimulationEngine>> {
    std::thread::Builder::new()
        .name("helios-authority".into())
        .spawn(move || run_game_loop(engine, context))
}

/// The authority loop. Runs until the tick budget is spent, a Shutdown
/// command arrives, or the command channel disconnects.
pub fn run_game_loop(mut engine: SimulationEngine, context: LoopContext) -> SimulationEngine {
    let LoopContext {
        commands,
        latest_snapshot,
        clock,
        mut observers,
        settings,
    } = context;

    let mut script = settings.script;
    script.sort_by_key(|s| s.tick);
    let mut script = script.into_iter().peekable();

    // Observers start with the whole world.
    broadcast(&mut observers, &engine.full_sync());
    clock.set(engine.time().elapsed_secs);

    let mut next_tick_time = Instant::now();
    loop {
        // 1. Drain all pending commands
        loop {
            match commands.try_recv() {
                Ok(GameLoopCommand::Operator(cmd)) => engine.queue_command(cmd),
                Ok(GameLoopCommand::Shutdown) => {
                    info!(tick = engine.time().tick, "authority shutting down");
                    return engine;
                }
                Err(mpsc::TryRecvError::Empty) => break,
                Err(mpsc::TryRecvError::Disconnected) => return engine,
            }
        }

        // 2. Scripted commands due on the coming tick
        let upcoming = engine.time().tick + 1;
        while let Some(scheduled) = script.next_if(|s| s.tick <= upcoming) {
            engine.queue_command(scheduled.command);
        }

        // 3. Advance one tick (engine handles pause semantics internally)
        let snapshot = engine.tick();

        // 4. Replicate changed anchors, then publish the new time
        if let Some(packet) = engine.replicate() {
            broadcast(&mut observers, &packet);
        }
        clock.set(engine.time().elapsed_secs);

        for console in &snapshot.console {
            info!(
                region = console.region.0,
                total_output = console.total_output,
                target_angle = console.target_angle,
                target_velocity = console.target_velocity,
                sun_direction = ?console.sun_direction,
                paused = console.is_paused,
                "console update"
            );
        }

        // 5. Store latest snapshot for synchronous polling
        let tick = snapshot.time.tick;
        if let Ok(mut lock) = latest_snapshot.lock() {
            *lock = Some(snapshot);
        }

        if settings.max_ticks.is_some_and(|max| tick >= max) {
            debug!(tick, "tick budget spent");
            return engine;
        }

        // 6. Sleep until next tick
        if settings.pacing == Pacing::RealTime {
            next_tick_time += TICK_DURATION;
            let now = Instant::now();
            if next_tick_time > now {
                std::thread::sleep(next_tick_time - now);
            } else if now - next_tick_time > TICK_DURATION * 2 {
                // Too far behind: reset to avoid a catch-up spiral
                next_tick_time = now;
            }
        }
    }
}

/// Encode once and send to every observer, dropping observers whose channel
/// has closed.
fn broadcast(observers: &mut Vec<mpsc::Sender<Vec<u8>>>, packet: &ReplicationPacket) {
    if observers.is_empty() {
        return;
    }
    let bytes = match encode_packet(packet) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(%err, tick = packet.tick, "dropping replication packet");
            return;
        }
    };
    observers.retain_mut(|tx| match tx.send_bytes(bytes.clone()) {
        Ok(()) => true,
        Err(err) => {
            warn!(%err, "observer disconnected");
            false
        }
    });
}
