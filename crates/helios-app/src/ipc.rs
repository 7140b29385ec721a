//! Control surface over the authority thread.
//!
//! These functions bridge a front end (the CLI here) to the authority thread
//! via channels, the same way a UI would.

use std::sync::mpsc;
use std::thread::JoinHandle;

use thiserror::Error;

use helios_core::commands::OperatorCommand;
use helios_core::state::SimSnapshot;
use helios_sim::SimulationEngine;

use crate::game_loop::{self, LoopContext, LoopSettings};
use crate::state::{AppState, GameLoopCommand};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("simulation already running")]
    AlreadyRunning,
    #[error("simulation not started")]
    NotStarted,
    #[error("authority thread is gone")]
    Disconnected,
    #[error("shared state lock poisoned")]
    LockPoisoned,
    #[error("failed to spawn authority thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Start the authority thread with `engine`. Fails if already started.
pub fn start_simulation(
    state: &AppState,
    engine: SimulationEngine,
    observers: Vec<mpsc::Sender<Vec<u8>>>,
    settings: LoopSettings,
) -> Result<JoinHandle<SimulationEngine>, AppError> {
    let mut running = state.running.lock().map_err(|_| AppError::LockPoisoned)?;
    if *running {
        return Err(AppError::AlreadyRunning);
    }

    let (cmd_tx, cmd_rx) = mpsc::channel::<GameLoopCommand>();
    let handle = game_loop::spawn_game_loop(
        engine,
        LoopContext {
            commands: cmd_rx,
            latest_snapshot: state.latest_snapshot.clone(),
            clock: state.clock.clone(),
            observers,
            settings,
        },
    )?;

    let mut tx_lock = state.command_tx.lock().map_err(|_| AppError::LockPoisoned)?;
    *tx_lock = Some(cmd_tx);
    *running = true;

    Ok(handle)
}

/// Send an operator command to the simulation.
pub fn send_command(state: &AppState, command: OperatorCommand) -> Result<(), AppError> {
    send(state, GameLoopCommand::Operator(command))
}

/// Ask the authority thread to stop after its current tick.
pub fn shutdown(state: &AppState) -> Result<(), AppError> {
    send(state, GameLoopCommand::Shutdown)
}

/// Get the latest snapshot synchronously.
pub fn get_snapshot(state: &AppState) -> Result<Option<SimSnapshot>, AppError> {
    let lock = state
        .latest_snapshot
        .lock()
        .map_err(|_| AppError::LockPoisoned)?;
    Ok(lock.clone())
}

fn send(state: &AppState, command: GameLoopCommand) -> Result<(), AppError> {
    let tx_lock = state.command_tx.lock().map_err(|_| AppError::LockPoisoned)?;
    match tx_lock.as_ref() {
        Some(tx) => tx.send(command).map_err(|_| AppError::Disconnected),
        None => Err(AppError::NotStarted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helios_sim::SimConfig;

    #[test]
    fn test_send_before_start_fails() {
        let state = AppState::new();
        let err = send_command(&state, OperatorCommand::Pause).unwrap_err();
        assert!(matches!(err, AppError::NotStarted));
    }

    #[test]
    fn test_start_twice_fails_and_shutdown_returns_engine() {
        let state = AppState::new();
        let handle = start_simulation(
            &state,
            SimulationEngine::new(SimConfig::default()),
            Vec::new(),
            LoopSettings::default(),
        )
        .unwrap();

        let again = start_simulation(
            &state,
            SimulationEngine::new(SimConfig::default()),
            Vec::new(),
            LoopSettings::default(),
        );
        assert!(matches!(again, Err(AppError::AlreadyRunning)));

        send_command(&state, OperatorCommand::Pause).unwrap();
        shutdown(&state).unwrap();
        let engine = handle.join().unwrap();
        assert_eq!(engine.world().len(), 0);
        assert!(get_snapshot(&state).is_ok());
    }
}
