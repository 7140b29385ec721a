//! Application state shared between the control surface, the authority
//! thread, and observer threads.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use helios_core::commands::OperatorCommand;
use helios_core::state::SimSnapshot;

/// Commands sent from the control surface to the authority thread.
#[derive(Debug)]
pub enum GameLoopCommand {
    /// An operator command to forward to the simulation engine.
    Operator(OperatorCommand),
    /// Stop the authority thread after the current tick.
    Shutdown,
}

/// Shared application state.
///
/// - `mpsc::Sender` sits behind a `Mutex` so the state is `Sync`
/// - `Mutex<Option<...>>` holds what does not exist before `start_simulation`
/// - `Arc<Mutex<...>>` holds the latest snapshot, shared with the authority thread
pub struct AppState {
    /// Channel sender to forward commands to the authority thread.
    /// `None` before `start_simulation` is called.
    pub command_tx: Mutex<Option<mpsc::Sender<GameLoopCommand>>>,
    /// Latest snapshot for synchronous `get_snapshot` queries.
    /// Updated by the authority thread after each tick.
    pub latest_snapshot: Arc<Mutex<Option<SimSnapshot>>>,
    /// Whether the authority thread has been started.
    pub running: Mutex<bool>,
    /// Synchronized sim clock observers evaluate against.
    pub clock: SharedClock,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            command_tx: Mutex::new(None),
            latest_snapshot: Arc::new(Mutex::new(None)),
            running: Mutex::new(false),
            clock: SharedClock::default(),
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The authority's sim time, published after every tick.
///
/// Stands in for a synchronized network clock: observers read it as their
/// local "now" and never receive per-tick traffic.
#[derive(Debug, Clone, Default)]
pub struct SharedClock(Arc<AtomicU64>);

impl SharedClock {
    pub fn set(&self, secs: f64) {
        self.0.store(secs.to_bits(), Ordering::Release);
    }

    pub fn now(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }
}
