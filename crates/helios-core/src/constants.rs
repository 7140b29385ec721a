//! Simulation constants and tuning parameters.

/// Simulation tick rate (Hz).
pub const TICK_RATE: u32 = 30;

/// Seconds per tick.
pub const DT: f64 = 1.0 / TICK_RATE as f64;

// --- Sun ---

/// Base sun angular velocity (radians per second), 0.1°/s.
pub const SUN_BASE_VELOCITY: f64 = 0.1 * DEG_TO_RAD;

/// Total width of the random band around the base sun velocity, 0.05°/s.
/// The drawn velocity lies in `base ± width / 2`.
pub const SUN_VELOCITY_JITTER: f64 = 0.05 * DEG_TO_RAD;

/// Distance past which the sun is considered visible anyway (world units).
pub const SUN_OCCLUSION_CHECK_DISTANCE: f64 = 20.0;

// --- Panels ---

/// Maximum commanded panel angular velocity (radians per second), 1°/s.
pub const MAX_PANEL_VELOCITY: f64 = 1.0 * DEG_TO_RAD;

/// Rated output of a standard panel (watts).
pub const DEFAULT_PANEL_MAX_OUTPUT: f64 = 1500.0;

/// Half-size of a panel's physical body (world units).
pub const PANEL_HALF_EXTENT: f64 = 0.5;

// --- Console ---

/// Minimum host time between console state pushes (seconds).
pub const CONSOLE_UPDATE_INTERVAL_SECS: f64 = 1.0;

// --- Occlusion ---

/// Upper bound on non-passable blockers within reach of one visibility ray.
/// A query with more candidates is reported as a fault (and the panel as
/// occluded).
pub const MAX_BLOCKERS_PER_QUERY: usize = 4096;

// --- Units ---

pub const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;
