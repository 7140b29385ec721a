//! Command-line interface.
//!
//! Angles and rates are taken in degrees on the command line and converted
//! to the engine's radians here.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use helios_core::commands::OperatorCommand;
use helios_core::constants::{DEG_TO_RAD, TICK_RATE};
use helios_sim::SimConfig;

use crate::game_loop::{LoopSettings, Pacing, ScheduledCommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless solar tracking simulation")]
pub struct Args {
    /// RNG seed for the sun (overrides the config file)
    #[arg(long)]
    pub seed: Option<u64>,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 10.0)]
    pub seconds: f64,

    /// JSON engine config; missing keys keep their defaults
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Initial panel rotation target in degrees (0 = North, clockwise)
    #[arg(long, allow_hyphen_values = true)]
    pub rotation: Option<f64>,

    /// Initial panel angular velocity target in degrees per second
    #[arg(long, allow_hyphen_values = true)]
    pub velocity: Option<f64>,

    /// Number of observer threads fed through the replication codec
    #[arg(long, default_value_t = 1)]
    pub observers: usize,

    /// Pause at this many simulated seconds
    #[arg(long)]
    pub pause_at: Option<f64>,

    /// Stay paused this many seconds (requires --pause-at)
    #[arg(long, default_value_t = 2.0, requires = "pause_at")]
    pub pause_for: f64,

    /// Restore the world from a saved JSON file instead of the default array
    #[arg(long)]
    pub load: Option<PathBuf>,

    /// Write the final world to this JSON file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Tick as fast as possible instead of in real time
    #[arg(long)]
    pub fast: bool,
}

impl Args {
    /// Defaults, overridden by the config file, overridden by flags.
    pub fn sim_config(&self) -> Result<SimConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                SimConfig::from_json(&json)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => SimConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok(config)
    }

    /// The operator adjustment requested on the command line, if any.
    pub fn initial_command(&self) -> Option<OperatorCommand> {
        if self.rotation.is_none() && self.velocity.is_none() {
            return None;
        }
        Some(OperatorCommand::AdjustPanels {
            rotation: self.rotation.map(|deg| deg * DEG_TO_RAD),
            angular_velocity: self.velocity.map(|deg| deg * DEG_TO_RAD),
        })
    }

    pub fn loop_settings(&self) -> LoopSettings {
        let mut script = Vec::new();
        if let Some(pause_at) = self.pause_at {
            let pause_tick = secs_to_ticks(pause_at).max(1);
            script.push(ScheduledCommand {
                tick: pause_tick,
                command: OperatorCommand::Pause,
            });
            script.push(ScheduledCommand {
                tick: pause_tick + secs_to_ticks(self.pause_for).max(1),
                command: OperatorCommand::Resume,
            });
        }

        LoopSettings {
            max_ticks: Some(secs_to_ticks(self.seconds).max(1)),
            pacing: if self.fast {
                Pacing::Unthrottled
            } else {
                Pacing::RealTime
            },
            script,
        }
    }
}

fn secs_to_ticks(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * TICK_RATE as f64).round() as u64
    } else {
        0
    }
}
