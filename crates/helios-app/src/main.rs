use std::sync::mpsc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::prelude::*;

use helios_app::cli::Args;
use helios_app::ipc;
use helios_app::observer::{self, ObserverReport};
use helios_app::state::AppState;
use helios_core::angular::angle_delta;
use helios_sim::persistence::{load_from_file, save_to_file};
use helios_sim::SimulationEngine;

fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.sim_config()?;
    info!(seed = config.seed, "starting helios");

    let mut engine = SimulationEngine::new(config);
    match &args.load {
        Some(path) => {
            let saved = load_from_file(path)
                .with_context(|| format!("loading world from {}", path.display()))?;
            engine.restore(&saved);
        }
        None => {
            engine.setup_default_array();
        }
    }

    if let Some(command) = args.initial_command() {
        engine.queue_command(command);
    }

    let state = AppState::new();

    let mut observer_txs = Vec::with_capacity(args.observers);
    let mut observer_handles = Vec::with_capacity(args.observers);
    for index in 0..args.observers {
        let (tx, rx) = mpsc::channel();
        let handle = observer::spawn_observer(index, rx, state.clock.clone())
            .with_context(|| format!("spawning observer {index}"))?;
        observer_txs.push(tx);
        observer_handles.push(handle);
    }

    let authority = ipc::start_simulation(&state, engine, observer_txs, args.loop_settings())
        .context("starting authority thread")?;
    let engine = authority
        .join()
        .map_err(|_| anyhow!("authority thread panicked"))?;

    let mut reports = Vec::with_capacity(observer_handles.len());
    for handle in observer_handles {
        reports.push(
            handle
                .join()
                .map_err(|_| anyhow!("observer thread panicked"))?,
        );
    }

    let time = engine.time();
    info!(
        tick = time.tick,
        elapsed = time.elapsed_secs,
        total_output = engine.total_output(),
        paused = engine.is_paused(),
        "simulation finished"
    );
    for report in &reports {
        info!(
            observer = report.index,
            applied = report.packets_applied,
            rejected = report.packets_rejected,
            max_drift = max_drift(&engine, report),
            "observer agreement"
        );
    }

    if let Some(path) = &args.save {
        save_to_file(&engine.save(), path)
            .with_context(|| format!("saving world to {}", path.display()))?;
        info!(path = %path.display(), "world saved");
    }

    Ok(())
}

/// Largest angular disagreement between an observer and the authority.
fn max_drift(engine: &SimulationEngine, report: &ObserverReport) -> f64 {
    let view_time = match engine.paused_at() {
        Some(at) => report.final_time.min(at),
        None => report.final_time,
    };
    report
        .panel_orientations
        .iter()
        .filter_map(|(net_id, angle)| {
            let panel = engine.panel(*net_id)?;
            Some(angle_delta(panel.state.angle_at(view_time), *angle).abs())
        })
        .fold(0.0, f64::max)
}
