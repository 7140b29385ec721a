//! Observer threads: decode replication packets and extrapolate orientation
//! against the shared clock.

use std::io;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, trace, warn};

use helios_core::types::NetId;
use helios_sim::ObserverReplica;

use crate::state::SharedClock;

/// How often an idle observer re-evaluates orientation.
const FRAME_INTERVAL: Duration = Duration::from_millis(100);

/// What an observer saw by the time its channel closed.
#[derive(Debug, Clone, Default)]
pub struct ObserverReport {
    pub index: usize,
    pub packets_applied: u32,
    pub packets_rejected: u32,
    /// Clock reading of the final evaluation.
    pub final_time: f64,
    pub panel_orientations: Vec<(NetId, f64)>,
}

pub fn spawn_observer(
    index: usize,
    packets: mpsc::Receiver<Vec<u8>>,
    clock: SharedClock,
) -> io::Result<JoinHandle<ObserverReport>> {
    std::thread::Builder::new()
        .name(format!("helios-observer-{index}"))
        .spawn(move || run_observer(index, packets, clock))
}

/// Runs until the authority drops its sender.
pub fn run_observer(
    index: usize,
    packets: mpsc::Receiver<Vec<u8>>,
    clock: SharedClock,
) -> ObserverReport {
    let mut replica = ObserverReplica::new();
    let mut report = ObserverReport {
        index,
        ..Default::default()
    };

    loop {
        match packets.recv_timeout(FRAME_INTERVAL) {
            Ok(bytes) => match replica.apply_bytes(&bytes) {
                Ok(true) => report.packets_applied += 1,
                Ok(false) => report.packets_rejected += 1,
                Err(err) => {
                    warn!(observer = index, %err, "undecodable packet");
                    report.packets_rejected += 1;
                }
            },
            Err(mpsc::RecvTimeoutError::Timeout) => {
                let now = clock.now();
                trace!(
                    observer = index,
                    now,
                    panels = replica.panel_orientations(now).len(),
                    "observer frame"
                );
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    report.final_time = clock.now();
    report.panel_orientations = replica.panel_orientations(report.final_time);
    debug!(
        observer = index,
        applied = report.packets_applied,
        rejected = report.packets_rejected,
        "observer finished"
    );
    report
}
