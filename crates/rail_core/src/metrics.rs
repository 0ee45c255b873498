//! Read-only views computed from `SimState`.
//!
//! `compute_metrics` samples aggregate counters for status lines and reports;
//! `SimState::snapshot` exposes the per-tick state a renderer or host needs.
//! No state mutation, no IO.

use serde::Serialize;

use crate::grid::Grid;
use crate::{
    Counters, Direction, Pos, Signal, SimPhase, SimState, SwitchMode, TrainId, Weather,
};

/// Current schema version. Bump when fields are added, removed, or reordered.
const METRICS_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub tick: u64,
    pub metrics_version: u32,

    // Trains
    pub trains_active: u32,
    pub trains_waiting: u32,
    pub trains_arrived: u32,
    pub trains_crashed: u32,
    pub spawns_pending: u32,

    // Totals
    pub total_wait_ticks: u64,
    pub total_energy: u64,
    pub switch_flips: u32,

    // Signals
    pub switches_green: u32,
    pub switches_yellow: u32,
    pub switches_red: u32,
}

pub fn compute_metrics(state: &SimState) -> MetricsSnapshot {
    let mut trains_active = 0;
    let mut trains_waiting = 0;
    for train in state.trains.active() {
        trains_active += 1;
        if train.is_waiting() {
            trains_waiting += 1;
        }
    }

    let mut by_signal = [0u32; 3];
    for switch in state.switches.iter() {
        let slot = match switch.signal {
            Signal::Green => 0,
            Signal::Yellow => 1,
            Signal::Red => 2,
        };
        by_signal[slot] += 1;
    }

    MetricsSnapshot {
        tick: state.meta.tick,
        metrics_version: METRICS_VERSION,
        trains_active,
        trains_waiting,
        trains_arrived: state.counters.trains_arrived,
        trains_crashed: state.counters.trains_crashed,
        spawns_pending: state.spawns.iter().filter(|s| s.train.is_none()).count() as u32,
        total_wait_ticks: state.counters.total_wait_ticks,
        total_energy: state.counters.total_energy,
        switch_flips: state.counters.switch_flips,
        switches_green: by_signal[0],
        switches_yellow: by_signal[1],
        switches_red: by_signal[2],
    }
}

// ---------------------------------------------------------------------------
// Per-tick snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TrainView {
    pub id: TrainId,
    pub pos: Pos,
    pub direction: Direction,
    pub color: u8,
    pub waiting: bool,
    pub destination: Option<Pos>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwitchView {
    pub letter: char,
    pub mode: SwitchMode,
    pub state: u8,
    pub signal: Signal,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimSnapshot<'a> {
    pub tick: u64,
    pub phase: SimPhase,
    pub weather: Weather,
    pub grid: &'a Grid,
    pub trains: Vec<TrainView>,
    pub switches: Vec<SwitchView>,
    pub counters: &'a Counters,
}

impl SimState {
    /// Borrowed view of everything a host may render between ticks.
    pub fn snapshot(&self) -> SimSnapshot<'_> {
        SimSnapshot {
            tick: self.meta.tick,
            phase: self.meta.phase,
            weather: self.meta.weather,
            grid: &self.grid,
            trains: self
                .trains
                .active()
                .map(|train| TrainView {
                    id: train.id,
                    pos: train.pos,
                    direction: train.direction,
                    color: train.color,
                    waiting: train.is_waiting(),
                    destination: train.destination,
                })
                .collect(),
            switches: self
                .switches
                .iter()
                .map(|switch| SwitchView {
                    letter: switch.id.letter(),
                    mode: switch.mode,
                    state: switch.state,
                    signal: switch.signal,
                })
                .collect(),
            counters: &self.counters,
        }
    }
}
