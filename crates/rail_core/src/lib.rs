//! Deterministic train tick simulation.
//!
//! No IO, no network, no wall clock. The same level and command stream
//! always produce the same state and events.

mod commands;
mod engine;
mod grid;
mod halt;
mod lifecycle;
pub mod metrics;
mod movement;
mod routing;
mod switches;
mod tables;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use commands::{apply_command, toggle_safety_tile};
pub use engine::{is_complete, tick};
pub use grid::{Grid, GridError};
pub use halt::HaltField;
pub use lifecycle::{destination_for, initial_state};
pub use metrics::{compute_metrics, MetricsSnapshot, SimSnapshot, SwitchView, TrainView};
pub use routing::{next_direction, smart_direction, switch_direction};
pub use switches::{signal_at, toggle_switch_state};
pub use tables::{SwitchTable, TrainTable};
pub use types::*;

pub(crate) fn emit(counters: &mut Counters, tick: u64, event: Event) -> EventEnvelope {
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    EventEnvelope { id, tick, event }
}

#[cfg(test)]
mod tests;
