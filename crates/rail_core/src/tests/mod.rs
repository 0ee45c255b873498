use super::*;
use crate::test_fixtures::{level, spawn, switch_def};


// --- Shared test helpers ------------------------------------------------

/// Runs `ticks` ticks without commands, collecting every event.
fn run(state: &mut SimState, ticks: usize) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        events.extend(tick(state, &[], EventLevel::Normal));
    }
    events
}

/// Ticks until the completion predicate holds or `limit` ticks have run.
fn run_to_completion(state: &mut SimState, limit: usize) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    for _ in 0..limit {
        if state.meta.phase == SimPhase::Complete {
            break;
        }
        events.extend(tick(state, &[], EventLevel::Normal));
    }
    events
}

fn pos_of(state: &SimState, slot: usize) -> Option<Pos> {
    state.trains.get(TrainId(slot)).map(|train| train.pos)
}

fn crash_reasons(events: &[EventEnvelope]) -> Vec<CrashReason> {
    events
        .iter()
        .filter_map(|e| match e.event {
            Event::TrainCrashed { reason, .. } => Some(reason),
            _ => None,
        })
        .collect()
}

/// One eastbound train on a straight line ending in a destination.
fn straight_line(map: &str) -> SimState {
    initial_state(&level(&[map], vec![spawn(0, 0, 0, Direction::Right)], vec![]))
}
