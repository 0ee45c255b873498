use crate::commands::apply_commands;
use crate::lifecycle::{check_arrivals, spawn_trains};
use crate::movement::move_trains;
use crate::routing::route_trains;
use crate::switches::{apply_deferred_flips, compute_signals, schedule_flips, update_counters};
use crate::{Command, Event, EventEnvelope, EventLevel, SimPhase, SimState};

/// Advance the simulation by one tick.
///
/// Order of operations:
/// 1. Apply host commands.
/// 2. Spawn due trains.
/// 3. Count switch entries, then schedule (not apply) flips.
/// 4. Route every active train.
/// 5. Recompute switch signals.
/// 6. Plan, resolve, and commit movement.
/// 7. Apply deferred switch flips.
/// 8. Apply emergency halts, then count them down.
/// 9. Retire arrivals.
/// 10. Increment tick counter and evaluate completion.
///
/// A completed simulation is left untouched. Returns all events produced this tick.
pub fn tick(
    state: &mut SimState,
    commands: &[Command],
    event_level: EventLevel,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    match state.meta.phase {
        SimPhase::Complete => return events,
        SimPhase::Idle => state.meta.phase = SimPhase::Running,
        SimPhase::Running => {}
    }

    apply_commands(state, commands);
    spawn_trains(state, event_level, &mut events);
    update_counters(state);
    schedule_flips(state);
    route_trains(state);
    compute_signals(state, event_level, &mut events);
    move_trains(state, event_level, &mut events);
    apply_deferred_flips(state, &mut events);
    state.halts.apply(&mut state.trains);
    state.halts.decrement();
    check_arrivals(state, &mut events);

    state.meta.tick += 1;

    if is_complete(state) {
        state.meta.phase = SimPhase::Complete;
        tracing::debug!(
            tick = state.meta.tick,
            arrived = state.counters.trains_arrived,
            crashed = state.counters.trains_crashed,
            "simulation complete"
        );
        let current_tick = state.meta.tick;
        let event = Event::SimulationComplete {
            trains_arrived: state.counters.trains_arrived,
            trains_crashed: state.counters.trains_crashed,
        };
        events.push(crate::emit(&mut state.counters, current_tick, event));
    }

    events
}

/// True once every scheduled train has arrived or crashed, or the tick
/// ceiling is reached. Never true before the first tick. A spawn stranded
/// by a full train table keeps the run open until the ceiling.
pub fn is_complete(state: &SimState) -> bool {
    let tick = state.meta.tick;
    if tick == 0 {
        return false;
    }
    let resolved = state.counters.trains_arrived as usize + state.counters.trains_crashed as usize;
    resolved >= state.spawns.len() || tick >= state.constants.max_ticks
}
