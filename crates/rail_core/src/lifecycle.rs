//! Train lifecycle: initial state, spawning, and arrival retirement.

use crate::grid::Grid;
use crate::halt::HaltField;
use crate::tables::{SwitchTable, TrainTable};
use crate::{
    Counters, DestinationAssignment, Event, EventEnvelope, EventLevel, LevelDef, MetaState, Pos,
    SimPhase, SimState, SpawnBlockReason, SpawnInstruction, Train, TrainId, TrainOutcome,
};

/// Builds tick-0 state from a validated level. No trains exist until their
/// spawn tick comes round.
pub fn initial_state(level: &LevelDef) -> SimState {
    let spawns: Vec<SpawnInstruction> = level
        .trains
        .iter()
        .map(|def| SpawnInstruction {
            tick: def.tick,
            pos: Pos::new(def.row, def.col),
            direction: def.direction,
            color: def.color,
            train: None,
        })
        .collect();

    SimState {
        meta: MetaState {
            tick: 0,
            seed: level.seed,
            phase: SimPhase::Idle,
            weather: level.weather,
            level_name: level.name.clone(),
        },
        destinations: assign_destinations(&level.grid, spawns.len()),
        spawns,
        grid: level.grid.clone(),
        trains: TrainTable::with_capacity(level.constants.max_trains),
        switches: SwitchTable::from_defs(&level.switches),
        halts: HaltField::new(level.grid.rows(), level.grid.cols()),
        constants: level.constants.clone(),
        counters: Counters::default(),
    }
}

/// Round-robin over destination cells in row-major order, one per spawn.
fn assign_destinations(grid: &Grid, spawn_count: usize) -> Vec<DestinationAssignment> {
    let targets = grid.destination_cells();
    if targets.is_empty() {
        return Vec::new();
    }
    (0..spawn_count)
        .map(|spawn_index| DestinationAssignment {
            pos: targets[spawn_index % targets.len()],
            spawn_index,
            train: None,
        })
        .collect()
}

/// Destination of `id`, falling back to the first assignment when the train
/// has none of its own.
pub fn destination_for(destinations: &[DestinationAssignment], id: TrainId) -> Option<Pos> {
    destinations
        .iter()
        .find(|assignment| assignment.train == Some(id))
        .or_else(|| destinations.first())
        .map(|assignment| assignment.pos)
}

/// Spawn phase. Due instructions whose cell is occupied, or that find no free
/// slot, stay unconsumed and retry next tick.
pub(crate) fn spawn_trains(
    state: &mut SimState,
    event_level: EventLevel,
    events: &mut Vec<EventEnvelope>,
) {
    let current_tick = state.meta.tick;

    for spawn_index in 0..state.spawns.len() {
        let spawn = &state.spawns[spawn_index];
        if spawn.train.is_some() || spawn.tick > current_tick {
            continue;
        }
        let (pos, direction, color) = (spawn.pos, spawn.direction, spawn.color);

        let id = match state.trains.free_slot() {
            None => Err(SpawnBlockReason::NoFreeSlot),
            Some(_) if state.trains.is_occupied(pos) => Err(SpawnBlockReason::CellOccupied),
            Some(id) => Ok(id),
        };
        let id = match id {
            Ok(id) => id,
            Err(reason) => {
                tracing::trace!(spawn_index, ?reason, tick = current_tick, "spawn blocked");
                if event_level == EventLevel::Debug {
                    events.push(crate::emit(
                        &mut state.counters,
                        current_tick,
                        Event::SpawnBlocked {
                            spawn_index,
                            reason,
                        },
                    ));
                }
                continue;
            }
        };

        if let Some(assignment) = state
            .destinations
            .iter_mut()
            .find(|assignment| assignment.spawn_index == spawn_index)
        {
            assignment.train = Some(id);
        }
        let destination = destination_for(&state.destinations, id);

        state.trains.insert(Train {
            id,
            pos,
            direction,
            heading: direction,
            color,
            wait_ticks: 0,
            move_counter: 0,
            destination,
            spawn_index,
        });
        state.spawns[spawn_index].train = Some(id);

        tracing::debug!(train = %id, %pos, ?direction, tick = current_tick, "train spawned");
        events.push(crate::emit(
            &mut state.counters,
            current_tick,
            Event::TrainSpawned {
                train_id: id,
                spawn_index,
                pos,
                direction,
            },
        ));
    }
}

/// Retires every active train standing on its own destination.
pub(crate) fn check_arrivals(state: &mut SimState, events: &mut Vec<EventEnvelope>) {
    let current_tick = state.meta.tick;
    let arrived: Vec<(TrainId, Pos)> = state
        .trains
        .active()
        .filter(|train| Some(train.pos) == train.destination)
        .map(|train| (train.id, train.pos))
        .collect();

    for (train_id, pos) in arrived {
        if state
            .trains
            .retire(train_id, TrainOutcome::Arrived, current_tick)
            .is_none()
        {
            continue;
        }
        state.counters.trains_arrived += 1;
        tracing::debug!(train = %train_id, %pos, tick = current_tick, "train arrived");
        events.push(crate::emit(
            &mut state.counters,
            current_tick,
            Event::TrainArrived { train_id, pos },
        ));
    }
}
