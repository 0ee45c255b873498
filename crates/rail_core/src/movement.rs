//! Movement phase: plan every train's step, resolve conflicts against the
//! pre-move snapshot, then commit all survivors at once.

use ahash::AHashSet;

use crate::grid::Grid;
use crate::{
    CollisionPriority, Constants, CrashReason, Event, EventEnvelope, EventLevel, HoldReason, Pos,
    Signal, SimState, TileKind, Train, TrainId, TrainOutcome, Weather,
};

/// Why a train was never a movement candidate this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StayReason {
    AtDestination,
    Waiting,
    RedSignal,
    Weather,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Stay(StayReason),
    Move(Pos),
    OffTrack,
}

/// One intended move, captured before anything is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Plan {
    pub id: TrainId,
    pub from: Pos,
    pub to: Pos,
    /// Manhattan distance from `to` to the train's destination.
    pub distance: u32,
}

/// Ordered by severity so that pairwise outcomes combine with `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Resolution {
    Proceed,
    Hold(HoldReason),
    Crash(CrashReason),
}

/// Gating for a single train. Mutates only the train's own wait and weather
/// counters.
fn plan_step(
    train: &mut Train,
    grid: &Grid,
    red_signal: bool,
    weather: Weather,
    constants: &Constants,
) -> Step {
    if Some(train.pos) == train.destination {
        return Step::Stay(StayReason::AtDestination);
    }
    if train.wait_ticks > 0 {
        train.wait_ticks -= 1;
        return Step::Stay(StayReason::Waiting);
    }
    if red_signal {
        train.wait_ticks = 1;
        return Step::Stay(StayReason::RedSignal);
    }
    if weather == Weather::Rain && constants.rain_slowdown_interval > 0 {
        train.move_counter += 1;
        if train.move_counter >= constants.rain_slowdown_interval {
            train.move_counter = 0;
            return Step::Stay(StayReason::Weather);
        }
    }
    let next = train.pos.step(train.direction);
    if grid.is_traversable(next) {
        Step::Move(next)
    } else {
        Step::OffTrack
    }
}

/// Outcome of a distance contest between two trains.
fn contest(
    a: &Plan,
    b: &Plan,
    priority: CollisionPriority,
    tie: CrashReason,
) -> (Resolution, Resolution) {
    if a.distance == b.distance {
        return (Resolution::Crash(tie), Resolution::Crash(tie));
    }
    let a_nearer = a.distance < b.distance;
    let a_proceeds = match priority {
        CollisionPriority::NearerProceeds => a_nearer,
        CollisionPriority::FartherProceeds => !a_nearer,
    };
    let held = Resolution::Hold(HoldReason::Yielded);
    if a_proceeds {
        (Resolution::Proceed, held)
    } else {
        (held, Resolution::Proceed)
    }
}

/// A swap on plain straight track, or touching a safety tile, has no way out.
fn is_deadlock(grid: &Grid, a: &Plan, b: &Plan) -> bool {
    let (ka, kb) = (grid.classify(a.from), grid.classify(b.from));
    (ka.is_straight() && kb.is_straight()) || ka == TileKind::Safety || kb == TileKind::Safety
}

/// Resolves every planned move against every other, then holds any mover
/// whose target stays occupied. Result is independent of plan order.
pub(crate) fn resolve(
    grid: &Grid,
    plans: &[Plan],
    stationary: &AHashSet<Pos>,
    priority: CollisionPriority,
) -> Vec<Resolution> {
    let mut resolutions = vec![Resolution::Proceed; plans.len()];

    for i in 0..plans.len() {
        for j in i + 1..plans.len() {
            let (a, b) = (&plans[i], &plans[j]);
            let outcome = if a.to == b.to {
                Some(contest(a, b, priority, CrashReason::SameTargetTie))
            } else if a.to == b.from && b.to == a.from {
                if is_deadlock(grid, a, b) {
                    let crash = Resolution::Crash(CrashReason::HeadOnDeadlock);
                    Some((crash, crash))
                } else {
                    Some(contest(a, b, priority, CrashReason::SwapTie))
                }
            } else {
                None
            };
            if let Some((ra, rb)) = outcome {
                resolutions[i] = resolutions[i].max(ra);
                resolutions[j] = resolutions[j].max(rb);
            }
        }
    }

    // Cells that will still be occupied after commit.
    let mut occupied = stationary.clone();
    for (plan, resolution) in plans.iter().zip(&resolutions) {
        if matches!(resolution, Resolution::Hold(_)) {
            occupied.insert(plan.from);
        }
    }
    loop {
        let mut changed = false;
        for (plan, resolution) in plans.iter().zip(resolutions.iter_mut()) {
            if *resolution == Resolution::Proceed && occupied.contains(&plan.to) {
                *resolution = Resolution::Hold(HoldReason::Blocked);
                occupied.insert(plan.from);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    resolutions
}

fn crash(
    state: &mut SimState,
    train_id: TrainId,
    pos: Pos,
    reason: CrashReason,
    events: &mut Vec<EventEnvelope>,
) {
    let current_tick = state.meta.tick;
    if state
        .trains
        .retire(train_id, TrainOutcome::Crashed(reason), current_tick)
        .is_none()
    {
        return;
    }
    state.counters.trains_crashed += 1;
    tracing::debug!(train = %train_id, %pos, ?reason, tick = current_tick, "train crashed");
    events.push(crate::emit(
        &mut state.counters,
        current_tick,
        Event::TrainCrashed {
            train_id,
            pos,
            reason,
        },
    ));
}

/// Movement phase. Planning reads the snapshot taken after routing and
/// signalling; nothing moves until every conflict is resolved.
pub(crate) fn move_trains(
    state: &mut SimState,
    event_level: EventLevel,
    events: &mut Vec<EventEnvelope>,
) {
    let weather = state.meta.weather;
    let mut plans = Vec::new();
    let mut stayed = Vec::new();
    let mut off_track = Vec::new();

    for id in state.trains.active_ids() {
        let Some(pos) = state.trains.get(id).map(|train| train.pos) else {
            continue;
        };
        let red_signal = state
            .grid
            .switch_id(pos)
            .and_then(|switch_id| state.switches.get(switch_id))
            .is_some_and(|switch| switch.signal == Signal::Red);
        let Some(train) = state.trains.get_mut(id) else {
            continue;
        };
        match plan_step(train, &state.grid, red_signal, weather, &state.constants) {
            Step::Stay(reason) => stayed.push((id, reason)),
            Step::Move(to) => plans.push(Plan {
                id,
                from: train.pos,
                to,
                distance: train.distance_from(to),
            }),
            Step::OffTrack => off_track.push((id, train.pos)),
        }
    }

    for (id, pos) in off_track {
        crash(state, id, pos, CrashReason::OffTrack, events);
    }

    let stationary: AHashSet<Pos> = stayed
        .iter()
        .filter_map(|&(id, _)| state.trains.get(id).map(|train| train.pos))
        .collect();
    let resolutions = resolve(
        &state.grid,
        &plans,
        &stationary,
        state.constants.collision_priority,
    );

    state.counters.total_wait_ticks += stayed
        .iter()
        .filter(|&&(_, reason)| reason != StayReason::AtDestination)
        .count() as u64;

    commit(state, &plans, &resolutions, event_level, events);
}

fn commit(
    state: &mut SimState,
    plans: &[Plan],
    resolutions: &[Resolution],
    event_level: EventLevel,
    events: &mut Vec<EventEnvelope>,
) {
    let current_tick = state.meta.tick;

    for (plan, resolution) in plans.iter().zip(resolutions) {
        match *resolution {
            Resolution::Crash(reason) => crash(state, plan.id, plan.from, reason, events),
            Resolution::Hold(reason) => {
                state.counters.total_wait_ticks += 1;
                tracing::trace!(train = %plan.id, pos = %plan.from, ?reason, tick = current_tick, "train held");
                if event_level == EventLevel::Debug {
                    events.push(crate::emit(
                        &mut state.counters,
                        current_tick,
                        Event::TrainHeld {
                            train_id: plan.id,
                            pos: plan.from,
                            reason,
                        },
                    ));
                }
            }
            Resolution::Proceed => {
                let safety_wait = if state.grid.classify(plan.to) == TileKind::Safety {
                    state.grid.safety_wait(plan.to)
                } else {
                    0
                };
                let Some(train) = state.trains.get_mut(plan.id) else {
                    continue;
                };
                train.pos = plan.to;
                train.heading = train.direction;
                train.wait_ticks = train.wait_ticks.max(safety_wait);
                state.counters.total_energy += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::grid;

    fn plan(id: usize, from: (i32, i32), to: (i32, i32), distance: u32) -> Plan {
        Plan {
            id: TrainId(id),
            from: Pos::new(from.0, from.1),
            to: Pos::new(to.0, to.1),
            distance,
        }
    }

    fn no_stationary() -> AHashSet<Pos> {
        AHashSet::new()
    }

    #[test]
    fn same_target_farther_proceeds_by_default() {
        let g = grid(&["-+-", ".|."]);
        let plans = [plan(0, (0, 0), (0, 1), 4), plan(1, (1, 1), (0, 1), 2)];
        let res = resolve(&g, &plans, &no_stationary(), CollisionPriority::default());
        assert_eq!(
            res,
            vec![Resolution::Proceed, Resolution::Hold(HoldReason::Yielded)]
        );
    }

    #[test]
    fn same_target_nearer_proceeds_when_configured() {
        let g = grid(&["-+-", ".|."]);
        let plans = [plan(0, (0, 0), (0, 1), 4), plan(1, (1, 1), (0, 1), 2)];
        let res = resolve(&g, &plans, &no_stationary(), CollisionPriority::NearerProceeds);
        assert_eq!(
            res,
            vec![Resolution::Hold(HoldReason::Yielded), Resolution::Proceed]
        );
    }

    #[test]
    fn same_target_tie_crashes_both() {
        let g = grid(&["-+-"]);
        let plans = [plan(0, (0, 0), (0, 1), 3), plan(1, (0, 2), (0, 1), 3)];
        let res = resolve(&g, &plans, &no_stationary(), CollisionPriority::NearerProceeds);
        let crash = Resolution::Crash(CrashReason::SameTargetTie);
        assert_eq!(res, vec![crash, crash]);
    }

    #[test]
    fn swap_on_straight_track_is_a_deadlock() {
        let g = grid(&["----"]);
        let plans = [plan(0, (0, 1), (0, 2), 1), plan(1, (0, 2), (0, 1), 5)];
        let res = resolve(&g, &plans, &no_stationary(), CollisionPriority::NearerProceeds);
        let crash = Resolution::Crash(CrashReason::HeadOnDeadlock);
        assert_eq!(res, vec![crash, crash]);
    }

    #[test]
    fn swap_touching_safety_is_a_deadlock() {
        let mut g = grid(&["-+-"]);
        assert!(g.toggle_safety(Pos::new(0, 0), 1));
        let plans = [plan(0, (0, 0), (0, 1), 1), plan(1, (0, 1), (0, 0), 5)];
        let res = resolve(&g, &plans, &no_stationary(), CollisionPriority::NearerProceeds);
        assert!(res
            .iter()
            .all(|r| *r == Resolution::Crash(CrashReason::HeadOnDeadlock)));
    }

    #[test]
    fn swap_off_straight_track_uses_distance() {
        let g = grid(&["/+-"]);
        let plans = [plan(0, (0, 0), (0, 1), 1), plan(1, (0, 1), (0, 0), 5)];
        let res = resolve(&g, &plans, &no_stationary(), CollisionPriority::NearerProceeds);
        // The winner's target is the loser's cell, which stays occupied.
        assert_eq!(
            res,
            vec![
                Resolution::Hold(HoldReason::Blocked),
                Resolution::Hold(HoldReason::Yielded)
            ]
        );

        let tied = [plan(0, (0, 0), (0, 1), 2), plan(1, (0, 1), (0, 0), 2)];
        let res = resolve(&g, &tied, &no_stationary(), CollisionPriority::NearerProceeds);
        assert!(res
            .iter()
            .all(|r| *r == Resolution::Crash(CrashReason::SwapTie)));
    }

    #[test]
    fn blocked_chain_propagates_behind_a_standing_train() {
        let g = grid(&["----"]);
        let stationary: AHashSet<Pos> = [Pos::new(0, 3)].into_iter().collect();
        let plans = [plan(0, (0, 1), (0, 2), 9), plan(1, (0, 2), (0, 3), 9)];
        let res = resolve(&g, &plans, &stationary, CollisionPriority::NearerProceeds);
        let blocked = Resolution::Hold(HoldReason::Blocked);
        assert_eq!(res, vec![blocked, blocked]);
    }

    #[test]
    fn following_train_moves_into_vacated_cell() {
        let g = grid(&["----"]);
        let plans = [plan(0, (0, 0), (0, 1), 9), plan(1, (0, 1), (0, 2), 9)];
        let res = resolve(&g, &plans, &no_stationary(), CollisionPriority::NearerProceeds);
        assert_eq!(res, vec![Resolution::Proceed, Resolution::Proceed]);
    }

    #[test]
    fn resolution_does_not_depend_on_plan_order() {
        let g = grid(&["-+-", ".|.", ".|."]);
        let forward = [
            plan(0, (0, 0), (0, 1), 4),
            plan(1, (1, 1), (0, 1), 2),
            plan(2, (2, 1), (1, 1), 3),
        ];
        let mut backward = forward;
        backward.reverse();
        let a = resolve(&g, &forward, &no_stationary(), CollisionPriority::NearerProceeds);
        let mut b = resolve(&g, &backward, &no_stationary(), CollisionPriority::NearerProceeds);
        b.reverse();
        assert_eq!(a, b);
    }

    #[test]
    fn gating_order_waits_before_signal_and_weather() {
        let g = grid(&["---"]);
        let constants = Constants::default();
        let mut train = Train {
            id: TrainId(0),
            pos: Pos::new(0, 0),
            direction: crate::Direction::Right,
            heading: crate::Direction::Right,
            color: 0,
            wait_ticks: 2,
            move_counter: 0,
            destination: None,
            spawn_index: 0,
        };
        assert_eq!(
            plan_step(&mut train, &g, true, Weather::Rain, &constants),
            Step::Stay(StayReason::Waiting)
        );
        assert_eq!(train.wait_ticks, 1);
        assert_eq!(train.move_counter, 0);

        train.wait_ticks = 0;
        assert_eq!(
            plan_step(&mut train, &g, true, Weather::Normal, &constants),
            Step::Stay(StayReason::RedSignal)
        );
        assert_eq!(train.wait_ticks, 1);
    }

    #[test]
    fn rain_stalls_every_nth_attempt() {
        let g = grid(&["-----"]);
        let constants = Constants {
            rain_slowdown_interval: 3,
            ..Constants::default()
        };
        let mut train = Train {
            id: TrainId(0),
            pos: Pos::new(0, 0),
            direction: crate::Direction::Right,
            heading: crate::Direction::Right,
            color: 0,
            wait_ticks: 0,
            move_counter: 0,
            destination: None,
            spawn_index: 0,
        };
        let steps: Vec<Step> = (0..3)
            .map(|_| plan_step(&mut train, &g, false, Weather::Rain, &constants))
            .collect();
        assert_eq!(steps[0], Step::Move(Pos::new(0, 1)));
        assert_eq!(steps[1], Step::Move(Pos::new(0, 1)));
        assert_eq!(steps[2], Step::Stay(StayReason::Weather));
        assert_eq!(train.move_counter, 0);
    }

    #[test]
    fn stepping_off_the_grid_is_off_track() {
        let g = grid(&["--"]);
        let mut train = Train {
            id: TrainId(0),
            pos: Pos::new(0, 1),
            direction: crate::Direction::Right,
            heading: crate::Direction::Right,
            color: 0,
            wait_ticks: 0,
            move_counter: 0,
            destination: None,
            spawn_index: 0,
        };
        assert_eq!(
            plan_step(&mut train, &g, false, Weather::Fog, &Constants::default()),
            Step::OffTrack
        );
    }
}
