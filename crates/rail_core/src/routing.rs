//! Per-train direction decisions from the tile the train stands on.

use smallvec::SmallVec;

use crate::grid::Grid;
use crate::tables::SwitchTable;
use crate::{Direction, Pos, SimState, Switch, TileKind, Train};

/// Direction the train will leave its current cell in.
///
/// Decisions are a function of the heading the train entered with, so
/// re-routing a train that did not move is idempotent.
pub fn next_direction(grid: &Grid, switches: &SwitchTable, train: &Train) -> Direction {
    let heading = train.heading;
    match grid.routing_kind(train.pos) {
        TileKind::HorizontalTrack => {
            if heading == Direction::Left {
                Direction::Left
            } else {
                Direction::Right
            }
        }
        TileKind::VerticalTrack => {
            if heading == Direction::Up {
                Direction::Up
            } else {
                Direction::Down
            }
        }
        TileKind::RightCurve => right_curve(heading),
        TileKind::LeftCurve => left_curve(heading),
        TileKind::Crossing => smart_direction(grid, train.pos, heading, train.destination),
        TileKind::Switch(id) => switch_direction(grid, switches.get(id), train.pos, heading),
        TileKind::Empty
        | TileKind::Spawn
        | TileKind::Destination
        | TileKind::Safety => heading,
    }
}

/// `/`: up and right swap, left and down swap.
fn right_curve(heading: Direction) -> Direction {
    match heading {
        Direction::Up => Direction::Right,
        Direction::Right => Direction::Up,
        Direction::Left => Direction::Down,
        Direction::Down => Direction::Left,
    }
}

/// `\`: up and left swap, right and down swap.
fn left_curve(heading: Direction) -> Direction {
    match heading {
        Direction::Up => Direction::Left,
        Direction::Left => Direction::Up,
        Direction::Right => Direction::Down,
        Direction::Down => Direction::Right,
    }
}

/// Picks the traversable neighbour closest (Manhattan) to `destination`,
/// preferring `heading` on ties. Holds `heading` without a destination.
pub fn smart_direction(
    grid: &Grid,
    pos: Pos,
    heading: Direction,
    destination: Option<Pos>,
) -> Direction {
    let Some(destination) = destination else {
        return heading;
    };
    let candidates: SmallVec<[(Direction, u32); 4]> = Direction::ALL
        .into_iter()
        .filter_map(|direction| {
            let next = pos.step(direction);
            grid.is_traversable(next)
                .then(|| (direction, next.manhattan(destination)))
        })
        .collect();
    candidates
        .into_iter()
        .min_by_key(|&(direction, distance)| (distance, direction != heading))
        .map_or(heading, |(direction, _)| direction)
}

/// Candidate order `[straight, primary, secondary, reverse]`; state 0 prefers
/// the right-hand branch, state 1 the left-hand one.
pub fn switch_direction(
    grid: &Grid,
    switch: Option<&Switch>,
    pos: Pos,
    heading: Direction,
) -> Direction {
    let state = switch.map_or(0, |s| s.state);
    let (primary, secondary) = if state == 0 {
        (heading.turn_right(), heading.turn_left())
    } else {
        (heading.turn_left(), heading.turn_right())
    };
    [heading, primary, secondary, heading.reverse()]
        .into_iter()
        .find(|&direction| grid.is_traversable(pos.step(direction)))
        .unwrap_or(heading)
}

/// Routing phase: refreshes every active train's outgoing direction.
pub(crate) fn route_trains(state: &mut SimState) {
    let decisions: Vec<(crate::TrainId, Direction)> = state
        .trains
        .active()
        .filter(|train| Some(train.pos) != train.destination)
        .map(|train| (train.id, next_direction(&state.grid, &state.switches, train)))
        .collect();
    for (id, direction) in decisions {
        if let Some(train) = state.trains.get_mut(id) {
            train.direction = direction;
        }
    }
}
