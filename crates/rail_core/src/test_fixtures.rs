//! Shared test fixtures for rail_core and downstream crates.
//!
//! `level()` assembles a `LevelDef` from map rows with default constants.
//! `random_level()` produces seeded, arbitrary (often hostile) levels for
//! property tests.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::grid::Grid;
use crate::{
    CollisionPriority, Constants, Direction, LevelDef, Pos, SimState, SpawnDef, SwitchDef,
    SwitchMode, Train, TrainId, Weather,
};

pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

pub fn grid(rows: &[&str]) -> Grid {
    Grid::from_symbols(rows, Constants::default().safety_wait_ticks).expect("valid test map")
}

pub fn level(map: &[&str], trains: Vec<SpawnDef>, switches: Vec<SwitchDef>) -> LevelDef {
    LevelDef {
        name: "test".to_string(),
        seed: 42,
        weather: Weather::Normal,
        grid: grid(map),
        switches,
        trains,
        constants: Constants::default(),
    }
}

pub fn spawn(tick: u64, row: i32, col: i32, direction: Direction) -> SpawnDef {
    SpawnDef {
        tick,
        row,
        col,
        direction,
        color: 0,
    }
}

pub fn switch_def(letter: char, mode: SwitchMode, k_values: [u32; 4]) -> SwitchDef {
    SwitchDef {
        letter,
        mode,
        initial_state: 0,
        k_values,
    }
}

/// Puts a train directly on `pos` in the first free slot, bypassing spawn
/// instructions.
pub fn place_train(state: &mut SimState, pos: Pos, heading: Direction) -> TrainId {
    let id = state.trains.free_slot().expect("free train slot");
    state.trains.insert(Train {
        id,
        pos,
        direction: heading,
        heading,
        color: 0,
        wait_ticks: 0,
        move_counter: 0,
        destination: None,
        spawn_index: usize::MAX,
    });
    id
}

const RANDOM_SYMBOLS: &[char] = &[
    '-', '-', '-', '|', '|', '|', '/', '\\', '+', '+', '.', '.', 'A', 'B', '=',
];

/// Arbitrary small level: random tiles, one to six spawns (some sharing
/// cells), switches A and B with random K-values, and a random weather,
/// priority, and train capacity.
pub fn random_level(rng: &mut impl Rng) -> LevelDef {
    let rows: usize = rng.gen_range(3..=8);
    let cols: usize = rng.gen_range(3..=10);
    let mut cells: Vec<Vec<char>> = (0..rows)
        .map(|_| {
            (0..cols)
                .map(|_| RANDOM_SYMBOLS[rng.gen_range(0..RANDOM_SYMBOLS.len())])
                .collect()
        })
        .collect();

    for _ in 0..rng.gen_range(1..=3) {
        cells[rng.gen_range(0..rows)][rng.gen_range(0..cols)] = 'D';
    }

    let spawn_count = rng.gen_range(1..=6);
    let mut trains = Vec::with_capacity(spawn_count);
    for _ in 0..spawn_count {
        let row = rng.gen_range(0..rows);
        let col = rng.gen_range(0..cols);
        cells[row][col] = 'S';
        trains.push(SpawnDef {
            tick: rng.gen_range(0..12),
            row: row as i32,
            col: col as i32,
            direction: Direction::ALL[rng.gen_range(0..4)],
            color: rng.gen_range(0..8),
        });
    }

    let map: Vec<String> = cells.into_iter().map(|row| row.into_iter().collect()).collect();
    let grid = Grid::from_symbols(map.as_slice(), 1).expect("random map uses known symbols");

    let switches = ['A', 'B']
        .into_iter()
        .map(|letter| SwitchDef {
            letter,
            mode: if rng.gen_bool(0.5) {
                SwitchMode::Global
            } else {
                SwitchMode::PerDirection
            },
            initial_state: rng.gen_range(0..=1),
            k_values: [
                rng.gen_range(0..4),
                rng.gen_range(0..4),
                rng.gen_range(0..4),
                rng.gen_range(0..4),
            ],
        })
        .collect();

    let weather = match rng.gen_range(0..3) {
        0 => Weather::Normal,
        1 => Weather::Rain,
        _ => Weather::Fog,
    };
    let collision_priority = if rng.gen_bool(0.5) {
        CollisionPriority::NearerProceeds
    } else {
        CollisionPriority::FartherProceeds
    };

    LevelDef {
        name: "random".to_string(),
        seed: rng.gen(),
        weather,
        grid,
        switches,
        trains,
        constants: Constants {
            max_trains: rng.gen_range(2..=6),
            max_ticks: 200,
            rain_slowdown_interval: 5,
            safety_wait_ticks: 1,
            collision_priority,
        },
    }
}
