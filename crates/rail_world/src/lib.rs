//! Level loading shared by every host.
//!
//! Levels are JSON documents. Everything here runs before the engine sees a
//! level, so authoring mistakes surface as errors instead of odd simulations.

use anyhow::{bail, ensure, Context, Result};
use rail_core::{Constants, Grid, LevelDef, Pos, SpawnDef, SwitchDef, SwitchId, Weather};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Deserialize)]
struct LevelFile {
    name: String,
    #[serde(default)]
    seed: u64,
    #[serde(default)]
    weather: Weather,
    map: Vec<String>,
    #[serde(default)]
    switches: Vec<SwitchDef>,
    #[serde(default)]
    trains: Vec<SpawnDef>,
    #[serde(default)]
    constants: Constants,
}

/// Validates cross-references in a level, returning the first authoring error.
///
/// Switch letters on the map without a definition are tolerated (they route
/// as state 0 and never flip); definitions whose letter never appears on the
/// map are tolerated too.
pub fn validate_level(level: &LevelDef) -> Result<()> {
    let grid = &level.grid;
    ensure!(
        grid.rows() > 0 && grid.cols() > 0,
        "level '{}' has an empty map",
        level.name
    );
    ensure!(
        level.constants.max_trains > 0,
        "level '{}' allows zero trains",
        level.name
    );
    ensure!(
        level.constants.max_ticks > 0,
        "level '{}' has a zero tick ceiling",
        level.name
    );

    let mut letters = HashSet::new();
    for def in &level.switches {
        ensure!(
            SwitchId::from_letter(def.letter).is_some(),
            "switch '{}' is not a letter A-Z",
            def.letter
        );
        ensure!(
            letters.insert(def.letter),
            "switch '{}' is defined more than once",
            def.letter
        );
        ensure!(
            def.initial_state <= 1,
            "switch '{}' initial state {} is not 0 or 1",
            def.letter,
            def.initial_state
        );
    }

    for (index, spawn) in level.trains.iter().enumerate() {
        let pos = Pos::new(spawn.row, spawn.col);
        ensure!(
            grid.in_bounds(pos),
            "train {index} spawns at {pos}, outside the {}x{} map",
            grid.rows(),
            grid.cols()
        );
        ensure!(
            grid.is_traversable(pos),
            "train {index} spawns at {pos}, which is not track"
        );
    }

    Ok(())
}

/// Parses and validates a level document.
pub fn level_from_json(json: &str) -> Result<LevelDef> {
    let file: LevelFile = serde_json::from_str(json).context("parsing level JSON")?;

    if let Some(first) = file.map.first() {
        let width = first.chars().count();
        for (row, line) in file.map.iter().enumerate() {
            if line.chars().count() != width {
                bail!(
                    "level '{}' map row {row} is {} wide, expected {width}",
                    file.name,
                    line.chars().count()
                );
            }
        }
    }
    let grid = Grid::from_symbols(file.map.as_slice(), file.constants.safety_wait_ticks)
        .with_context(|| format!("building map for level '{}'", file.name))?;

    let level = LevelDef {
        name: file.name,
        seed: file.seed,
        weather: file.weather,
        grid,
        switches: file.switches,
        trains: file.trains,
        constants: file.constants,
    };
    validate_level(&level)?;
    Ok(level)
}

pub fn load_level(path: &Path) -> Result<LevelDef> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let level = level_from_json(&json).with_context(|| format!("loading {}", path.display()))?;
    tracing::info!(
        level = %level.name,
        rows = level.grid.rows(),
        cols = level.grid.cols(),
        trains = level.trains.len(),
        switches = level.switches.len(),
        "level loaded"
    );
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rail_core::{CollisionPriority, Direction, SwitchMode, TileKind};
    use std::io::Write;

    const MINIMAL: &str = r#"{
        "name": "minimal",
        "map": ["S-A-D"],
        "switches": [{ "letter": "A", "k_values": [1, 0, 0, 0] }],
        "trains": [{ "tick": 0, "row": 0, "col": 0, "direction": "Right" }]
    }"#;

    #[test]
    fn test_minimal_level_uses_defaults() {
        let level = level_from_json(MINIMAL).unwrap();
        assert_eq!(level.name, "minimal");
        assert_eq!(level.seed, 0);
        assert_eq!(level.weather, Weather::Normal);
        assert_eq!(level.constants, Constants::default());
        assert_eq!(level.switches[0].mode, SwitchMode::PerDirection);
        assert_eq!(level.switches[0].initial_state, 0);
        assert_eq!(level.trains[0].direction, Direction::Right);
        assert_eq!(level.grid.classify(Pos::new(0, 2)), TileKind::Switch(SwitchId(0)));
    }

    #[test]
    fn test_constants_override() {
        let json = r#"{
            "name": "tuned",
            "weather": "Rain",
            "map": ["S=D"],
            "constants": { "max_ticks": 50, "safety_wait_ticks": 2, "collision_priority": "NearerProceeds" }
        }"#;
        let level = level_from_json(json).unwrap();
        assert_eq!(level.weather, Weather::Rain);
        assert_eq!(level.constants.max_ticks, 50);
        assert_eq!(level.constants.max_trains, 20);
        assert_eq!(
            level.constants.collision_priority,
            CollisionPriority::NearerProceeds
        );
        assert_eq!(level.grid.safety_wait(Pos::new(0, 1)), 2);
    }

    #[test]
    fn test_duplicate_switch_rejected() {
        let json = r#"{
            "name": "dup",
            "map": ["-A-"],
            "switches": [
                { "letter": "A", "k_values": [1, 0, 0, 0] },
                { "letter": "A", "k_values": [2, 0, 0, 0] }
            ]
        }"#;
        let err = level_from_json(json).unwrap_err();
        assert!(format!("{err:#}").contains("defined more than once"));
    }

    #[test]
    fn test_spawn_off_track_rejected() {
        let json = r#"{
            "name": "bad_spawn",
            "map": ["S.D"],
            "trains": [{ "tick": 0, "row": 0, "col": 1, "direction": "Right" }]
        }"#;
        let err = level_from_json(json).unwrap_err();
        assert!(format!("{err:#}").contains("not track"));

        let json = r#"{
            "name": "outside",
            "map": ["S-D"],
            "trains": [{ "tick": 0, "row": 3, "col": 0, "direction": "Up" }]
        }"#;
        let err = level_from_json(json).unwrap_err();
        assert!(format!("{err:#}").contains("outside"));
    }

    #[test]
    fn test_ragged_and_unknown_maps_rejected() {
        let ragged = r#"{ "name": "ragged", "map": ["S--D", "--"] }"#;
        assert!(format!("{:#}", level_from_json(ragged).unwrap_err()).contains("map row 1"));

        let unknown = r#"{ "name": "unknown", "map": ["S-?D"] }"#;
        assert!(format!("{:#}", level_from_json(unknown).unwrap_err())
            .contains("unknown tile symbol"));

        let empty = r#"{ "name": "empty", "map": [] }"#;
        assert!(level_from_json(empty).is_err());
    }

    #[test]
    fn test_bad_initial_state_rejected() {
        let json = r#"{
            "name": "state",
            "map": ["-A-"],
            "switches": [{ "letter": "A", "initial_state": 2, "k_values": [1, 0, 0, 0] }]
        }"#;
        assert!(level_from_json(json).is_err());
    }

    #[test]
    fn test_load_level_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let level = load_level(file.path()).unwrap();
        assert_eq!(level.trains.len(), 1);
    }

    #[test]
    fn test_load_level_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = load_level(&path).unwrap_err();
        assert!(format!("{err:#}").contains("missing.json"));
    }
}
