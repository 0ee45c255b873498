use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rail_core::{Event, EventLevel, LevelDef, SimPhase, SimState, Weather};
use rail_world::load_level;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "rail_cli", about = "Train dispatch tick simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a level until every train has arrived or crashed, or the tick ceiling.
    Run {
        #[arg(long)]
        level: PathBuf,
        /// Overrides the level's tick ceiling.
        #[arg(long)]
        max_ticks: Option<u64>,
        /// Overrides the level seed. A level seed of 0 is replaced by a random one.
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, value_parser = ["normal", "rain", "fog"])]
        weather: Option<String>,
        #[arg(long, default_value_t = 10)]
        print_every: u64,
        #[arg(long, default_value = "normal", value_parser = ["normal", "debug"])]
        event_level: String,
    },
}

struct RunOptions {
    max_ticks: Option<u64>,
    seed: Option<u64>,
    weather: Option<Weather>,
    print_every: u64,
    event_level: EventLevel,
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

fn apply_overrides(level: &mut LevelDef, options: &RunOptions) {
    if let Some(max_ticks) = options.max_ticks {
        level.constants.max_ticks = max_ticks;
    }
    if let Some(weather) = options.weather {
        level.weather = weather;
    }
    level.seed = match options.seed {
        Some(seed) => seed,
        None if level.seed == 0 => rand::random(),
        None => level.seed,
    };
}

fn run(path: &Path, options: &RunOptions) -> Result<()> {
    let mut level = load_level(path)?;
    apply_overrides(&mut level, options);
    let mut state = rail_core::initial_state(&level);
    let print_every = options.print_every.max(1);

    println!(
        "Starting level '{}': {}x{} trains={} switches={} weather={:?} seed={} max_ticks={}",
        level.name,
        level.grid.rows(),
        level.grid.cols(),
        level.trains.len(),
        level.switches.len(),
        level.weather,
        level.seed,
        level.constants.max_ticks,
    );
    println!("{}", "-".repeat(80));

    while state.meta.phase != SimPhase::Complete {
        let events = rail_core::tick(&mut state, &[], options.event_level);

        // Print notable events regardless of print_every.
        for envelope in &events {
            match &envelope.event {
                Event::TrainArrived { train_id, pos } => {
                    println!("  tick={:04} {train_id} arrived at {pos}", envelope.tick);
                }
                Event::TrainCrashed {
                    train_id,
                    pos,
                    reason,
                } => {
                    println!(
                        "  tick={:04} {train_id} CRASHED at {pos} ({reason:?})",
                        envelope.tick
                    );
                }
                Event::SwitchFlipped {
                    switch_id,
                    state: position,
                } => {
                    println!("  tick={:04} switch {switch_id} -> {position}", envelope.tick);
                }
                other if options.event_level == EventLevel::Debug => {
                    tracing::debug!(id = %envelope.id, tick = envelope.tick, event = ?other);
                }
                _ => {}
            }
        }

        if state.meta.tick % print_every == 0 {
            print_status(&state);
        }
    }

    println!("{}", "-".repeat(80));
    println!("Done. Final state at tick {}:", state.meta.tick);
    print_status(&state);

    let metrics = rail_core::compute_metrics(&state);
    let json = serde_json::to_string_pretty(&metrics).context("serializing final metrics")?;
    println!("{json}");
    Ok(())
}

fn print_status(state: &SimState) {
    let m = rail_core::compute_metrics(state);
    println!(
        "[tick={:04}]  active={:2}  waiting={:2}  arrived={:2}  crashed={:2}  pending={:2}  \
         flips={}  signals(g/y/r)={}/{}/{}",
        m.tick,
        m.trains_active,
        m.trains_waiting,
        m.trains_arrived,
        m.trains_crashed,
        m.spawns_pending,
        m.switch_flips,
        m.switches_green,
        m.switches_yellow,
        m.switches_red,
    );
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            level,
            max_ticks,
            seed,
            weather,
            print_every,
            event_level,
        } => {
            let weather = weather.map(|name| match name.as_str() {
                "rain" => Weather::Rain,
                "fog" => Weather::Fog,
                _ => Weather::Normal,
            });
            let event_level = match event_level.as_str() {
                "debug" => EventLevel::Debug,
                _ => EventLevel::Normal,
            };
            let options = RunOptions {
                max_ticks,
                seed,
                weather,
                print_every,
                event_level,
            };
            run(&level, &options)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rail_core::{Constants, Grid};

    fn level(seed: u64) -> LevelDef {
        LevelDef {
            name: "cli".to_string(),
            seed,
            weather: Weather::Normal,
            grid: Grid::from_symbols(&["S-D"], 1).unwrap(),
            switches: vec![],
            trains: vec![],
            constants: Constants::default(),
        }
    }

    fn options() -> RunOptions {
        RunOptions {
            max_ticks: None,
            seed: None,
            weather: None,
            print_every: 1,
            event_level: EventLevel::Normal,
        }
    }

    #[test]
    fn overrides_replace_level_settings() {
        let mut lvl = level(9);
        let opts = RunOptions {
            max_ticks: Some(12),
            seed: Some(3),
            weather: Some(Weather::Fog),
            ..options()
        };
        apply_overrides(&mut lvl, &opts);
        assert_eq!(lvl.constants.max_ticks, 12);
        assert_eq!(lvl.seed, 3);
        assert_eq!(lvl.weather, Weather::Fog);
    }

    #[test]
    fn nonzero_level_seed_is_kept() {
        let mut lvl = level(9);
        apply_overrides(&mut lvl, &options());
        assert_eq!(lvl.seed, 9);
    }

    #[test]
    fn shipped_level_runs_to_completion() {
        let manifest = std::env::var("CARGO_MANIFEST_DIR").unwrap();
        let path = PathBuf::from(manifest).join("../../levels/junction.json");
        let opts = RunOptions {
            max_ticks: Some(200),
            ..options()
        };
        run(&path, &opts).unwrap();
    }

    #[test]
    fn missing_level_is_an_error() {
        let err = run(Path::new("no/such/level.json"), &options()).unwrap_err();
        assert!(format!("{err:#}").contains("level.json"));
    }

    #[test]
    fn cli_parses_run_flags() {
        let cli = Cli::try_parse_from([
            "rail_cli",
            "run",
            "--level",
            "levels/junction.json",
            "--max-ticks",
            "50",
            "--weather",
            "rain",
            "--event-level",
            "debug",
        ])
        .unwrap();
        let Commands::Run {
            level,
            max_ticks,
            weather,
            event_level,
            print_every,
            ..
        } = cli.command;
        assert_eq!(level, PathBuf::from("levels/junction.json"));
        assert_eq!(max_ticks, Some(50));
        assert_eq!(weather.as_deref(), Some("rain"));
        assert_eq!(event_level, "debug");
        assert_eq!(print_every, 10);
    }
}
