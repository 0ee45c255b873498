//! Type definitions for `rail_core`.
//!
//! All public types, structs, enums, and ID newtypes used by the simulation.

use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use crate::halt::HaltField;
use crate::tables::{SwitchTable, TrainTable};

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

/// Handle into the train table. Slot indices are never reused mid-simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrainId(pub usize);

impl std::fmt::Display for TrainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "train_{:02}", self.0)
    }
}

/// Switch slot 0–25, one per letter A–Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SwitchId(pub u8);

impl SwitchId {
    pub const COUNT: usize = 26;

    pub fn from_letter(letter: char) -> Option<Self> {
        letter
            .is_ascii_uppercase()
            .then(|| SwitchId(letter as u8 - b'A'))
    }

    pub fn letter(self) -> char {
        char::from(b'A' + self.0)
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl std::fmt::Display for SwitchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub String);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Grid cell coordinate. Signed so a step off the edge is still representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Pos {
    pub row: i32,
    pub col: i32,
}

impl Pos {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dr, dc) = direction.delta();
        Self::new(self.row + dr, self.col + dc)
    }

    pub fn manhattan(self, other: Pos) -> u32 {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl std::fmt::Display for Pos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Travel direction. The discriminant doubles as the per-direction counter index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Down,
        Direction::Left,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// `(row_delta, col_delta)` of one step.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Right => (0, 1),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
        }
    }

    pub fn turn_right(self) -> Self {
        Self::ALL[(self.index() + 1) % 4]
    }

    pub fn turn_left(self) -> Self {
        Self::ALL[(self.index() + 3) % 4]
    }

    pub fn reverse(self) -> Self {
        Self::ALL[(self.index() + 2) % 4]
    }
}

// ---------------------------------------------------------------------------
// Tiles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Empty,
    HorizontalTrack,
    VerticalTrack,
    RightCurve,
    LeftCurve,
    Crossing,
    Spawn,
    Destination,
    Safety,
    Switch(SwitchId),
}

impl TileKind {
    /// Decodes a legacy map symbol (`.`, `-`, `|`, `/`, `\`, `+`, `S`, `D`, `=`, `A`–`Z`).
    pub fn from_symbol(symbol: char) -> Option<Self> {
        let kind = match symbol {
            '.' | ' ' => TileKind::Empty,
            '-' => TileKind::HorizontalTrack,
            '|' => TileKind::VerticalTrack,
            '/' => TileKind::RightCurve,
            '\\' => TileKind::LeftCurve,
            '+' => TileKind::Crossing,
            'S' => TileKind::Spawn,
            'D' => TileKind::Destination,
            '=' => TileKind::Safety,
            other => TileKind::Switch(SwitchId::from_letter(other)?),
        };
        Some(kind)
    }

    /// Whether a train may stand on this tile.
    pub fn is_traversable(self) -> bool {
        !matches!(self, TileKind::Empty)
    }

    pub fn is_straight(self) -> bool {
        matches!(self, TileKind::HorizontalTrack | TileKind::VerticalTrack)
    }

    /// Kinds a safety overlay may be placed over.
    pub fn can_host_safety(self) -> bool {
        matches!(
            self,
            TileKind::Empty | TileKind::HorizontalTrack | TileKind::VerticalTrack
        )
    }
}

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Normal,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Weather {
    #[default]
    Normal,
    Rain,
    /// Reported only; no movement penalty.
    Fog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SwitchMode {
    #[default]
    PerDirection,
    Global,
}

/// Occupancy indicator. Ordered so that `max` yields the most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum Signal {
    #[default]
    Green,
    Yellow,
    Red,
}

/// Which train yields when two trains contend by distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollisionPriority {
    /// The train farther from its destination proceeds; the nearer one is held.
    #[default]
    FartherProceeds,
    /// The train nearer its destination proceeds; the farther one is held.
    NearerProceeds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimPhase {
    #[default]
    Idle,
    Running,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CrashReason {
    /// Next cell was off the grid or not track.
    OffTrack,
    /// Two trains targeted one cell, equally far from their destinations.
    SameTargetTie,
    /// Head-on swap on straight or safety track.
    HeadOnDeadlock,
    /// Head-on swap elsewhere with equal remaining distance.
    SwapTie,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpawnBlockReason {
    NoFreeSlot,
    CellOccupied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HoldReason {
    /// Lost a distance contest against another train.
    Yielded,
    /// Target cell stays occupied this tick.
    Blocked,
}

// ---------------------------------------------------------------------------
// Entity types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Train {
    pub id: TrainId,
    pub pos: Pos,
    /// Direction of the next move, decided by routing.
    pub direction: Direction,
    /// Direction the train was travelling when it entered `pos`.
    pub heading: Direction,
    pub color: u8,
    pub wait_ticks: u32,
    /// Planned-move attempts since the last weather stall.
    pub move_counter: u32,
    pub destination: Option<Pos>,
    pub spawn_index: usize,
}

impl Train {
    pub fn is_waiting(&self) -> bool {
        self.wait_ticks > 0
    }

    /// Manhattan distance from `from` to the destination; trains without a
    /// destination rank as farthest.
    pub fn distance_from(&self, from: Pos) -> u32 {
        self.destination.map_or(u32::MAX, |dest| from.manhattan(dest))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainOutcome {
    Arrived,
    Crashed(CrashReason),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainSlot {
    Free,
    Active(Train),
    /// Terminal. The slot stays consumed until the state is rebuilt.
    Retired { outcome: TrainOutcome, tick: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Switch {
    pub id: SwitchId,
    pub mode: SwitchMode,
    /// Binary diverge state; orders the two diverging branches.
    pub state: u8,
    pub counters: [u32; 4],
    /// K-values. Zero disables the counter at that index.
    pub thresholds: [u32; 4],
    pub pending_flip: bool,
    pub signal: Signal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnInstruction {
    pub tick: u64,
    pub pos: Pos,
    pub direction: Direction,
    pub color: u8,
    /// Set once the instruction has been consumed.
    pub train: Option<TrainId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationAssignment {
    pub pos: Pos,
    pub spawn_index: usize,
    /// Remapped from `spawn_index` at spawn time.
    pub train: Option<TrainId>,
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimState {
    pub meta: MetaState,
    pub grid: Grid,
    pub trains: TrainTable,
    pub switches: SwitchTable,
    pub spawns: Vec<SpawnInstruction>,
    pub destinations: Vec<DestinationAssignment>,
    pub halts: HaltField,
    pub constants: Constants,
    pub counters: Counters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaState {
    pub tick: u64,
    pub seed: u64,
    pub phase: SimPhase,
    pub weather: Weather,
    pub level_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub next_event_id: u64,
    pub trains_arrived: u32,
    pub trains_crashed: u32,
    pub total_wait_ticks: u64,
    /// One unit per committed cell move.
    pub total_energy: u64,
    /// Automatic flips only; manual toggles are not counted.
    pub switch_flips: u32,
}

// ---------------------------------------------------------------------------
// Command types
// ---------------------------------------------------------------------------

/// Host-side mutations. Only valid between ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    ToggleSafetyTile { pos: Pos },
    ToggleSwitch { letter: char },
    EmergencyHalt { center: Pos, radius: u32, ticks: u32 },
}

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub tick: u64,
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    TrainSpawned {
        train_id: TrainId,
        spawn_index: usize,
        pos: Pos,
        direction: Direction,
    },
    /// Only emitted at `EventLevel::Debug`.
    SpawnBlocked {
        spawn_index: usize,
        reason: SpawnBlockReason,
    },
    TrainArrived {
        train_id: TrainId,
        pos: Pos,
    },
    TrainCrashed {
        train_id: TrainId,
        pos: Pos,
        reason: CrashReason,
    },
    /// Only emitted at `EventLevel::Debug`.
    TrainHeld {
        train_id: TrainId,
        pos: Pos,
        reason: HoldReason,
    },
    SwitchFlipped {
        switch_id: SwitchId,
        state: u8,
    },
    /// Only emitted at `EventLevel::Debug`.
    SignalChanged {
        switch_id: SwitchId,
        signal: Signal,
    },
    SimulationComplete {
        trains_arrived: u32,
        trains_crashed: u32,
    },
}

// ---------------------------------------------------------------------------
// Level types
// ---------------------------------------------------------------------------

/// A fully populated, already-validated level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelDef {
    pub name: String,
    pub seed: u64,
    pub weather: Weather,
    pub grid: Grid,
    pub switches: Vec<SwitchDef>,
    pub trains: Vec<SpawnDef>,
    pub constants: Constants,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchDef {
    pub letter: char,
    #[serde(default)]
    pub mode: SwitchMode,
    #[serde(default)]
    pub initial_state: u8,
    pub k_values: [u32; 4],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnDef {
    pub tick: u64,
    pub row: i32,
    pub col: i32,
    pub direction: Direction,
    #[serde(default)]
    pub color: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constants {
    pub max_trains: usize,
    /// Hard ceiling; the run completes once the tick counter reaches it.
    pub max_ticks: u64,
    /// Every Nth planned move under rain becomes a forced wait.
    pub rain_slowdown_interval: u32,
    pub safety_wait_ticks: u32,
    pub collision_priority: CollisionPriority,
}

impl Default for Constants {
    fn default() -> Self {
        Self {
            max_trains: 20,
            max_ticks: 5000,
            rain_slowdown_interval: 5,
            safety_wait_ticks: 1,
            collision_priority: CollisionPriority::FartherProceeds,
        }
    }
}
