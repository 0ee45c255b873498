//! Static tile lookup plus the safety-overlay toggle.

use serde::{Deserialize, Serialize};

use crate::{Pos, SwitchId, TileKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    Empty,
    UnknownSymbol { row: usize, col: usize, symbol: char },
}

impl std::fmt::Display for GridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GridError::Empty => f.write_str("map has no cells"),
            GridError::UnknownSymbol { row, col, symbol } => {
                write!(f, "unknown tile symbol {symbol:?} at row {row}, col {col}")
            }
        }
    }
}

impl std::error::Error for GridError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    cols: usize,
    tiles: Vec<TileKind>,
    /// Kind beneath a safety overlay. Only meaningful where `tiles` holds `Safety`.
    underlay: Vec<TileKind>,
    /// Wait imposed on entry. Non-zero only on safety cells.
    safety_wait: Vec<u32>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        let len = rows * cols;
        Self {
            rows,
            cols,
            tiles: vec![TileKind::Empty; len],
            underlay: vec![TileKind::Empty; len],
            safety_wait: vec![0; len],
        }
    }

    /// Builds a grid from map rows. Short rows are padded with `Empty`.
    /// Safety symbols in the map sit over `Empty` and impose `safety_wait` ticks.
    pub fn from_symbols<S: AsRef<str>>(rows: &[S], safety_wait: u32) -> Result<Self, GridError> {
        let cols = rows
            .iter()
            .map(|row| row.as_ref().chars().count())
            .max()
            .unwrap_or(0);
        if rows.is_empty() || cols == 0 {
            return Err(GridError::Empty);
        }
        let mut grid = Grid::new(rows.len(), cols);
        for (r, line) in rows.iter().enumerate() {
            for (c, symbol) in line.as_ref().chars().enumerate() {
                let kind = TileKind::from_symbol(symbol).ok_or(GridError::UnknownSymbol {
                    row: r,
                    col: c,
                    symbol,
                })?;
                let idx = r * cols + c;
                grid.tiles[idx] = kind;
                if kind == TileKind::Safety {
                    grid.safety_wait[idx] = safety_wait;
                }
            }
        }
        Ok(grid)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn in_bounds(&self, pos: Pos) -> bool {
        pos.row >= 0 && pos.col >= 0 && (pos.row as usize) < self.rows && (pos.col as usize) < self.cols
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| pos.row as usize * self.cols + pos.col as usize)
    }

    /// Tile kind at `pos`; off-grid cells read as `Empty`.
    pub fn classify(&self, pos: Pos) -> TileKind {
        self.index(pos).map_or(TileKind::Empty, |idx| self.tiles[idx])
    }

    /// Kind used for routing: the pre-overlay kind on safety cells.
    pub fn routing_kind(&self, pos: Pos) -> TileKind {
        match self.index(pos) {
            Some(idx) if self.tiles[idx] == TileKind::Safety => self.underlay[idx],
            Some(idx) => self.tiles[idx],
            None => TileKind::Empty,
        }
    }

    pub fn is_traversable(&self, pos: Pos) -> bool {
        self.classify(pos).is_traversable()
    }

    pub fn switch_id(&self, pos: Pos) -> Option<SwitchId> {
        match self.classify(pos) {
            TileKind::Switch(id) => Some(id),
            _ => None,
        }
    }

    pub fn safety_wait(&self, pos: Pos) -> u32 {
        self.index(pos).map_or(0, |idx| self.safety_wait[idx])
    }

    /// Swaps a cell between `Safety` and its prior kind.
    ///
    /// Returns `false` when the cell is off-grid or its kind cannot host an overlay.
    pub fn toggle_safety(&mut self, pos: Pos, wait_ticks: u32) -> bool {
        let Some(idx) = self.index(pos) else {
            return false;
        };
        match self.tiles[idx] {
            TileKind::Safety => {
                self.tiles[idx] = self.underlay[idx];
                self.underlay[idx] = TileKind::Empty;
                self.safety_wait[idx] = 0;
                true
            }
            kind if kind.can_host_safety() => {
                self.underlay[idx] = kind;
                self.tiles[idx] = TileKind::Safety;
                self.safety_wait[idx] = wait_ticks;
                true
            }
            _ => false,
        }
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = (Pos, TileKind)> + '_ {
        let cols = self.cols;
        self.tiles
            .iter()
            .enumerate()
            .map(move |(idx, kind)| (Pos::new((idx / cols) as i32, (idx % cols) as i32), *kind))
    }

    /// Destination cells in row-major order.
    pub fn destination_cells(&self) -> Vec<Pos> {
        self.cells()
            .filter(|(_, kind)| *kind == TileKind::Destination)
            .map(|(pos, _)| pos)
            .collect()
    }
}
