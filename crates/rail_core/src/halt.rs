//! Emergency halt countdowns, orthogonal to switches and signals.

use serde::{Deserialize, Serialize};

use std::ops::RangeInclusive;

use crate::tables::TrainTable;
use crate::Pos;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaltField {
    rows: usize,
    cols: usize,
    countdown: Vec<u32>,
}

impl HaltField {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            countdown: vec![0; rows * cols],
        }
    }

    fn index(&self, pos: Pos) -> Option<usize> {
        let in_bounds = pos.row >= 0
            && pos.col >= 0
            && (pos.row as usize) < self.rows
            && (pos.col as usize) < self.cols;
        in_bounds.then(|| pos.row as usize * self.cols + pos.col as usize)
    }

    pub fn remaining(&self, pos: Pos) -> u32 {
        self.index(pos).map_or(0, |idx| self.countdown[idx])
    }

    /// Raises every in-bounds cell within Chebyshev `radius` of `center` to at
    /// least `ticks`. Returns `false` if no cell was touched.
    pub fn trigger(&mut self, center: Pos, radius: u32, ticks: u32) -> bool {
        let Some((rows, cols)) = self.clip(center, radius) else {
            return false;
        };
        for row in rows {
            for col in cols.clone() {
                let idx = row * self.cols + col;
                self.countdown[idx] = self.countdown[idx].max(ticks);
            }
        }
        true
    }

    /// In-grid row and column ranges of the zone, or `None` if it misses the grid.
    fn clip(
        &self,
        center: Pos,
        radius: u32,
    ) -> Option<(RangeInclusive<usize>, RangeInclusive<usize>)> {
        let axis = |at: i32, len: usize| {
            let (at, len, r) = (i64::from(at), len as i64, i64::from(radius));
            let lo = at.saturating_sub(r).max(0);
            let hi = at.saturating_add(r).min(len - 1);
            (lo <= hi).then(|| lo as usize..=hi as usize)
        };
        Some((axis(center.row, self.rows)?, axis(center.col, self.cols)?))
    }

    /// Raises the wait of every train on a halted cell. Never lowers a wait.
    pub fn apply(&self, trains: &mut TrainTable) {
        for train in trains.active_mut() {
            let remaining = self.remaining(train.pos);
            if remaining > train.wait_ticks {
                train.wait_ticks = remaining;
            }
        }
    }

    pub fn decrement(&mut self) {
        for ticks in self.countdown.iter_mut().filter(|ticks| **ticks > 0) {
            *ticks -= 1;
        }
    }
}
