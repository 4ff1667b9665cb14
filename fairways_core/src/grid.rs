use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::strips::ReelSet;
use crate::symbols::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub reel: usize,
    pub row: usize,
}

impl Position {
    pub fn new(reel: usize, row: usize) -> Self {
        Self { reel, row }
    }
}

/// Reel-major symbol grid: `cells[reel][row]`, row 0 on top.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    cells: Vec<Vec<Symbol>>,
}

impl Grid {
    pub fn from_cells(cells: Vec<Vec<Symbol>>) -> Self {
        Self { cells }
    }

    /// Window of `rows` symbols per reel starting at each reel's position, wrapping.
    /// Every position must lie in `0..strip.len()`.
    pub fn from_positions(reels: &ReelSet, positions: &[usize], rows: usize) -> CoreResult<Self> {
        if positions.len() != reels.strips.len() {
            return Err(CoreError::LengthMismatch {
                expected: reels.strips.len(),
                actual: positions.len(),
            });
        }
        for (reel, (strip, &position)) in reels.strips.iter().zip(positions).enumerate() {
            if position >= strip.len() {
                return Err(CoreError::InvalidPosition {
                    reel,
                    position,
                    length: strip.len(),
                });
            }
        }
        let cells = reels
            .strips
            .iter()
            .zip(positions)
            .map(|(strip, &pos)| strip.window(pos, rows))
            .collect::<CoreResult<Vec<_>>>()?;
        Ok(Self { cells })
    }

    pub fn reels(&self) -> usize {
        self.cells.len()
    }

    pub fn rows(&self) -> usize {
        self.cells.first().map_or(0, Vec::len)
    }

    pub fn cell(&self, pos: Position) -> Option<&Symbol> {
        self.cells.get(pos.reel).and_then(|reel| reel.get(pos.row))
    }

    pub fn reel(&self, reel: usize) -> Option<&[Symbol]> {
        self.cells.get(reel).map(Vec::as_slice)
    }

    pub fn cells(&self) -> &[Vec<Symbol>] {
        &self.cells
    }

    pub(crate) fn replace_reel(&mut self, reel: usize, column: Vec<Symbol>) {
        if let Some(slot) = self.cells.get_mut(reel) {
            *slot = column;
        }
    }

    pub fn count_in_rows<F>(&self, rows: std::ops::RangeInclusive<usize>, mut pred: F) -> usize
    where
        F: FnMut(&Symbol) -> bool,
    {
        let mut count = 0;
        for reel in &self.cells {
            for (row, symbol) in reel.iter().enumerate() {
                if rows.contains(&row) && pred(symbol) {
                    count += 1;
                }
            }
        }
        count
    }
}
