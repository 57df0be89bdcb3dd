#![allow(missing_docs)]

//! Board geometry and per-cell occupancy.

use serde::{Deserialize, Serialize};

use crate::player::PlayerId;

/// Index of a cell on the linear track. Cell `0` is the start.
pub type Cell = usize;

/// Default number of cells along one side of the grid.
pub const DEFAULT_SIDE: usize = 10;

/// Row/column position of a cell, row `0` being the bottom row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub row: usize,
    pub col: usize,
}

/// Square board whose cells are numbered in a snaking order.
///
/// Even rows (counting from the bottom) read left to right, odd rows right
/// to left, so consecutive cells are always adjacent on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    side: usize,
}

impl Board {
    /// Build a board with `side * side` cells.
    ///
    /// # Panics
    ///
    /// Panics if `side` is smaller than 2.
    pub fn new(side: usize) -> Self {
        assert!(side >= 2, "board side must be at least 2, got {side}");
        Self { side }
    }

    pub fn side(&self) -> usize {
        self.side
    }

    /// Total number of cells on the track.
    pub fn cell_count(&self) -> usize {
        self.side * self.side
    }

    /// The winning cell.
    pub fn last_cell(&self) -> Cell {
        self.cell_count() - 1
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell < self.cell_count()
    }

    /// Cells that may host an obstacle endpoint: everything except start and goal.
    pub fn interior_cells(&self) -> std::ops::RangeInclusive<Cell> {
        1..=self.last_cell() - 1
    }

    /// Map a track index to its grid position.
    ///
    /// # Panics
    ///
    /// Panics if `cell` is not on the board.
    pub fn cell_to_grid(&self, cell: Cell) -> GridCoord {
        assert!(
            self.contains(cell),
            "cell {cell} outside board of {} cells",
            self.cell_count()
        );
        let row = cell / self.side;
        let offset = cell % self.side;
        let col = if row % 2 == 0 {
            offset
        } else {
            self.side - 1 - offset
        };
        GridCoord { row, col }
    }

    /// Inverse of [`Board::cell_to_grid`].
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` fall outside the grid.
    pub fn grid_to_cell(&self, row: usize, col: usize) -> Cell {
        assert!(
            row < self.side && col < self.side,
            "grid position ({row}, {col}) outside {side}x{side} board",
            side = self.side
        );
        let offset = if row % 2 == 0 {
            col
        } else {
            self.side - 1 - col
        };
        row * self.side + offset
    }

    /// Where a token starting at `from` ends after moving `steps` forward,
    /// bouncing back off the last cell by any excess.
    pub fn advance(&self, from: Cell, steps: usize) -> Cell {
        let last = self.last_cell();
        let raw = from + steps;
        if raw > last {
            last.saturating_sub(raw - last)
        } else {
            raw
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(DEFAULT_SIDE)
    }
}

/// Tracks which players stand on each cell.
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    cells: Vec<Vec<PlayerId>>,
}

impl Occupancy {
    pub fn new(board: &Board) -> Self {
        Self {
            cells: vec![Vec::new(); board.cell_count()],
        }
    }

    /// Players on `cell`, in arrival order.
    pub fn occupants(&self, cell: Cell) -> &[PlayerId] {
        self.cells.get(cell).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn place(&mut self, player: PlayerId, cell: Cell) {
        if let Some(slot) = self.cells.get_mut(cell) {
            if !slot.contains(&player) {
                slot.push(player);
            }
        }
    }

    pub fn remove(&mut self, player: PlayerId, cell: Cell) {
        if let Some(slot) = self.cells.get_mut(cell) {
            slot.retain(|id| *id != player);
        }
    }

    /// Move `player` from one cell to another.
    pub fn relocate(&mut self, player: PlayerId, from: Cell, to: Cell) {
        self.remove(player, from);
        self.place(player, to);
    }

    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(Vec::clear);
    }
}
