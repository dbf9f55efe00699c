//! FILENAME: core/engine/src/grid.rs
//! PURPOSE: Sparse cell storage for one sheet.
//! CONTEXT: Cells live in a HashMap keyed by 0-based (row, col). Row moves
//! rebuild the map because every key at or below the insertion point changes.

use crate::cell::Cell;
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct Grid {
    pub cells: HashMap<(u32, u32), Cell>,

    /// Highest row index currently in use.
    pub max_row: u32,

    /// Highest column index currently in use.
    pub max_col: u32,
}

impl Grid {
    pub fn new() -> Self {
        Grid {
            cells: HashMap::new(),
            max_row: 0,
            max_col: 0,
        }
    }

    /// Stores a cell, growing the tracked bounds.
    pub fn set_cell(&mut self, row: u32, col: u32, cell: Cell) {
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
        self.cells.insert((row, col), cell);
    }

    pub fn get_cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn get_cell_mut(&mut self, row: u32, col: u32) -> Option<&mut Cell> {
        self.cells.get_mut(&(row, col))
    }

    /// Removes a cell; bounds are recomputed when it sat on the edge.
    pub fn clear_cell(&mut self, row: u32, col: u32) -> Option<Cell> {
        let removed = self.cells.remove(&(row, col));
        if removed.is_some() && (row == self.max_row || col == self.max_col) {
            self.recalculate_bounds();
        }
        removed
    }

    pub fn recalculate_bounds(&mut self) {
        self.max_row = self.cells.keys().map(|&(r, _)| r).max().unwrap_or(0);
        self.max_col = self.cells.keys().map(|&(_, c)| c).max().unwrap_or(0);
    }

    /// Cells of one row ordered by column.
    pub fn row_cells(&self, row: u32) -> Vec<(u32, &Cell)> {
        let mut cells: Vec<(u32, &Cell)> = self
            .cells
            .iter()
            .filter(|((r, _), _)| *r == row)
            .map(|((_, c), cell)| (*c, cell))
            .collect();
        cells.sort_by_key(|(c, _)| *c);
        cells
    }

    /// Coordinates of every formula cell, in reading order.
    pub fn formula_coords(&self) -> Vec<(u32, u32)> {
        let mut coords: Vec<(u32, u32)> = self
            .cells
            .iter()
            .filter(|(_, cell)| cell.is_formula())
            .map(|(&pos, _)| pos)
            .collect();
        coords.sort();
        coords
    }

    /// Moves every cell at or below `from_row` down by `count` rows.
    pub fn shift_rows_down(&mut self, from_row: u32, count: u32) {
        if count == 0 {
            return;
        }
        let old = std::mem::take(&mut self.cells);
        self.cells = old
            .into_iter()
            .map(|((row, col), cell)| {
                let row = if row >= from_row { row + count } else { row };
                ((row, col), cell)
            })
            .collect();
        self.recalculate_bounds();
    }
}
