//! FILENAME: core/engine/src/workbook.rs
//! PURPOSE: In-memory workbook document: named sheets with cells, styles,
//! merged regions and row/column dimensions.
//! CONTEXT: This is the mutable handle the layout pipeline borrows for one
//! batch. All coordinates are 0-based; formulas keep 1-based A1 text.

use crate::cell::{Cell, CellValue};
use crate::coord::coord_to_a1;
use crate::grid::Grid;
use crate::style::StyleRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A merged block of cells, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergedRegion {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl MergedRegion {
    pub fn new(start_row: u32, start_col: u32, end_row: u32, end_col: u32) -> Self {
        MergedRegion {
            start_row,
            start_col,
            end_row,
            end_col,
        }
    }

    pub fn a1(&self) -> String {
        format!(
            "{}:{}",
            coord_to_a1((self.start_row, self.start_col)),
            coord_to_a1((self.end_row, self.end_col))
        )
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub grid: Grid,
    pub styles: StyleRegistry,
    pub merged_regions: Vec<MergedRegion>,
    /// Row heights in points, keyed by 0-based row.
    pub row_heights: HashMap<u32, f64>,
    /// Column widths in character units, keyed by 0-based column.
    pub column_widths: HashMap<u32, f64>,
    /// Logical row count; grows with structural inserts even when the new
    /// rows hold no cells.
    pub(crate) rows: u32,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Sheet {
            name: name.into(),
            grid: Grid::new(),
            styles: StyleRegistry::new(),
            merged_regions: Vec::new(),
            row_heights: HashMap::new(),
            column_widths: HashMap::new(),
            rows: 0,
        }
    }

    /// Number of rows the sheet spans, counting structurally inserted rows.
    pub fn row_count(&self) -> u32 {
        let used = if self.grid.cells.is_empty() {
            0
        } else {
            self.grid.max_row + 1
        };
        let merged = self
            .merged_regions
            .iter()
            .map(|m| m.end_row + 1)
            .max()
            .unwrap_or(0);
        self.rows.max(used).max(merged)
    }

    pub fn get_cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.grid.get_cell(row, col)
    }

    pub fn set_cell(&mut self, row: u32, col: u32, cell: Cell) {
        self.grid.set_cell(row, col, cell);
    }

    /// Writes a literal value, dropping any formula but keeping the style.
    pub fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        let style_index = self.style_at(row, col);
        self.grid.set_cell(
            row,
            col,
            Cell {
                formula: None,
                value,
                style_index,
            },
        );
    }

    /// Writes a formula (leading '=' optional), keeping the style. The cached
    /// value is cleared because it no longer matches the formula.
    pub fn set_formula(&mut self, row: u32, col: u32, formula: &str) {
        let style_index = self.style_at(row, col);
        let mut cell = Cell::new_formula(formula);
        cell.style_index = style_index;
        self.grid.set_cell(row, col, cell);
    }

    pub fn clear_cell(&mut self, row: u32, col: u32) -> Option<Cell> {
        self.grid.clear_cell(row, col)
    }

    pub fn formula(&self, row: u32, col: u32) -> Option<&str> {
        self.grid.get_cell(row, col).and_then(|c| c.formula.as_deref())
    }

    pub fn value(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.grid.get_cell(row, col).map(|c| &c.value)
    }

    /// True when the name refers to this sheet (Excel compares case-insensitively).
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || self.name.to_lowercase() == name.to_lowercase()
    }

    fn style_at(&self, row: u32, col: u32) -> usize {
        self.grid
            .get_cell(row, col)
            .map(|c| c.style_index)
            .unwrap_or(0)
    }
}

/// An ordered collection of sheets.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Workbook { sheets: Vec::new() }
    }

    pub fn add_sheet(&mut self, sheet: Sheet) -> &mut Sheet {
        self.sheets.push(sheet);
        let last = self.sheets.len() - 1;
        &mut self.sheets[last]
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.is_named(name))
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.is_named(name))
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }
}
