//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Workbook document model and sheet-local structural primitives.
//! CONTEXT: Re-exports the cell, grid, style and workbook types plus the
//! row insertion / duplication and block copy operations driven by the
//! layout engine.

pub mod cell;
pub mod coord;
pub mod grid;
pub mod structure;
pub mod style;
pub mod workbook;

pub use cell::{Cell, CellError, CellValue};
pub use coord::{col_to_index, column_span, coord_to_a1, index_to_col, parse_a1, CellCoord};
pub use grid::Grid;
pub use structure::{shift_formula_for_copy, shift_formula_for_fill, shift_formula_for_insert, StructureError, MAX_ROWS};
pub use style::{CellStyle, Color, StyleRegistry, TextAlign};
pub use workbook::{MergedRegion, Sheet, Workbook};
