//! FILENAME: core/engine/src/structure.rs
//! PURPOSE: Sheet-local structural edits: inserting rows, duplicating rows
//! and copying rectangular blocks.
//! CONTEXT: These are the primitives the section insertion engine drives.
//! They follow Excel's behaviour for a single sheet:
//! - inserting rows shifts every same-sheet reference at or below the
//!   insertion point, absolute or relative, and grows spanning merges;
//! - a duplicated row's formulas get fill semantics (relative rows move by
//!   the copy distance, `$`-anchored rows stay);
//! - a copied block moves relative rows and columns alike.
//! References held by OTHER sheets are not touched here.

use crate::cell::Cell;
use crate::coord::{col_to_index, index_to_col, CellCoord, MAX_COL};
use crate::workbook::{MergedRegion, Sheet};
use parser::{parse, to_formula, visit_col_refs_mut, visit_row_refs_mut};
use std::collections::HashMap;
use thiserror::Error;

/// Row limit of an xlsx worksheet.
pub const MAX_ROWS: u32 = 1_048_576;

#[derive(Debug, Error, PartialEq)]
pub enum StructureError {
    #[error("row {row} is outside sheet '{sheet}' ({rows} rows)")]
    RowOutOfRange { sheet: String, row: u32, rows: u32 },

    #[error("cannot duplicate an empty block of rows")]
    EmptyBlock,

    #[error("inserting {count} rows at row {at} exceeds the worksheet row limit")]
    TooManyRows { at: u32, count: u32 },
}

// ============================================================================
// FORMULA REFERENCE SHIFTING
// ============================================================================

/// Rewrites a formula for rows inserted at 0-based `at` on `sheet_name`.
/// References into other sheets are left alone. Returns `None` when nothing
/// changed or the formula cannot be parsed.
pub fn shift_formula_for_insert(
    formula: &str,
    home_sheet: &str,
    sheet_name: &str,
    at: u32,
    count: u32,
) -> Option<String> {
    let mut expr = parse(formula).ok()?;
    let mut changed = false;
    visit_row_refs_mut(&mut expr, &mut |site, row| {
        // `row` is 1-based; 0-based `at` is 1-based `at + 1`.
        if site.targets(home_sheet, sheet_name) && *row > at {
            *row += count;
            changed = true;
        }
    });
    changed.then(|| to_formula(&expr))
}

/// Rewrites a formula copied `row_delta` rows away: relative rows move,
/// absolute rows stay. Returns `None` if a relative row would leave the
/// sheet or the formula cannot be parsed.
pub fn shift_formula_for_fill(formula: &str, row_delta: i64) -> Option<String> {
    if row_delta == 0 {
        return Some(formula.to_string());
    }
    let mut expr = parse(formula).ok()?;
    let mut valid = true;
    visit_row_refs_mut(&mut expr, &mut |site, row| {
        if site.absolute {
            return;
        }
        let moved = *row as i64 + row_delta;
        if moved < 1 || moved > MAX_ROWS as i64 {
            valid = false;
        } else {
            *row = moved as u32;
        }
    });
    valid.then(|| to_formula(&expr))
}

/// Fill semantics in two directions: relative rows move by `row_delta`,
/// relative columns by `col_delta`. `None` if a reference would leave the
/// sheet or the formula cannot be parsed.
pub fn shift_formula_for_copy(formula: &str, row_delta: i64, col_delta: i64) -> Option<String> {
    let shifted = shift_formula_for_fill(formula, row_delta)?;
    if col_delta == 0 {
        return Some(shifted);
    }
    let mut expr = parse(&shifted).ok()?;
    let mut valid = true;
    visit_col_refs_mut(&mut expr, &mut |absolute, col| {
        if absolute {
            return;
        }
        match col_to_index(col).map(|c| c as i64 + col_delta) {
            Some(moved) if (0..=MAX_COL as i64).contains(&moved) => *col = index_to_col(moved as u32),
            _ => valid = false,
        }
    });
    valid.then(|| to_formula(&expr))
}

// ============================================================================
// ROW OPERATIONS
// ============================================================================

impl Sheet {
    /// Inserts `count` empty rows before 0-based row `at`.
    pub fn insert_rows(&mut self, at: u32, count: u32) -> Result<(), StructureError> {
        if count == 0 {
            return Ok(());
        }
        let rows_before = self.row_count();
        if rows_before.max(at) as u64 + count as u64 > MAX_ROWS as u64 {
            return Err(StructureError::TooManyRows { at, count });
        }

        // Formulas first, while their text still names the old rows.
        let name = self.name.clone();
        let mut unparsed = 0usize;
        for (row, col) in self.grid.formula_coords() {
            let Some(cell) = self.grid.get_cell_mut(row, col) else {
                continue;
            };
            let Some(formula) = cell.formula.as_deref() else {
                continue;
            };
            if parse(formula).is_err() {
                unparsed += 1;
                continue;
            }
            if let Some(updated) = shift_formula_for_insert(formula, &name, &name, at, count) {
                cell.formula = Some(updated);
            }
        }
        if unparsed > 0 {
            log::debug!(
                "{}: {} formula(s) could not be parsed and were not shifted",
                name,
                unparsed
            );
        }

        self.grid.shift_rows_down(at, count);

        self.row_heights = std::mem::take(&mut self.row_heights)
            .into_iter()
            .map(|(r, h)| (if r >= at { r + count } else { r }, h))
            .collect();

        for region in self.merged_regions.iter_mut() {
            if region.start_row >= at {
                region.start_row += count;
                region.end_row += count;
            } else if region.end_row >= at {
                // Spans the insertion point
                region.end_row += count;
            }
        }

        self.rows = rows_before.max(at) + count;
        log::debug!("{}: inserted {} row(s) at row {}", name, count, at + 1);
        Ok(())
    }

    /// Inserts `height * times` rows right after the block
    /// `[first, first + height)` and fills each new block with a copy of it.
    pub fn duplicate_rows(&mut self, first: u32, height: u32, times: u32) -> Result<(), StructureError> {
        if height == 0 {
            return Err(StructureError::EmptyBlock);
        }
        let rows = self.row_count();
        if first + height > rows {
            return Err(StructureError::RowOutOfRange {
                sheet: self.name.clone(),
                row: first + height - 1,
                rows,
            });
        }
        if times == 0 {
            return Ok(());
        }

        let at = first + height;
        self.insert_rows(at, height * times)?;
        for copy in 0..times {
            self.copy_block(first, height, at + copy * height);
        }
        Ok(())
    }

    /// Duplicates a single row `count` times. With `insert_after` the copies
    /// follow the row; otherwise they are placed above it and the original
    /// ends up last.
    pub fn duplicate_row(&mut self, row: u32, count: u32, insert_after: bool) -> Result<(), StructureError> {
        if insert_after {
            return self.duplicate_rows(row, 1, count);
        }
        let rows = self.row_count();
        if row >= rows {
            return Err(StructureError::RowOutOfRange {
                sheet: self.name.clone(),
                row,
                rows,
            });
        }
        self.insert_rows(row, count)?;
        for i in 0..count {
            self.copy_block(row + count, 1, row + i);
        }
        Ok(())
    }

    /// Copies cells, heights and contained merges of a block of rows onto
    /// empty rows starting at `dest`.
    fn copy_block(&mut self, first: u32, height: u32, dest: u32) {
        let delta = dest as i64 - first as i64;
        let mut copies: Vec<((u32, u32), Cell)> = Vec::new();
        for offset in 0..height {
            let src = first + offset;
            for (col, cell) in self.grid.row_cells(src) {
                let mut copy = cell.clone();
                if let Some(formula) = cell.formula.as_deref() {
                    match shift_formula_for_fill(formula, delta) {
                        Some(shifted) => copy.formula = Some(shifted),
                        None => log::debug!(
                            "{}: formula {} copied verbatim from row {}",
                            self.name,
                            formula,
                            src + 1
                        ),
                    }
                }
                copies.push(((dest + offset, col), copy));
            }
        }
        for ((row, col), cell) in copies {
            self.grid.set_cell(row, col, cell);
        }

        let heights: HashMap<u32, f64> = (0..height)
            .filter_map(|offset| {
                self.row_heights
                    .get(&(first + offset))
                    .map(|h| (dest + offset, *h))
            })
            .collect();
        self.row_heights.extend(heights);

        let last = first + height - 1;
        let contained: Vec<MergedRegion> = self
            .merged_regions
            .iter()
            .filter(|m| m.start_row >= first && m.end_row <= last)
            .map(|m| MergedRegion {
                start_row: (m.start_row as i64 + delta) as u32,
                end_row: (m.end_row as i64 + delta) as u32,
                ..*m
            })
            .collect();
        self.merged_regions.extend(contained);
    }
}

// ============================================================================
// BLOCK COPY
// ============================================================================

impl Sheet {
    /// Copies the `height` x `width` block at `from` onto `to`: cells with
    /// their styles, formulas with fill semantics, row heights, column widths
    /// and merges lying wholly inside the block. Rows are not inserted;
    /// whatever sat under the destination is overwritten.
    pub fn copy_range(&mut self, from: CellCoord, height: u32, width: u32, to: CellCoord) {
        let (first_row, first_col) = from;
        let row_delta = to.0 as i64 - first_row as i64;
        let col_delta = to.1 as i64 - first_col as i64;

        let mut copies: Vec<(CellCoord, Option<Cell>)> = Vec::new();
        for r in 0..height {
            for c in 0..width {
                let dest = (to.0 + r, to.1 + c);
                let Some(cell) = self.grid.get_cell(first_row + r, first_col + c) else {
                    copies.push((dest, None));
                    continue;
                };
                let mut copy = cell.clone();
                if let Some(formula) = cell.formula.as_deref() {
                    match shift_formula_for_copy(formula, row_delta, col_delta) {
                        Some(shifted) => copy.formula = Some(shifted),
                        None => log::debug!("{}: formula {} copied verbatim", self.name, formula),
                    }
                }
                copies.push((dest, Some(copy)));
            }
        }
        for ((row, col), cell) in copies {
            match cell {
                Some(cell) => self.grid.set_cell(row, col, cell),
                None => {
                    self.grid.clear_cell(row, col);
                }
            }
        }

        for r in 0..height {
            if let Some(height) = self.row_heights.get(&(first_row + r)).copied() {
                self.row_heights.insert(to.0 + r, height);
            }
        }
        for c in 0..width {
            if let Some(width) = self.column_widths.get(&(first_col + c)).copied() {
                self.column_widths.insert(to.1 + c, width);
            }
        }

        let (last_row, last_col) = (first_row + height - 1, first_col + width - 1);
        let contained: Vec<MergedRegion> = self
            .merged_regions
            .iter()
            .filter(|m| {
                m.start_row >= first_row && m.end_row <= last_row && m.start_col >= first_col && m.end_col <= last_col
            })
            .map(|m| {
                MergedRegion::new(
                    (m.start_row as i64 + row_delta) as u32,
                    (m.start_col as i64 + col_delta) as u32,
                    (m.end_row as i64 + row_delta) as u32,
                    (m.end_col as i64 + col_delta) as u32,
                )
            })
            .collect();
        for region in contained {
            if !self.merged_regions.contains(&region) {
                self.merged_regions.push(region);
            }
        }
        self.rows = self.rows.max(to.0 + height);
    }
}
