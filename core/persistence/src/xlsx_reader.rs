//! FILENAME: core/persistence/src/xlsx_reader.rs

use crate::xlsx_styles::{read_formatting, PackageFormatting};
use crate::PersistenceError;
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use engine::{Cell, CellError, CellValue, MergedRegion, Sheet, Workbook};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Loads every sheet of an xlsx file.
pub fn load_xlsx(path: &Path) -> Result<Workbook, PersistenceError> {
    load_xlsx_sheets(path, None)
}

/// Loads the named sheets (or all sheets when `only` is `None`), keeping the
/// workbook's sheet order.
pub fn load_xlsx_sheets(path: &Path, only: Option<&[&str]>) -> Result<Workbook, PersistenceError> {
    let mut xlsx: Xlsx<BufReader<File>> = open_workbook(path)?;
    let sheet_names = xlsx.sheet_names().to_vec();

    if sheet_names.is_empty() {
        return Err(PersistenceError::InvalidFormat(
            "Workbook contains no sheets".to_string(),
        ));
    }
    if let Some(wanted) = only {
        for name in wanted {
            if !sheet_names.iter().any(|s| s == name) {
                return Err(PersistenceError::SheetNotFound(name.to_string()));
            }
        }
    }

    xlsx.load_merged_regions()?;
    let formatting = read_formatting(path)?;

    let mut workbook = Workbook::new();
    for sheet_name in &sheet_names {
        if let Some(wanted) = only {
            if !wanted.iter().any(|w| w == sheet_name) {
                continue;
            }
        }

        let mut sheet = Sheet::new(sheet_name.clone());

        let values = xlsx.worksheet_range(sheet_name)?;
        copy_values(&mut sheet, &values);

        let formulas = xlsx.worksheet_formula(sheet_name)?;
        copy_formulas(&mut sheet, &formulas);

        apply_formatting(&mut sheet, &formatting);

        for (_, _, dims) in xlsx.merged_regions_by_sheet(sheet_name) {
            sheet.merged_regions.push(MergedRegion::new(
                dims.start.0,
                dims.start.1,
                dims.end.0,
                dims.end.1,
            ));
        }

        log::debug!(
            "loaded sheet '{}': {} cells, {} formulas, {} merges, {} styles",
            sheet.name,
            sheet.grid.cells.len(),
            sheet.grid.formula_coords().len(),
            sheet.merged_regions.len(),
            sheet.styles.len()
        );
        workbook.add_sheet(sheet);
    }

    Ok(workbook)
}

/// calamine ranges are relative to their first used cell; `start()` gives
/// the absolute offset.
fn copy_values(sheet: &mut Sheet, range: &Range<Data>) {
    let Some((row0, col0)) = range.start() else {
        return;
    };
    for (r, c, data) in range.cells() {
        let value = match data {
            Data::Empty => continue,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Boolean(*b),
            Data::Error(e) => CellValue::Error(CellError::from_literal(&e.to_string())),
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::DateTimeIso(s) => CellValue::Text(s.clone()),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
        };
        sheet.set_cell(
            row0 + r as u32,
            col0 + c as u32,
            Cell {
                formula: None,
                value,
                style_index: 0,
            },
        );
    }
}

fn copy_formulas(sheet: &mut Sheet, range: &Range<String>) {
    let Some((row0, col0)) = range.start() else {
        return;
    };
    for (r, c, formula) in range.cells() {
        if formula.is_empty() {
            continue;
        }
        let (row, col) = (row0 + r as u32, col0 + c as u32);
        let text = format!("={}", formula);
        match sheet.grid.get_cell_mut(row, col) {
            Some(cell) => cell.formula = Some(text),
            None => sheet.set_cell(row, col, Cell::new_formula(text)),
        }
    }
}

/// Styled cells without content are kept as blanks so their format
/// survives row duplication and the write back.
fn apply_formatting(sheet: &mut Sheet, formatting: &PackageFormatting) {
    let Some(part) = formatting.sheets.get(&sheet.name) else {
        return;
    };
    for &(col, width) in &part.column_widths {
        sheet.column_widths.insert(col, width);
    }
    for &(row, height) in &part.row_heights {
        sheet.row_heights.insert(row, height);
    }
    let mut registered: HashMap<usize, usize> = HashMap::new();
    for &((row, col), xf) in &part.cells {
        let Some(style) = formatting.style(xf) else {
            continue;
        };
        let index = *registered
            .entry(xf)
            .or_insert_with(|| sheet.styles.get_or_create(style.clone()));
        match sheet.grid.get_cell_mut(row, col) {
            Some(cell) => cell.style_index = index,
            None => sheet.set_cell(
                row,
                col,
                Cell {
                    formula: None,
                    value: CellValue::Empty,
                    style_index: index,
                },
            ),
        }
    }
}
