//! FILENAME: core/persistence/src/xlsx_writer.rs

use crate::PersistenceError;
use engine::{coord_to_a1, CellStyle, CellValue, Sheet, TextAlign, Workbook};
use rust_xlsxwriter::{Color, Format, FormatAlign, Formula, Workbook as XlsxWorkbook, Worksheet};
use std::path::Path;

/// Writes the workbook to `path`, replacing any existing file.
pub fn save_xlsx(workbook: &Workbook, path: &Path) -> Result<(), PersistenceError> {
    let mut xlsx = XlsxWorkbook::new();

    for sheet in &workbook.sheets {
        let worksheet = xlsx.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        write_sheet(worksheet, sheet)?;
    }

    xlsx.save(path)?;
    log::info!("saved {} sheet(s) to {}", workbook.sheets.len(), path.display());
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, sheet: &Sheet) -> Result<(), PersistenceError> {
    for (col, width) in &sheet.column_widths {
        worksheet.set_column_width(to_col(sheet, 0, *col)?, *width)?;
    }
    for (row, height) in &sheet.row_heights {
        worksheet.set_row_height(*row, *height)?;
    }

    // Merges go first: merge_range blanks the region, the cell loop then
    // fills in the anchor cell's real content.
    let blank = Format::new();
    for region in &sheet.merged_regions {
        if region.start_row == region.end_row && region.start_col == region.end_col {
            continue;
        }
        worksheet.merge_range(
            region.start_row,
            to_col(sheet, region.start_row, region.start_col)?,
            region.end_row,
            to_col(sheet, region.end_row, region.end_col)?,
            "",
            &blank,
        )?;
    }

    let mut coords: Vec<&(u32, u32)> = sheet.grid.cells.keys().collect();
    coords.sort();

    for &(row, col) in coords {
        let Some(cell) = sheet.grid.get_cell(row, col) else {
            continue;
        };
        let col16 = to_col(sheet, row, col)?;
        let style = sheet.styles.get(cell.style_index);
        let format = (!style.is_default()).then(|| convert_style_to_format(style));

        if let Some(text) = cell.formula.as_deref() {
            let mut formula = Formula::new(text.strip_prefix('=').unwrap_or(text));
            match &cell.value {
                CellValue::Number(n) => formula = formula.set_result(n.to_string()),
                CellValue::Text(s) => formula = formula.set_result(s),
                _ => {}
            }
            match &format {
                Some(fmt) => worksheet.write_formula_with_format(row, col16, formula, fmt)?,
                None => worksheet.write_formula(row, col16, formula)?,
            };
            continue;
        }

        match (&cell.value, &format) {
            (CellValue::Empty, Some(fmt)) => {
                worksheet.write_blank(row, col16, fmt)?;
            }
            (CellValue::Empty, None) => {}
            (CellValue::Number(n), Some(fmt)) => {
                worksheet.write_number_with_format(row, col16, *n, fmt)?;
            }
            (CellValue::Number(n), None) => {
                worksheet.write_number(row, col16, *n)?;
            }
            (CellValue::Text(s), Some(fmt)) => {
                worksheet.write_string_with_format(row, col16, s, fmt)?;
            }
            (CellValue::Text(s), None) => {
                worksheet.write_string(row, col16, s)?;
            }
            (CellValue::Boolean(b), Some(fmt)) => {
                worksheet.write_boolean_with_format(row, col16, *b, fmt)?;
            }
            (CellValue::Boolean(b), None) => {
                worksheet.write_boolean(row, col16, *b)?;
            }
            // Written as a formula of the bare literal.
            (CellValue::Error(e), fmt) => {
                let formula = Formula::new(e.literal()).set_result(e.literal());
                match fmt {
                    Some(fmt) => worksheet.write_formula_with_format(row, col16, formula, fmt)?,
                    None => worksheet.write_formula(row, col16, formula)?,
                };
            }
        }
    }

    Ok(())
}

fn to_col(sheet: &Sheet, row: u32, col: u32) -> Result<u16, PersistenceError> {
    u16::try_from(col).map_err(|_| PersistenceError::OutOfBounds {
        sheet: sheet.name.clone(),
        cell: coord_to_a1((row, col)),
    })
}

fn convert_style_to_format(style: &CellStyle) -> Format {
    let mut format = Format::new();

    if style.bold {
        format = format.set_bold();
    }
    if style.italic {
        format = format.set_italic();
    }
    if let Some(color) = style.font_color {
        format = format.set_font_color(Color::RGB(color.to_rgb()));
    }
    if let Some(color) = style.background {
        format = format.set_background_color(Color::RGB(color.to_rgb()));
    }
    if let Some(code) = &style.number_format {
        format = format.set_num_format(code);
    }
    if style.wrap_text {
        format = format.set_text_wrap();
    }

    match style.text_align {
        TextAlign::General => {}
        TextAlign::Left => format = format.set_align(FormatAlign::Left),
        TextAlign::Center => format = format.set_align(FormatAlign::Center),
        TextAlign::Right => format = format.set_align(FormatAlign::Right),
    }

    format
}
