//! FILENAME: core/persistence/tests/roundtrip.rs
//! PURPOSE: Save a workbook with rust_xlsxwriter and read it back with calamine.

use engine::{CellError, CellStyle, CellValue, Color, MergedRegion, Sheet, TextAlign, Workbook};
use persistence::{load_xlsx, load_xlsx_sheets, save_xlsx, PersistenceError};

fn sample_workbook() -> Workbook {
    let mut book = Workbook::new();

    let mut income = Sheet::new("【不】①不動産収入");
    income.set_value(3, 6, CellValue::Text("サンプル物件".into()));
    income.set_formula(54, 7, "=G4");
    income.set_value(54, 8, CellValue::Number(120000.0));
    income.set_formula(74, 8, "=SUM(I55:I74)");
    let bold = income.styles.get_or_create(CellStyle::new().with_bold(true));
    income.grid.get_cell_mut(54, 8).unwrap().style_index = bold;
    income.merged_regions.push(MergedRegion::new(52, 0, 52, 5));
    income.row_heights.insert(54, 18.0);
    book.add_sheet(income);

    let mut interest = Sheet::new("【不】⑤利息");
    interest.set_formula(9, 1, "='【不】①不動産収入'!H55");
    book.add_sheet(interest);

    book
}

#[test]
fn values_formulas_and_merges_survive() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    save_xlsx(&sample_workbook(), &path).unwrap();

    let loaded = load_xlsx(&path).unwrap();
    assert_eq!(loaded.sheet_names(), vec!["【不】①不動産収入", "【不】⑤利息"]);

    let income = loaded.sheet("【不】①不動産収入").unwrap();
    assert_eq!(
        income.value(3, 6),
        Some(&CellValue::Text("サンプル物件".into()))
    );
    assert_eq!(income.value(54, 8), Some(&CellValue::Number(120000.0)));
    assert_eq!(income.formula(54, 7), Some("=G4"));
    assert_eq!(income.formula(74, 8), Some("=SUM(I55:I74)"));
    assert!(income.merged_regions.contains(&MergedRegion::new(52, 0, 52, 5)));

    let interest = loaded.sheet("【不】⑤利息").unwrap();
    assert_eq!(interest.formula(9, 1), Some("='【不】①不動産収入'!H55"));
}

#[test]
fn styles_widths_and_heights_survive() {
    let mut book = Workbook::new();
    let mut sheet = Sheet::new("【不】④耐用年数");
    let header = CellStyle::new()
        .with_bold(true)
        .with_background(Color::new(255, 255, 0))
        .with_text_align(TextAlign::Center);
    let money = CellStyle::new().with_number_format("#,##0.0");
    let header = sheet.styles.get_or_create(header);
    let money = sheet.styles.get_or_create(money);
    sheet.set_value(3, 1, CellValue::Text("取得価額".into()));
    sheet.grid.get_cell_mut(3, 1).unwrap().style_index = header;
    sheet.set_value(4, 1, CellValue::Number(1250.5));
    sheet.grid.get_cell_mut(4, 1).unwrap().style_index = money;
    // A formatted but empty cell of a record row.
    sheet.set_cell(5, 1, engine::Cell { formula: None, value: CellValue::Empty, style_index: money });
    sheet.column_widths.insert(1, 14.0);
    sheet.row_heights.insert(4, 21.0);
    book.add_sheet(sheet);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("styled.xlsx");
    save_xlsx(&book, &path).unwrap();

    let loaded = load_xlsx(&path).unwrap();
    let sheet = loaded.sheet("【不】④耐用年数").unwrap();
    let style_at = |row: u32, col: u32| sheet.styles.get(sheet.grid.get_cell(row, col).unwrap().style_index);
    let header = style_at(3, 1);
    assert!(header.bold);
    assert_eq!(header.background, Some(Color::new(255, 255, 0)));
    assert_eq!(header.text_align, TextAlign::Center);
    assert_eq!(style_at(4, 1).number_format.as_deref(), Some("#,##0.0"));
    assert_eq!(style_at(5, 1).number_format.as_deref(), Some("#,##0.0"));
    assert_eq!(sheet.value(5, 1), Some(&CellValue::Empty));

    let width = sheet.column_widths.get(&1).copied().unwrap();
    assert!((width - 14.0).abs() < 0.05, "width {}", width);
    assert_eq!(sheet.row_heights.get(&4), Some(&21.0));
}

#[test]
fn error_values_stay_errors() {
    let mut book = Workbook::new();
    let mut sheet = Sheet::new("Data");
    sheet.set_value(0, 0, CellValue::Error(CellError::NA));
    sheet.set_value(1, 0, CellValue::Error(CellError::Div0));
    book.add_sheet(sheet);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("errors.xlsx");
    save_xlsx(&book, &path).unwrap();

    let loaded = load_xlsx(&path).unwrap();
    let sheet = loaded.sheet("Data").unwrap();
    assert_eq!(sheet.formula(0, 0), Some("=#N/A"));
    assert_eq!(sheet.formula(1, 0), Some("=#DIV/0!"));
}

#[test]
fn selected_sheets_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("book.xlsx");
    save_xlsx(&sample_workbook(), &path).unwrap();

    let loaded = load_xlsx_sheets(&path, Some(&["【不】⑤利息"][..])).unwrap();
    assert_eq!(loaded.sheets.len(), 1);

    let missing = load_xlsx_sheets(&path, Some(&["nope"][..]));
    assert!(matches!(missing, Err(PersistenceError::SheetNotFound(name)) if name == "nope"));
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_xlsx(&dir.path().join("absent.xlsx")).is_err());
}
