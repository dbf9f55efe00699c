//! FILENAME: core/layout-engine/tests/common/mod.rs
//! PURPOSE: Synthetic statement template shaped like the production one.
//! CONTEXT: Shared by the integration tests. Rows and formulas follow the
//! default LayoutConfig: five income sections at 55/78/101/124/147, the
//! interest, useful-life and depreciation blocks that mirror them, the
//! depreciation export list and the new-property cost block.

#![allow(dead_code)]

use engine::{parse_a1, CellValue, Sheet, Workbook};
use layout_engine::{
    PropertyRecord, SourceDocument, DEPRECIATION_EXPORT_SHEET, DEPRECIATION_SHEET, INCOME_SHEET, INTEREST_SHEET,
    NEW_PROPERTY_SHEET, USEFUL_LIFE_SHEET,
};

pub const SECTION_STARTS: [u32; 5] = [55, 78, 101, 124, 147];
pub const MONTHS: [&str; 12] = ["I", "J", "K", "L", "M", "N", "O", "P", "Q", "R", "S", "T"];
pub const SUMMARY_SHEET: &str = "決算書";

fn put_formula(sheet: &mut Sheet, a1: &str, formula: &str) {
    let (row, col) = parse_a1(a1).unwrap();
    sheet.set_formula(row, col, formula);
}

fn put_value(sheet: &mut Sheet, a1: &str, value: CellValue) {
    let (row, col) = parse_a1(a1).unwrap();
    sheet.set_value(row, col, value);
}

pub fn formula_at<'a>(workbook: &'a Workbook, sheet: &str, a1: &str) -> Option<&'a str> {
    let (row, col) = parse_a1(a1).unwrap();
    workbook.sheet(sheet).unwrap().formula(row, col)
}

pub fn value_at<'a>(workbook: &'a Workbook, sheet: &str, a1: &str) -> Option<&'a CellValue> {
    let (row, col) = parse_a1(a1).unwrap();
    workbook.sheet(sheet).unwrap().value(row, col)
}

fn income_sheet() -> Sheet {
    let mut sheet = Sheet::new(INCOME_SHEET);
    put_value(&mut sheet, "G3", CellValue::Text("物件名".to_string()));
    put_value(&mut sheet, "G4", CellValue::Text("既存 物件".to_string()));
    for (i, month) in MONTHS.iter().enumerate() {
        let kind = if i == 11 { "サブリース" } else { "通常" };
        put_value(&mut sheet, &format!("{}53", month), CellValue::Text(kind.to_string()));
    }
    put_value(&mut sheet, "V53", CellValue::Text("通常".to_string()));
    put_value(&mut sheet, "W53", CellValue::Text("サブリース".to_string()));

    for (s, &start) in SECTION_STARTS.iter().enumerate() {
        for k in 0..20 {
            let r = start + k;
            put_value(&mut sheet, &format!("A{}", r), CellValue::Number((k + 1) as f64));
            put_formula(&mut sheet, &format!("V{}", r), &format!("=SUMIF($I$53:$T$53,V$53,$I{}:$T{})", r, r));
            put_formula(&mut sheet, &format!("W{}", r), &format!("=SUMIF($I$53:$T$53,W$53,$I{}:$T{})", r, r));
            put_formula(&mut sheet, &format!("X{}", r), &format!("=SUM(V{}:W{})", r, r));
            if s > 0 {
                put_formula(&mut sheet, &format!("H{}", r), &format!("=H{}", r - 23));
            }
            if s == 4 {
                for (m, month) in MONTHS.iter().enumerate().take(11) {
                    let next = MONTHS[m + 1];
                    put_formula(
                        &mut sheet,
                        &format!("{}{}", month, r),
                        &format!(
                            "=IF({m}$146>=$U{r},IF({m}$53=\"サブリース\",{n}{r},0),0)",
                            m = month,
                            n = next,
                            r = r
                        ),
                    );
                }
                put_formula(
                    &mut sheet,
                    &format!("T{}", r),
                    &format!(
                        "=IF(T$146>=$U{r},IF(T$53=\"サブリース\",ROUNDDOWN((T{a}-T{b})*$B$146,-2),0),0)",
                        r = r,
                        a = 55 + k,
                        b = 78 + k
                    ),
                );
            }
        }
        let total = start + 20;
        let carry = start + 21;
        for col in ["I", "U", "V"] {
            put_formula(
                &mut sheet,
                &format!("{}{}", col, total),
                &format!("=SUM({c}{a}:{c}{b})", c = col, a = start, b = start + 19),
            );
        }
        let previous_carry = if s == 0 { 53 } else { SECTION_STARTS[s - 1] + 21 };
        put_formula(&mut sheet, &format!("I{}", carry), &format!("=I{}", previous_carry));
    }
    put_value(&mut sheet, "B146", CellValue::Number(0.1));
    put_value(&mut sheet, "I146", CellValue::Number(1.0));
    put_formula(&mut sheet, "U171", "=SUM(U75,U98)");
    sheet
}

fn interest_sheet() -> Sheet {
    let mut sheet = Sheet::new(INTEREST_SHEET);
    put_value(&mut sheet, "B9", CellValue::Text("物件".to_string()));
    for k in 0..20u32 {
        let r = 10 + k;
        put_formula(&mut sheet, &format!("B{}", r), &format!("='{}'!H{}", INCOME_SHEET, 55 + k));
        let pair = 41 + 2 * k;
        put_formula(&mut sheet, &format!("B{}", pair), &format!("=B{}", r));
        put_formula(&mut sheet, &format!("D{}", pair), &format!("=G{}", r));
        put_formula(&mut sheet, &format!("D{}", pair + 1), &format!("=D{}*2", pair));
    }
    put_formula(&mut sheet, "C30", "=SUM(C10:C29)");
    put_formula(&mut sheet, "D81", "=SUM(D41:D80)");
    sheet
}

fn useful_life_sheet() -> Sheet {
    let mut sheet = Sheet::new(USEFUL_LIFE_SHEET);
    put_value(&mut sheet, "B4", CellValue::Text("No.".to_string()));
    for k in 0..40u32 {
        put_value(&mut sheet, &format!("B{}", 5 + k), CellValue::Number((k + 1) as f64));
    }
    for k in 0..20u32 {
        put_formula(
            &mut sheet,
            &format!("C{}", 5 + 2 * k),
            &format!("='{}'!B{}", INTEREST_SHEET, 41 + 2 * k),
        );
    }
    put_value(&mut sheet, "C46", CellValue::Text("end".to_string()));
    sheet
}

fn depreciation_sheet() -> Sheet {
    let mut sheet = Sheet::new(DEPRECIATION_SHEET);
    put_value(&mut sheet, "B20", CellValue::Text("資産".to_string()));
    for k in 0..20u32 {
        let r = 21 + k;
        put_formula(
            &mut sheet,
            &format!("B{}", r),
            &format!("='{}'!C{}", USEFUL_LIFE_SHEET, 5 + 2 * k),
        );
        put_formula(&mut sheet, &format!("C{}", r), &format!("=B{}*2", r));
    }
    put_formula(&mut sheet, "C41", "=SUM(C21:C40)");
    put_value(&mut sheet, "C42", CellValue::Text("end".to_string()));
    sheet
}

fn export_sheet() -> Sheet {
    let mut sheet = Sheet::new(DEPRECIATION_EXPORT_SHEET);
    put_value(&mut sheet, "E3", CellValue::Text("資産の名称".to_string()));
    for r in 4..=6 {
        put_value(&mut sheet, &format!("E{}", r), CellValue::Text("前年の資産".to_string()));
        put_formula(&mut sheet, &format!("I{}", r), &format!("='{}'!L{}", USEFUL_LIFE_SHEET, r));
    }
    sheet
}

fn new_property_sheet() -> Sheet {
    let mut sheet = Sheet::new(NEW_PROPERTY_SHEET);
    put_value(&mut sheet, "A1", CellValue::Text("物件名".to_string()));
    put_value(&mut sheet, "A2", CellValue::Text("ローン事務手数料".to_string()));
    put_value(&mut sheet, "A9", CellValue::Text("管理費・修繕積立金".to_string()));
    put_value(&mut sheet, "A15", CellValue::Text("合計".to_string()));
    put_formula(&mut sheet, "D15", "=SUM(D2:D14)");
    sheet
}

fn summary_sheet() -> Sheet {
    let mut sheet = Sheet::new(SUMMARY_SHEET);
    put_formula(&mut sheet, "A1", &format!("='{}'!U75", INCOME_SHEET));
    put_formula(&mut sheet, "A2", &format!("=SUM('{}'!U55:U74)", INCOME_SHEET));
    put_formula(&mut sheet, "A3", "=A1+A2");
    sheet
}

/// The full synthetic template.
pub fn template() -> Workbook {
    let mut workbook = Workbook::new();
    workbook.add_sheet(income_sheet());
    workbook.add_sheet(interest_sheet());
    workbook.add_sheet(useful_life_sheet());
    workbook.add_sheet(depreciation_sheet());
    workbook.add_sheet(export_sheet());
    workbook.add_sheet(new_property_sheet());
    workbook.add_sheet(summary_sheet());
    workbook
}

pub fn statement(i: u32) -> PropertyRecord {
    let mut record = PropertyRecord {
        property_name: Some(format!("物件{:03}", i)),
        tenant_name: Some(format!("借主{}", i)),
        annual_total: Some(1_200_000.0 + i as f64),
        ..PropertyRecord::default()
    };
    record.income = [100_000.0; 12];
    record.management_fee[0] = 5_000.0;
    record
}

pub fn documents(count: u32) -> Vec<SourceDocument> {
    (0..count)
        .map(|i| SourceDocument::parsed(&format!("statement-{}.pdf", i), statement(i)))
        .collect()
}
