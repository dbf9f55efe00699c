//! FILENAME: core/layout-engine/src/transfer.rs
//! PURPOSE: Writes transfer deeds into the useful-life chain.
//! CONTEXT: The useful-life sheet keeps one record per registry row, in
//! registry order: registry row `first_row + i` owns record `i`, and each
//! record is a structure row followed by an equipment row. Runs after
//! placement, so properties registered by this batch are found as well.

use crate::config::{column, LayoutConfig};
use crate::error::{LayoutError, StructuralError};
use crate::placement::normalize_name;
use crate::plan::{RowShiftPlan, WorkbookPlan};
use crate::record::TransferRecord;
use crate::report::PropertyResult;
use chrono::NaiveDate;
use engine::{CellValue, Sheet, Workbook};
use std::collections::BTreeMap;

const DATE_FORMATS: [&str; 3] = ["%Y/%m/%d", "%Y-%m-%d", "%Y年%m月%d日"];

/// Excel serial day number of an extracted date, if it reads as one.
pub fn date_serial(text: &str) -> Option<f64> {
    let text = text.trim();
    let date = DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())?;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    Some((date - epoch).num_days() as f64)
}

pub struct TransferWriter<'a> {
    config: &'a LayoutConfig,
    plan: &'a RowShiftPlan,
    section: usize,
    registry_name: u32,
    kind: u32,
    completion_date: u32,
    acquired: u32,
}

impl<'a> TransferWriter<'a> {
    pub fn new(config: &'a LayoutConfig, plans: &'a WorkbookPlan) -> Result<Self, LayoutError> {
        let transfer = &config.transfer;
        let plan = plans
            .get(&transfer.sheet)
            .ok_or_else(|| StructuralError::MissingSheet(transfer.sheet.clone()))?;
        let section = plan.chain.index_of(&transfer.section).ok_or_else(|| {
            LayoutError::Config(format!("'{}' has no section '{}'", transfer.sheet, transfer.section))
        })?;
        Ok(TransferWriter {
            config,
            plan,
            section,
            registry_name: column(&config.registry.name)?,
            kind: column(&transfer.kind)?,
            completion_date: column(&transfer.completion_date)?,
            acquired: column(&transfer.acquired)?,
        })
    }

    /// Registry position of `name`: the first row whose normalised name is
    /// equal to it. Transfers never claim registry rows.
    pub fn registry_index(&self, registry: &Sheet, name: &str) -> Option<u32> {
        let wanted = normalize_name(name);
        let rows = &self.config.registry;
        (rows.first_row..=rows.last_row)
            .find(|&row| {
                registry
                    .value(row - 1, self.registry_name)
                    .and_then(|v| v.as_text())
                    .map(normalize_name)
                    .is_some_and(|existing| existing == wanted)
            })
            .map(|row| row - rows.first_row)
    }

    /// Writes every transfer. Unnamed or unregistered properties are
    /// reported and skipped; the batch goes on.
    pub fn write(&self, workbook: &mut Workbook, transfers: &[TransferRecord]) -> Result<Vec<PropertyResult>, LayoutError> {
        if transfers.is_empty() {
            return Ok(Vec::new());
        }
        let registry_sheet = self.config.registry_sheet();
        let indices: Vec<Option<u32>> = {
            let registry = workbook
                .sheet(registry_sheet)
                .ok_or_else(|| StructuralError::MissingSheet(registry_sheet.to_string()))?;
            transfers
                .iter()
                .map(|t| t.name().and_then(|name| self.registry_index(registry, name)))
                .collect()
        };
        let sheet = workbook
            .sheet_mut(self.plan.sheet())
            .ok_or_else(|| StructuralError::MissingSheet(self.plan.sheet().to_string()))?;

        let records = self.plan.record_count(self.section);
        let mut results = Vec::with_capacity(transfers.len());
        for (i, (transfer, index)) in transfers.iter().zip(indices).enumerate() {
            let Some(name) = transfer.name() else {
                results.push(PropertyResult::error(
                    None,
                    format!("transfer {}: property name could not be extracted", i + 1),
                ));
                continue;
            };
            let Some(index) = index else {
                results.push(PropertyResult::error(
                    Some(name),
                    format!("transfer {}: property is not in the registry", i + 1),
                ));
                continue;
            };
            let registry_row = index + self.config.registry.first_row;
            if index >= records {
                results.push(PropertyResult::error(
                    Some(name),
                    format!(
                        "transfer {}: registry row {} is past the {} useful-life records",
                        i + 1,
                        registry_row,
                        records
                    ),
                ));
                continue;
            }

            for (phase, label) in self.config.transfer.kinds.iter().enumerate() {
                let row = self.plan.record_row(self.section, index, phase as u32);
                sheet.set_value(row - 1, self.kind, CellValue::Text(label.clone()));
                let dates = [
                    (self.completion_date, &transfer.completion_date),
                    (self.acquired, &transfer.transfer_date),
                ];
                for (col, date) in dates {
                    if let Some(date) = date.as_deref().filter(|d| !d.trim().is_empty()) {
                        self.write_date(sheet, row, col, date);
                    }
                }
            }
            let row = self.plan.record_row(self.section, index, 0);
            log::debug!("transfer '{}' -> {} row {}", name, self.plan.sheet(), row);
            let mut rows = BTreeMap::new();
            rows.insert(self.plan.section(self.section).id.clone(), row);
            results.push(PropertyResult::success(
                name,
                format!("transfer {} written (registry row {})", i + 1, registry_row),
                rows,
            ));
        }
        Ok(results)
    }

    /// Dates go in as serial numbers with a date format unless the cell
    /// already has a number format; anything unreadable stays text.
    fn write_date(&self, sheet: &mut Sheet, row: u32, col: u32, text: &str) {
        let Some(serial) = date_serial(text) else {
            log::warn!("'{}' row {}: '{}' is not a date, written as text", sheet.name, row, text);
            sheet.set_value(row - 1, col, CellValue::Text(text.to_string()));
            return;
        };
        sheet.set_value(row - 1, col, CellValue::Number(serial));
        let Some(cell) = sheet.grid.get_cell(row - 1, col) else {
            return;
        };
        let current = sheet.styles.get(cell.style_index).clone();
        if current.number_format.is_none() {
            let dated = current.with_number_format(self.config.transfer.date_format.as_str());
            let index = sheet.styles.get_or_create(dated);
            if let Some(cell) = sheet.grid.get_cell_mut(row - 1, col) {
                cell.style_index = index;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{INCOME_SHEET, USEFUL_LIFE_SHEET};
    use crate::section::SectionChain;
    use engine::CellStyle;

    fn plans(config: &LayoutConfig, count: u32) -> WorkbookPlan {
        WorkbookPlan {
            plans: config
                .chains()
                .map(|c| {
                    let chain = SectionChain::from_config(c).unwrap();
                    RowShiftPlan::compute(&chain, count, config.max_records).unwrap()
                })
                .collect(),
        }
    }

    fn workbook() -> Workbook {
        let mut workbook = Workbook::new();
        let mut income = Sheet::new(INCOME_SHEET);
        income.set_value(3, 6, CellValue::Text("メゾン青山".to_string()));
        income.set_value(4, 6, CellValue::Text("ハイツ　松".to_string()));
        workbook.add_sheet(income);
        workbook.add_sheet(Sheet::new(USEFUL_LIFE_SHEET));
        workbook
    }

    fn transfer(name: Option<&str>) -> TransferRecord {
        TransferRecord {
            property_name: name.map(str::to_string),
            completion_date: Some("2010/02/24".to_string()),
            transfer_date: Some("2024/12/27".to_string()),
        }
    }

    #[test]
    fn reads_extracted_dates() {
        assert_eq!(date_serial("2024/12/27"), Some(45653.0));
        assert_eq!(date_serial(" 2010-02-24 "), Some(40233.0));
        assert_eq!(date_serial("2001年04月01日"), Some(36982.0));
        assert_eq!(date_serial("令和6年"), None);
    }

    #[test]
    fn writes_both_rows_of_the_registry_record() {
        let config = LayoutConfig::default();
        let plans = plans(&config, 2);
        let writer = TransferWriter::new(&config, &plans).unwrap();
        let mut workbook = workbook();
        let results = writer.write(&mut workbook, &[transfer(Some("ハイツ松"))]).unwrap();

        assert!(results[0].is_success());
        assert_eq!(results[0].rows.get("assets"), Some(&7));
        let sheet = workbook.sheet(USEFUL_LIFE_SHEET).unwrap();
        assert_eq!(sheet.value(6, 4), Some(&CellValue::Text("躯体".to_string())));
        assert_eq!(sheet.value(7, 4), Some(&CellValue::Text("設備".to_string())));
        for row in [6, 7] {
            assert_eq!(sheet.value(row, 5), Some(&CellValue::Number(40233.0)));
            assert_eq!(sheet.value(row, 6), Some(&CellValue::Number(45653.0)));
        }
        let style = sheet.styles.get(sheet.get_cell(6, 6).unwrap().style_index);
        assert_eq!(style.number_format.as_deref(), Some("yyyy/mm/dd"));
        assert_eq!(sheet.value(4, 4), None);
    }

    #[test]
    fn grown_chains_keep_the_registry_order() {
        let config = LayoutConfig::default();
        let plans = plans(&config, 25);
        let writer = TransferWriter::new(&config, &plans).unwrap();
        let mut workbook = workbook();
        workbook
            .sheet_mut(INCOME_SHEET)
            .unwrap()
            .set_value(26, 6, CellValue::Text("コーポ桜".to_string()));

        let results = writer.write(&mut workbook, &[transfer(Some("コーポ桜"))]).unwrap();
        // Registry row 27 is record 23: 5 + 23 * 2.
        assert_eq!(results[0].rows.get("assets"), Some(&51));
        let sheet = workbook.sheet(USEFUL_LIFE_SHEET).unwrap();
        assert_eq!(sheet.value(51, 4), Some(&CellValue::Text("設備".to_string())));
    }

    #[test]
    fn unknown_and_unnamed_transfers_are_reported() {
        let config = LayoutConfig::default();
        let plans = plans(&config, 1);
        let writer = TransferWriter::new(&config, &plans).unwrap();
        let mut workbook = workbook();
        let results = writer
            .write(&mut workbook, &[transfer(None), transfer(Some("メゾン")), transfer(Some(" メゾン青山"))])
            .unwrap();

        assert!(!results[0].is_success());
        assert_eq!(results[0].property_name, None);
        // Transfers match registry names exactly, never partially.
        assert!(!results[1].is_success());
        assert!(results[1].message.contains("not in the registry"));
        assert!(results[2].is_success());
        assert_eq!(results[2].rows.get("assets"), Some(&5));
    }

    #[test]
    fn existing_formats_and_odd_dates_are_kept() {
        let config = LayoutConfig::default();
        let plans = plans(&config, 1);
        let writer = TransferWriter::new(&config, &plans).unwrap();
        let mut workbook = workbook();
        let sheet = workbook.sheet_mut(USEFUL_LIFE_SHEET).unwrap();
        let wareki = sheet
            .styles
            .get_or_create(CellStyle::new().with_number_format("[$-ja-JP]ggge\"年\"m\"月\"d\"日\""));
        sheet.set_value(4, 6, CellValue::Empty);
        sheet.grid.get_cell_mut(4, 6).unwrap().style_index = wareki;

        let odd = TransferRecord {
            completion_date: Some("不明".to_string()),
            ..transfer(Some("メゾン青山"))
        };
        writer.write(&mut workbook, &[odd]).unwrap();
        let sheet = workbook.sheet(USEFUL_LIFE_SHEET).unwrap();
        assert_eq!(sheet.get_cell(4, 6).unwrap().style_index, wareki);
        assert_eq!(sheet.value(4, 5), Some(&CellValue::Text("不明".to_string())));
    }
}
