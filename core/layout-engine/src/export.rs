//! FILENAME: core/layout-engine/src/export.rs
//! PURPOSE: Rebuilds the depreciation export list from the useful-life chain.
//! CONTEXT: Every labelled useful-life row becomes one line of the export
//! sheet, in chain order: the property name and acquisition date as values,
//! the useful-life rate and the interest figure as references. Rows are
//! taken from the plan, so a grown chain exports every record. Runs last,
//! after transfers have labelled their rows.

use crate::config::{column, ExportConfig, LayoutConfig};
use crate::error::{LayoutError, StructuralError};
use crate::plan::{RowShiftPlan, WorkbookPlan};
use engine::{index_to_col, Cell, CellValue, Workbook};
use parser::{to_formula, Expression};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportReport {
    /// Lines written to the export sheet.
    pub rows: u32,
    /// Why nothing was exported, when that happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl ExportReport {
    fn not_run(reason: String) -> Self {
        ExportReport {
            rows: 0,
            skipped: Some(reason),
        }
    }
}

/// One labelled useful-life row, read before anything is written.
struct ExportLine {
    name: Option<String>,
    acquired: Option<Cell>,
    rate_row: u32,
    interest_row: Option<u32>,
}

pub struct DepreciationExport<'a> {
    config: &'a LayoutConfig,
    export: &'a ExportConfig,
    assets: (&'a RowShiftPlan, usize),
    interest: (&'a RowShiftPlan, usize),
}

impl<'a> DepreciationExport<'a> {
    /// `None` when the export is switched off.
    pub fn new(config: &'a LayoutConfig, plans: &'a WorkbookPlan) -> Result<Option<Self>, LayoutError> {
        let Some(export) = config.export.as_ref() else {
            return Ok(None);
        };
        let section = |sheet: &str, id: &str| -> Result<(&'a RowShiftPlan, usize), LayoutError> {
            let plan = plans
                .get(sheet)
                .ok_or_else(|| StructuralError::MissingSheet(sheet.to_string()))?;
            let index = plan
                .chain
                .index_of(id)
                .ok_or_else(|| LayoutError::Config(format!("'{}' has no section '{}'", sheet, id)))?;
            Ok((plan, index))
        };
        Ok(Some(DepreciationExport {
            config,
            export,
            assets: section(&config.transfer.sheet, &config.transfer.section)?,
            interest: section(&export.interest_sheet, &export.interest_section)?,
        }))
    }

    pub fn run(&self, workbook: &mut Workbook) -> Result<ExportReport, LayoutError> {
        if workbook.sheet(&self.export.sheet).is_none() {
            log::warn!("export sheet '{}' not found, depreciation export skipped", self.export.sheet);
            return Ok(ExportReport::not_run(format!("sheet '{}' not found", self.export.sheet)));
        }
        let lines = self.collect(workbook)?;

        let export = self.export;
        let (name, acquired, rate, interest) = (
            column(&export.name)?,
            column(&export.acquired)?,
            column(&export.rate)?,
            column(&export.interest)?,
        );
        let rate_col = index_to_col(column(&self.config.transfer.rate)?);
        let interest_col = index_to_col(column(&export.interest_column)?);
        let assets_sheet = self.assets.0.sheet().to_string();
        let interest_sheet = self.interest.0.sheet().to_string();
        let styles: Vec<Option<engine::CellStyle>> = {
            let source = workbook
                .sheet(&assets_sheet)
                .ok_or_else(|| StructuralError::MissingSheet(assets_sheet.clone()))?;
            lines
                .iter()
                .map(|line| line.acquired.as_ref().map(|cell| source.styles.get(cell.style_index).clone()))
                .collect()
        };

        let sheet = workbook
            .sheet_mut(&export.sheet)
            .ok_or_else(|| StructuralError::MissingSheet(export.sheet.clone()))?;
        let first = export.first_row - 1;
        for row in first..sheet.row_count().max(first) {
            for col in [name, acquired, rate, interest] {
                sheet.clear_cell(row, col);
            }
        }

        for (n, (line, style)) in lines.iter().zip(styles).enumerate() {
            let row = first + n as u32;
            if let Some(text) = &line.name {
                sheet.set_value(row, name, CellValue::Text(text.clone()));
            }
            if let Some(cell) = &line.acquired {
                let style_index = style.map(|s| sheet.styles.get_or_create(s)).unwrap_or(0);
                sheet.set_cell(
                    row,
                    acquired,
                    Cell {
                        formula: None,
                        value: cell.value.clone(),
                        style_index,
                    },
                );
            }
            let reference = Expression::sheet_cell(&assets_sheet, &rate_col, line.rate_row);
            sheet.set_formula(row, rate, &to_formula(&reference));
            if let Some(interest_row) = line.interest_row {
                let reference = Expression::sheet_cell(&interest_sheet, &interest_col, interest_row);
                sheet.set_formula(row, interest, &to_formula(&reference));
            }
        }
        log::info!("depreciation export: {} line(s) on '{}'", lines.len(), export.sheet);
        Ok(ExportReport {
            rows: lines.len() as u32,
            skipped: None,
        })
    }

    fn collect(&self, workbook: &Workbook) -> Result<Vec<ExportLine>, LayoutError> {
        let (plan, section) = self.assets;
        let (interest_plan, interest_section) = self.interest;
        let transfer = &self.config.transfer;
        let registry = &self.config.registry;
        let (kind, acquired_col, registry_name) = (
            column(&transfer.kind)?,
            column(&transfer.acquired)?,
            column(&registry.name)?,
        );
        let sheet = workbook
            .sheet(plan.sheet())
            .ok_or_else(|| StructuralError::MissingSheet(plan.sheet().to_string()))?;
        let registry_sheet = workbook
            .sheet(self.config.registry_sheet())
            .ok_or_else(|| StructuralError::MissingSheet(self.config.registry_sheet().to_string()))?;

        let stride = plan.section(section).stride;
        let interest_stride = interest_plan.section(interest_section).stride;
        let mut lines = Vec::new();
        for k in 0..plan.record_count(section) {
            let registry_row = registry.first_row + k;
            let name = (registry_row <= registry.last_row)
                .then(|| registry_sheet.value(registry_row - 1, registry_name))
                .flatten()
                .and_then(|v| v.as_text())
                .map(|text| text.trim().to_string());
            for phase in 0..stride {
                let row = plan.record_row(section, k, phase);
                let labelled = sheet.value(row - 1, kind).is_some_and(|v| !v.is_empty());
                if !labelled {
                    continue;
                }
                let acquired = sheet
                    .get_cell(row - 1, acquired_col)
                    .filter(|cell| !cell.value.is_empty())
                    .cloned();
                let interest_row = (k < interest_plan.record_count(interest_section) && phase < interest_stride)
                    .then(|| interest_plan.record_row(interest_section, k, phase));
                lines.push(ExportLine {
                    name: name.clone(),
                    acquired,
                    rate_row: row,
                    interest_row,
                });
            }
        }
        Ok(lines)
    }
}
