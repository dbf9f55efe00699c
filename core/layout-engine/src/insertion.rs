//! FILENAME: core/layout-engine/src/insertion.rs
//! PURPOSE: Grows the sections of one sheet to the planned record count.
//! CONTEXT: Sections are extended bottom-up, one record per section per
//! pass, by duplicating the section's template record. Every target row is
//! recomputed from the insertions already done rather than from a cached
//! offset, and the sheet's row count is checked after every duplication.

use crate::error::StructuralError;
use crate::plan::RowShiftPlan;
use engine::Sheet;

/// Replays completed insertions against original template rows.
#[derive(Debug, Clone, Default)]
pub struct RowTracker {
    /// (first inserted row, count), 1-based, in the order they happened.
    events: Vec<(u32, u32)>,
}

impl RowTracker {
    pub fn new() -> Self {
        RowTracker::default()
    }

    /// Records `count` rows inserted before 1-based row `at`.
    pub fn record(&mut self, at: u32, count: u32) {
        self.events.push((at, count));
    }

    /// Current position of an original row.
    pub fn current(&self, original: u32) -> u32 {
        self.events.iter().fold(original, |row, &(at, count)| {
            if row >= at {
                row + count
            } else {
                row
            }
        })
    }

    pub fn inserted(&self) -> u32 {
        self.events.iter().map(|&(_, count)| count).sum()
    }
}

/// One duplication of a template record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertionStep {
    pub sheet: String,
    pub section: String,
    /// 0-based pass number.
    pub pass: u32,
    /// 1-based first row of the record that was copied.
    pub source_row: u32,
    pub rows: u32,
}

pub struct SectionInserter<'a> {
    plan: &'a RowShiftPlan,
}

impl<'a> SectionInserter<'a> {
    pub fn new(plan: &'a RowShiftPlan) -> Self {
        SectionInserter { plan }
    }

    /// The only order the inserter accepts: bottom section first.
    pub fn expected_order(&self) -> Vec<usize> {
        self.plan.chain.reverse_order()
    }

    /// Extends every section of `sheet` in `order`, calling `observer`
    /// after each duplication. Returns the steps performed.
    pub fn run(
        &self,
        sheet: &mut Sheet,
        order: &[usize],
        observer: &mut dyn FnMut(&InsertionStep),
    ) -> Result<Vec<InsertionStep>, StructuralError> {
        let chain = &self.plan.chain;
        let expected = self.expected_order();
        if order != expected.as_slice() {
            return Err(StructuralError::InsertionOrder {
                sheet: chain.sheet.clone(),
                expected: chain.ids(&expected),
                found: chain.ids(order),
            });
        }

        let mut tracker = RowTracker::new();
        let mut steps = Vec::new();
        for pass in 0..self.plan.passes() {
            for &index in order {
                if pass >= self.plan.extra_records(index) {
                    continue;
                }
                let step = self.extend(sheet, &mut tracker, index, pass)?;
                observer(&step);
                steps.push(step);
            }
        }

        log::debug!(
            "{}: {} duplication(s), {} row(s) inserted",
            chain.sheet,
            steps.len(),
            tracker.inserted()
        );
        Ok(steps)
    }

    fn extend(
        &self,
        sheet: &mut Sheet,
        tracker: &mut RowTracker,
        index: usize,
        pass: u32,
    ) -> Result<InsertionStep, StructuralError> {
        let section = self.plan.section(index);
        let stride = section.stride;

        // The newest copy of the template is the row to duplicate.
        let template_row = section.header_row + section.template_record * stride;
        let source_row = tracker.current(template_row) + pass * stride;

        let start = tracker.current(section.header_row);
        let end = tracker.current(section.summary_row());
        if source_row < start || source_row + stride > end {
            return Err(StructuralError::TemplateDrift {
                sheet: sheet.name.clone(),
                section: section.id.clone(),
                row: source_row,
                start,
                end,
            });
        }

        let rows_before = sheet.row_count();
        sheet.duplicate_rows(source_row - 1, stride, 1)?;
        let expected = rows_before.max(source_row - 1 + stride) + stride;
        let actual = sheet.row_count();
        if actual != expected {
            return Err(StructuralError::UnexpectedRowCount {
                sheet: sheet.name.clone(),
                section: section.id.clone(),
                expected,
                actual,
            });
        }
        tracker.record(source_row + stride, stride);

        log::debug!(
            "{}: pass {} section {} copied row {} ({} row(s))",
            sheet.name,
            pass + 1,
            section.id,
            source_row,
            stride
        );
        Ok(InsertionStep {
            sheet: sheet.name.clone(),
            section: section.id.clone(),
            pass,
            source_row,
            rows: stride,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChainConfig, SectionConfig};
    use crate::section::SectionChain;
    use engine::CellValue;

    fn small_chain() -> SectionChain {
        // Two sections of 3 records each, 1 trailer row apiece.
        SectionChain::from_config(&ChainConfig {
            sheet: "Data".to_string(),
            sections: vec![
                SectionConfig {
                    capacity: 3,
                    ..SectionConfig::new("X", 2)
                },
                SectionConfig {
                    capacity: 3,
                    trailer_rows: 1,
                    ..SectionConfig::new("Y", 6)
                },
            ],
        })
        .unwrap()
    }

    fn small_sheet() -> Sheet {
        let mut sheet = Sheet::new("Data");
        sheet.set_value(0, 0, CellValue::Text("head".to_string()));
        for row in [2u32, 3, 4, 6, 7, 8] {
            sheet.set_value(row - 1, 0, CellValue::Number(row as f64));
            sheet.set_formula(row - 1, 1, &format!("=A{}*2", row));
        }
        sheet.set_formula(4, 2, "=SUM(A2:A4)");
        sheet.set_formula(8, 2, "=SUM(A6:A8)");
        sheet
    }

    #[test]
    fn tracker_replays_insertions() {
        let mut tracker = RowTracker::new();
        tracker.record(10, 2);
        tracker.record(5, 1);
        assert_eq!(tracker.current(4), 4);
        assert_eq!(tracker.current(7), 8);
        assert_eq!(tracker.current(10), 13);
        assert_eq!(tracker.inserted(), 3);
    }

    #[test]
    fn extends_bottom_up() {
        let chain = small_chain();
        let plan = RowShiftPlan::compute(&chain, 5, 100).unwrap();
        let mut sheet = small_sheet();
        let rows_before = sheet.row_count();

        let mut seen = Vec::new();
        let steps = SectionInserter::new(&plan)
            .run(&mut sheet, &[1, 0], &mut |step| seen.push(step.section.clone()))
            .unwrap();

        assert_eq!(seen, vec!["Y", "X", "Y", "X"]);
        assert_eq!(steps[0].source_row, 8);
        assert_eq!(steps[1].source_row, 4);
        assert_eq!(steps[2].source_row, 10);
        assert_eq!(steps[3].source_row, 5);
        assert_eq!(sheet.row_count(), rows_before + 4);

        // X now spans rows 2..=6, its total sits on row 7; Y spans 8..=12.
        assert_eq!(sheet.formula(5, 1), Some("=A6*2"));
        assert_eq!(sheet.value(5, 0), Some(&CellValue::Number(4.0)));
        assert_eq!(sheet.formula(11, 1), Some("=A12*2"));
        assert_eq!(sheet.value(12, 0), None);
        assert_eq!(plan.section_start(1), 8);
    }

    #[test]
    fn rejects_top_down_order() {
        let chain = small_chain();
        let plan = RowShiftPlan::compute(&chain, 4, 100).unwrap();
        let mut sheet = small_sheet();
        let err = SectionInserter::new(&plan)
            .run(&mut sheet, &[0, 1], &mut |_| {})
            .unwrap_err();
        assert!(matches!(err, StructuralError::InsertionOrder { .. }));
        assert_eq!(sheet.formula(5, 1), Some("=A6*2"));
    }

    #[test]
    fn multi_row_records_copy_whole_blocks() {
        let chain = SectionChain::from_config(&ChainConfig {
            sheet: "Pairs".to_string(),
            sections: vec![SectionConfig {
                capacity: 2,
                trailer_rows: 1,
                ..SectionConfig::new("P", 1).with_stride(2)
            }],
        })
        .unwrap();
        let plan = RowShiftPlan::compute(&chain, 3, 100).unwrap();
        let mut sheet = Sheet::new("Pairs");
        for row in 0..4 {
            sheet.set_value(row, 0, CellValue::Number(row as f64));
        }
        sheet.set_formula(4, 0, "=SUM(A1:A4)");

        SectionInserter::new(&plan)
            .run(&mut sheet, &[0], &mut |_| {})
            .unwrap();
        assert_eq!(sheet.value(4, 0), Some(&CellValue::Number(2.0)));
        assert_eq!(sheet.value(5, 0), Some(&CellValue::Number(3.0)));
        assert_eq!(sheet.formula(6, 0), Some("=SUM(A1:A4)"));
    }
}
