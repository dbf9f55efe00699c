//! FILENAME: core/layout-engine/src/reconcile.rs
//! PURPOSE: Repairs formulas after the section chains have been reshaped.
//! CONTEXT: The insertion primitive only knows about its own sheet and
//! copies template formulas with plain fill semantics. That is right for
//! references inside one record, and wrong for:
//! - references into another section (running chains, sublease formulas),
//! - totals over a whole section and references to trailer rows,
//! - references from other sheets into a reshaped sheet.
//!
//! `capture` runs on the untouched template and records every such formula
//! with its references classified into anchors. `apply` runs after the
//! insertion and rebuilds those formulas from their AST, resolving every
//! anchor against the plan. Sequence columns are renumbered last.

use crate::anchor::{classify, resolve, survives_insertion, RecordIndex, RowAnchor};
use crate::plan::{RowShiftPlan, WorkbookPlan};
use crate::report::{GapReason, ReconcileReport, ReconciliationGap};
use crate::section::RowSlot;
use engine::{coord_to_a1, CellValue, Workbook};
use parser::{
    function_names, parse, referenced_sheets, row_refs, to_formula, visit_row_refs_mut, Expression,
    RefPosition, RowRefSite,
};

/// Functions whose targets are computed at run time.
const VOLATILE_REFERENCE_FUNCTIONS: &[&str] = &["OFFSET", "INDIRECT"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaFamily {
    CrossSection,
    Aggregate,
    CrossSheet,
}

/// A reference anchor plus the plan it resolves against.
#[derive(Debug, Clone, Copy, PartialEq)]
struct AnchoredRef {
    plan: Option<usize>,
    anchor: RowAnchor,
}

#[derive(Debug, Clone)]
struct CapturedFormula {
    sheet: String,
    /// 1-based template row and 0-based column.
    row: u32,
    col: u32,
    home_plan: Option<usize>,
    home: RowSlot,
    expr: Expression,
    refs: Vec<AnchoredRef>,
    family: FormulaFamily,
}

/// Formulas taken from the template before any rows move.
#[derive(Debug, Clone, Default)]
pub struct FormulaSnapshot {
    formulas: Vec<CapturedFormula>,
    gaps: Vec<ReconciliationGap>,
}

impl FormulaSnapshot {
    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    pub fn gaps(&self) -> &[ReconciliationGap] {
        &self.gaps
    }
}

pub struct Reconciler<'a> {
    plan: &'a WorkbookPlan,
}

impl<'a> Reconciler<'a> {
    pub fn new(plan: &'a WorkbookPlan) -> Self {
        Reconciler { plan }
    }

    /// Index of the plan reshaping `sheet`, if any.
    fn reshaping(&self, sheet: &str) -> Option<usize> {
        self.plan.plans.iter().position(|p| {
            !p.is_noop() && p.chain.sheet.to_lowercase() == sheet.to_lowercase()
        })
    }

    fn plan_at(&self, index: Option<usize>) -> Option<&RowShiftPlan> {
        index.and_then(|i| self.plan.plans.get(i))
    }

    // ========================================================================
    // CAPTURE
    // ========================================================================

    /// Scans every formula of the untouched workbook.
    pub fn capture(&self, workbook: &Workbook) -> FormulaSnapshot {
        let mut snapshot = FormulaSnapshot::default();
        if self.plan.is_noop() {
            return snapshot;
        }
        let reshaped_names: Vec<String> = self
            .plan
            .reshaping()
            .map(|p| p.chain.sheet.to_lowercase())
            .collect();

        for sheet in &workbook.sheets {
            let home_plan = self.reshaping(&sheet.name);
            for (row0, col) in sheet.grid.formula_coords() {
                let Some(text) = sheet.formula(row0, col) else {
                    continue;
                };
                let row = row0 + 1;
                let home = match self.plan_at(home_plan) {
                    Some(plan) => plan.chain.locate(row),
                    None => RowSlot::Above,
                };
                let expr = match parse(text) {
                    Ok(expr) => expr,
                    Err(e) => {
                        let lower = text.to_lowercase();
                        if home_plan.is_some()
                            || reshaped_names.iter().any(|name| lower.contains(name.as_str()))
                        {
                            snapshot.gaps.push(self.gap(
                                &sheet.name,
                                home_plan,
                                row,
                                col,
                                text,
                                GapReason::Unparseable { message: e.to_string() },
                            ));
                        }
                        continue;
                    }
                };

                let touches_reshaped = home_plan.is_some()
                    || referenced_sheets(&expr)
                        .iter()
                        .any(|name| self.reshaping(name).is_some());

                match self.classify_formula(&sheet.name, home_plan, home, &expr) {
                    Ok(Some((refs, family))) => snapshot.formulas.push(CapturedFormula {
                        sheet: sheet.name.clone(),
                        row,
                        col,
                        home_plan,
                        home,
                        expr,
                        refs,
                        family,
                    }),
                    Ok(None) => {}
                    Err(reason) => {
                        if touches_reshaped {
                            snapshot
                                .gaps
                                .push(self.gap(&sheet.name, home_plan, row, col, text, reason));
                        }
                    }
                }
            }
        }

        for gap in &snapshot.gaps {
            log::warn!(
                "{}!{}: formula {} left as is ({:?})",
                gap.sheet,
                gap.cell,
                gap.formula,
                gap.reason
            );
        }
        log::info!(
            "captured {} formula(s) to rebuild, {} gap(s)",
            snapshot.formulas.len(),
            snapshot.gaps.len()
        );
        snapshot
    }

    /// Anchors every reference of a formula. `Ok(None)` means the insertion
    /// primitive alone keeps it correct.
    fn classify_formula(
        &self,
        home_sheet: &str,
        home_plan: Option<usize>,
        home: RowSlot,
        expr: &Expression,
    ) -> Result<Option<(Vec<AnchoredRef>, FormulaFamily)>, GapReason> {
        let refs = row_refs(expr);
        let touches = |site_sheet: &Option<String>| {
            self.reshaping(site_sheet.as_deref().unwrap_or(home_sheet)).is_some()
        };
        if refs.iter().any(|(site, _)| touches(&site.sheet)) || home_plan.is_some() {
            if let Some(name) = function_names(expr)
                .into_iter()
                .find(|name| VOLATILE_REFERENCE_FUNCTIONS.contains(&name.as_str()))
            {
                return Err(GapReason::VolatileFunction { name });
            }
        }

        let mut anchored = Vec::with_capacity(refs.len());
        let mut stable = true;
        let mut family = FormulaFamily::CrossSection;
        if matches!(home, RowSlot::Trailer { .. }) {
            family = FormulaFamily::Aggregate;
        }
        for (i, (site, row)) in refs.iter().enumerate() {
            let target_name = site.sheet.as_deref().unwrap_or(home_sheet);
            let target_plan = self.reshaping(target_name);
            let Some(plan) = self.plan_at(target_plan) else {
                anchored.push(AnchoredRef {
                    plan: None,
                    anchor: RowAnchor::Fixed(*row),
                });
                continue;
            };
            if matches!(site.position, RefPosition::RowSpanStart | RefPosition::RowSpanEnd) {
                return Err(GapReason::WholeRowReference);
            }
            let same_sheet = target_plan == home_plan;
            let anchor = classify(site, *row, range_partner(&refs, i), home, same_sheet, &plan.chain);
            if !survives_insertion(&anchor, same_sheet, home, &plan.chain) {
                stable = false;
                family = match (family, same_sheet, anchor) {
                    (_, false, _) | (FormulaFamily::CrossSheet, _, _) => FormulaFamily::CrossSheet,
                    (
                        _,
                        true,
                        RowAnchor::Trailer { .. }
                        | RowAnchor::Record {
                            index: RecordIndex::First | RecordIndex::Last,
                            ..
                        },
                    ) => FormulaFamily::Aggregate,
                    (current, _, _) => current,
                };
            }
            anchored.push(AnchoredRef {
                plan: target_plan,
                anchor,
            });
        }

        if stable {
            Ok(None)
        } else {
            Ok(Some((anchored, family)))
        }
    }

    fn gap(
        &self,
        sheet: &str,
        home_plan: Option<usize>,
        row: u32,
        col: u32,
        formula: &str,
        reason: GapReason,
    ) -> ReconciliationGap {
        let final_row = self
            .plan_at(home_plan)
            .map(|plan| plan.map_original_row(row))
            .unwrap_or(row);
        ReconciliationGap {
            sheet: sheet.to_string(),
            cell: coord_to_a1((final_row - 1, col)),
            formula: formula.to_string(),
            reason,
        }
    }

    // ========================================================================
    // APPLY
    // ========================================================================

    /// Rebuilds captured formulas on the reshaped workbook and renumbers the
    /// sequence columns.
    pub fn apply(&self, workbook: &mut Workbook, snapshot: FormulaSnapshot) -> ReconcileReport {
        let mut report = ReconcileReport {
            gaps: snapshot.gaps,
            ..ReconcileReport::default()
        };
        if self.plan.is_noop() {
            return report;
        }

        for captured in &snapshot.formulas {
            let Some(sheet) = workbook.sheet_mut(&captured.sheet) else {
                log::warn!("sheet '{}' vanished before reconciliation", captured.sheet);
                continue;
            };
            for (row, own_record) in self.instances(captured) {
                let mut expr = captured.expr.clone();
                let mut refs = captured.refs.iter();
                visit_row_refs_mut(&mut expr, &mut |_, target| {
                    if let Some(anchored) = refs.next() {
                        if let Some(resolved) =
                            resolve(&anchored.anchor, self.plan_at(anchored.plan), own_record)
                        {
                            *target = resolved;
                        }
                    }
                });
                sheet.set_formula(row - 1, captured.col, &to_formula(&expr));
                match captured.family {
                    FormulaFamily::CrossSection => report.cross_section += 1,
                    FormulaFamily::Aggregate => report.aggregates += 1,
                    FormulaFamily::CrossSheet => report.cross_sheet += 1,
                }
            }
        }

        for plan in self.plan.reshaping() {
            let Some(sheet) = workbook.sheet_mut(plan.sheet()) else {
                continue;
            };
            for (index, section) in plan.chain.sections.iter().enumerate() {
                let Some((col, every_row)) = section.sequence else {
                    continue;
                };
                let start = plan.section_start(index);
                let (count, step) = if every_row {
                    (plan.data_row_count(index), 1)
                } else {
                    (plan.record_count(index), section.stride)
                };
                for n in 0..count {
                    let row = start + n * step;
                    sheet.set_value(row - 1, col, CellValue::Number((n + 1) as f64));
                }
                report.sequence_cells += count;
            }
        }

        log::info!(
            "reconciled {} cross-section, {} aggregate, {} cross-sheet formula cell(s); {} sequence cell(s)",
            report.cross_section,
            report.aggregates,
            report.cross_sheet,
            report.sequence_cells
        );
        report
    }

    /// Final rows a captured formula occupies, with the record index each
    /// copy stands for. The template record also stands for every copy.
    fn instances(&self, captured: &CapturedFormula) -> Vec<(u32, Option<u32>)> {
        let Some(plan) = self.plan_at(captured.home_plan) else {
            return vec![(captured.row, None)];
        };
        match captured.home {
            RowSlot::Above => vec![(captured.row, None)],
            RowSlot::Trailer { section, offset } => vec![(plan.trailer_row(section, offset), None)],
            RowSlot::Below { offset } => vec![(plan.below_row(offset), None)],
            RowSlot::Record {
                section,
                record,
                phase,
            } => {
                let remapped = plan.remap_record(section, record);
                let mut rows = vec![(plan.record_row(section, remapped, phase), Some(remapped))];
                if record == plan.section(section).template_record {
                    for copy in 1..=plan.extra_records(section) {
                        let k = record + copy;
                        rows.push((plan.record_row(section, k, phase), Some(k)));
                    }
                }
                rows
            }
        }
    }
}

/// Row of the other bound when `refs[i]` opens or closes a range.
fn range_partner(refs: &[(RowRefSite, u32)], i: usize) -> Option<u32> {
    let (site, _) = refs.get(i)?;
    if !site.position.is_range_bound() {
        return None;
    }
    let (other, row) = match site.position {
        RefPosition::RangeStart | RefPosition::RowSpanStart => refs.get(i + 1)?,
        _ => refs.get(i.checked_sub(1)?)?,
    };
    let paired = matches!(
        (site.position, other.position),
        (RefPosition::RangeStart, RefPosition::RangeEnd)
            | (RefPosition::RangeEnd, RefPosition::RangeStart)
            | (RefPosition::RowSpanStart, RefPosition::RowSpanEnd)
            | (RefPosition::RowSpanEnd, RefPosition::RowSpanStart)
    );
    paired.then_some(*row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChainConfig, SectionConfig};
    use crate::insertion::SectionInserter;
    use crate::section::SectionChain;
    use engine::Sheet;

    /// Two 3-record sections on "Data", a running total in X's trailer
    /// and a summary sheet pointing into both.
    fn fixture() -> (Workbook, WorkbookPlan) {
        let chain = SectionChain::from_config(&ChainConfig {
            sheet: "Data".to_string(),
            sections: vec![
                SectionConfig {
                    capacity: 3,
                    ..SectionConfig::new("X", 2).with_sequence("A", false)
                },
                SectionConfig {
                    capacity: 3,
                    trailer_rows: 1,
                    ..SectionConfig::new("Y", 6).with_sequence("A", false)
                },
            ],
        })
        .unwrap();

        let mut data = Sheet::new("Data");
        data.set_value(0, 1, CellValue::Text("rate".to_string()));
        for k in 0..3u32 {
            let x = 2 + k;
            let y = 6 + k;
            data.set_value(x - 1, 0, CellValue::Number((k + 1) as f64));
            data.set_value(y - 1, 0, CellValue::Number((k + 1) as f64));
            data.set_formula(x - 1, 2, &format!("=B{}*2", x));
            data.set_formula(y - 1, 1, &format!("=B{}", x));
            data.set_formula(x - 1, 4, &format!("=SUM(B{}:C{})", x, x));
            data.set_formula(y - 1, 4, &format!("=SUM(B{}:C{})", y, y));
        }
        data.set_formula(4, 1, "=SUM(B2:B4)");
        data.set_formula(8, 1, "=SUM(B6:B8)+B5");
        data.set_formula(8, 2, "=OFFSET(B6,1,0)");
        data.set_formula(8, 3, "=SUM(2:3)");

        let mut summary = Sheet::new("Summary");
        summary.set_formula(0, 0, "=Data!B9");
        summary.set_formula(1, 0, "=SUM(Data!B2:B4)");
        summary.set_formula(2, 0, "=B1+1");

        let mut workbook = Workbook::new();
        workbook.add_sheet(data);
        workbook.add_sheet(summary);
        let plan = RowShiftPlan::compute(&chain, 5, 100).unwrap();
        (workbook, WorkbookPlan { plans: vec![plan] })
    }

    fn reshape(workbook: &mut Workbook, plan: &WorkbookPlan) -> ReconcileReport {
        let reconciler = Reconciler::new(plan);
        let snapshot = reconciler.capture(workbook);
        reconciler_reshape(&reconciler, workbook, plan, snapshot)
    }

    fn reconciler_reshape(
        reconciler: &Reconciler,
        workbook: &mut Workbook,
        plan: &WorkbookPlan,
        snapshot: FormulaSnapshot,
    ) -> ReconcileReport {
        let data_plan = &plan.plans[0];
        let sheet = workbook.sheet_mut("Data").unwrap();
        SectionInserter::new(data_plan)
            .run(sheet, &data_plan.chain.reverse_order(), &mut |_| {})
            .unwrap();
        reconciler.apply(workbook, snapshot)
    }

    #[test]
    fn rebuilds_cross_section_references_for_every_record() {
        let (mut workbook, plan) = fixture();
        let report = reshape(&mut workbook, &plan);

        // X spans rows 2..=6, Y spans rows 8..=12.
        let data = workbook.sheet("Data").unwrap();
        for k in 0..5u32 {
            assert_eq!(
                data.formula(8 + k - 1, 1),
                Some(format!("=B{}", 2 + k).as_str()),
                "record {}",
                k
            );
        }
        assert!(report.cross_section >= 5);
    }

    #[test]
    fn totals_cover_the_grown_section() {
        let (mut workbook, plan) = fixture();
        reshape(&mut workbook, &plan);
        let data = workbook.sheet("Data").unwrap();
        assert_eq!(data.formula(6, 1), Some("=SUM(B2:B6)"));
        assert_eq!(data.formula(12, 1), Some("=SUM(B8:B12)+B7"));
    }

    #[test]
    fn other_sheets_follow_the_reshape() {
        let (mut workbook, plan) = fixture();
        let report = reshape(&mut workbook, &plan);
        let summary = workbook.sheet("Summary").unwrap();
        assert_eq!(summary.formula(0, 0), Some("=Data!B13"));
        assert_eq!(summary.formula(1, 0), Some("=SUM(Data!B2:B6)"));
        assert_eq!(summary.formula(2, 0), Some("=B1+1"));
        assert_eq!(report.cross_sheet, 2);
    }

    #[test]
    fn local_formulas_keep_fill_semantics() {
        let (mut workbook, plan) = fixture();
        reshape(&mut workbook, &plan);
        let data = workbook.sheet("Data").unwrap();
        for row in 2..=6u32 {
            assert_eq!(data.formula(row - 1, 2), Some(format!("=B{}*2", row).as_str()));
        }
    }

    #[test]
    fn ranges_within_one_record_stay_on_that_record() {
        let (workbook, plan) = fixture();
        let reconciler = Reconciler::new(&plan);
        let snapshot = reconciler.capture(&workbook);
        assert!(snapshot.formulas.iter().all(|f| f.col != 4));

        let mut workbook = workbook;
        reconciler_reshape(&reconciler, &mut workbook, &plan, snapshot);
        let data = workbook.sheet("Data").unwrap();
        for row in (2..=6u32).chain(8..=12) {
            assert_eq!(
                data.formula(row - 1, 4),
                Some(format!("=SUM(B{}:C{})", row, row).as_str()),
                "row {}",
                row
            );
        }
        assert_eq!(data.formula(6, 1), Some("=SUM(B2:B6)"));
    }

    #[test]
    fn partners_pair_range_bounds_only() {
        let expr = parse("=SUM(B4:C4)+B2").unwrap();
        let refs = row_refs(&expr);
        assert_eq!(range_partner(&refs, 0), Some(4));
        assert_eq!(range_partner(&refs, 1), Some(4));
        assert_eq!(range_partner(&refs, 2), None);
    }

    #[test]
    fn renumbers_sequences() {
        let (mut workbook, plan) = fixture();
        let report = reshape(&mut workbook, &plan);
        let data = workbook.sheet("Data").unwrap();
        for k in 0..5u32 {
            assert_eq!(data.value(1 + k, 0), Some(&CellValue::Number((k + 1) as f64)));
            assert_eq!(data.value(7 + k, 0), Some(&CellValue::Number((k + 1) as f64)));
        }
        assert_eq!(report.sequence_cells, 10);
    }

    #[test]
    fn volatile_and_whole_row_formulas_are_gaps() {
        let (mut workbook, plan) = fixture();
        let report = reshape(&mut workbook, &plan);
        let reasons: Vec<&GapReason> = report.gaps.iter().map(|g| &g.reason).collect();
        assert!(reasons.contains(&&GapReason::VolatileFunction {
            name: "OFFSET".to_string()
        }));
        assert!(reasons.contains(&&GapReason::WholeRowReference));
        let offset = report
            .gaps
            .iter()
            .find(|g| g.formula.starts_with("=OFFSET"))
            .unwrap();
        assert_eq!(offset.cell, "C13");
    }

    #[test]
    fn nothing_happens_without_growth() {
        let (mut workbook, _) = fixture();
        let chain = SectionChain::from_config(&ChainConfig {
            sheet: "Data".to_string(),
            sections: vec![SectionConfig {
                capacity: 3,
                ..SectionConfig::new("X", 2)
            }],
        })
        .unwrap();
        let plan = WorkbookPlan {
            plans: vec![RowShiftPlan::compute(&chain, 3, 100).unwrap()],
        };
        let reconciler = Reconciler::new(&plan);
        let snapshot = reconciler.capture(&workbook);
        assert!(snapshot.is_empty());
        let report = reconciler.apply(&mut workbook, snapshot);
        assert_eq!(report, ReconcileReport::default());
        assert_eq!(workbook.sheet("Data").unwrap().formula(4, 1), Some("=SUM(B2:B4)"));
    }
}
