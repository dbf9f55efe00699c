//! FILENAME: core/layout-engine/src/pipeline.rs
//! PURPOSE: Runs one batch: plan, grow sections, repair formulas, place,
//! then write transfers, cost blocks and the depreciation export.
//! CONTEXT: The batch works on a scratch copy of the workbook. The caller's
//! workbook is replaced only when every phase succeeded, so a fatal error
//! never leaves a half-reshaped template behind.
//!
//! PHASES: Planned --> Inserting(pass, section)* --> Inserted --> Reconciling --> Placing
//!         --> Supplementing --> Done

use crate::config::LayoutConfig;
use crate::error::{LayoutError, StructuralError};
use crate::export::{DepreciationExport, ExportReport};
use crate::insertion::SectionInserter;
use crate::placement::RecordPlacer;
use crate::plan::{RowShiftPlan, WorkbookPlan};
use crate::purchase::PurchaseWriter;
use crate::reconcile::Reconciler;
use crate::record::BatchInput;
use crate::report::BatchReport;
use crate::section::SectionChain;
use crate::transfer::TransferWriter;
use engine::Workbook;
use serde::Serialize;
use std::fmt;

/// Receives coarse progress for polling callers.
pub trait ProgressSink {
    fn checkpoint(&mut self, percent: u8, step: &str);
}

/// Discards progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn checkpoint(&mut self, _percent: u8, _step: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum BatchPhase {
    Planned,
    Inserting {
        sheet: String,
        section: String,
        pass: u32,
    },
    Inserted,
    Reconciling,
    Placing,
    Supplementing,
    Done,
}

impl fmt::Display for BatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchPhase::Planned => write!(f, "planned"),
            BatchPhase::Inserting {
                sheet,
                section,
                pass,
            } => write!(f, "inserting (pass {}, section {} on '{}')", pass + 1, section, sheet),
            BatchPhase::Inserted => write!(f, "inserted"),
            BatchPhase::Reconciling => write!(f, "reconciling"),
            BatchPhase::Placing => write!(f, "placing"),
            BatchPhase::Supplementing => write!(f, "writing transfers and exports"),
            BatchPhase::Done => write!(f, "done"),
        }
    }
}

/// Enforces the phase order of a batch.
#[derive(Debug, Default)]
pub struct BatchStateMachine {
    phase: Option<BatchPhase>,
}

impl BatchStateMachine {
    pub fn new() -> Self {
        BatchStateMachine::default()
    }

    pub fn phase(&self) -> Option<&BatchPhase> {
        self.phase.as_ref()
    }

    pub fn advance(&mut self, next: BatchPhase) -> Result<(), LayoutError> {
        use BatchPhase::*;
        let allowed = matches!(
            (&self.phase, &next),
            (None, Planned)
                | (Some(Planned), Inserting { .. } | Inserted)
                | (Some(Inserting { .. }), Inserting { .. } | Inserted)
                | (Some(Inserted), Reconciling)
                | (Some(Reconciling), Placing)
                | (Some(Placing), Supplementing)
                | (Some(Supplementing), Done)
        );
        if !allowed {
            return Err(LayoutError::PhaseOrder {
                from: self
                    .phase
                    .as_ref()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "start".to_string()),
                to: next.to_string(),
            });
        }
        if !matches!(next, Inserting { .. }) {
            log::info!("batch phase: {}", next);
        }
        self.phase = Some(next);
        Ok(())
    }
}

/// Plans every configured chain for `total_count` records.
pub fn plan_workbook(workbook: &Workbook, config: &LayoutConfig, total_count: u32) -> Result<WorkbookPlan, LayoutError> {
    let mut plans = Vec::new();
    for chain_config in config.chains() {
        let chain = SectionChain::from_config(chain_config)?;
        let plan = RowShiftPlan::compute(&chain, total_count, config.max_records)?;
        let sheet = workbook
            .sheet(&chain.sheet)
            .ok_or_else(|| StructuralError::MissingSheet(chain.sheet.clone()))?;
        chain.verify_present(sheet)?;
        log::debug!(
            "{}: {} record(s), {} row(s) to insert",
            chain.sheet,
            total_count,
            plan.total_inserted()
        );
        plans.push(plan);
    }
    Ok(WorkbookPlan { plans })
}

/// Runs a whole batch against `workbook`.
pub fn run_batch(
    workbook: &mut Workbook,
    input: &BatchInput,
    config: &LayoutConfig,
    progress: &mut dyn ProgressSink,
) -> Result<BatchReport, LayoutError> {
    config.validate()?;
    let mut machine = BatchStateMachine::new();

    progress.checkpoint(5, "checking records");
    let (records, extraction_errors) = input.partition();
    for error in &extraction_errors {
        log::warn!("{}: {}", error.source, error.message);
    }
    let unknown = input.unclassified_items(&config.item_mapping);
    if !unknown.is_empty() {
        return Err(LayoutError::UnclassifiedItems(unknown));
    }

    let total = (records.len() + input.settlements.len()) as u32;
    let plan = plan_workbook(workbook, config, total)?;
    machine.advance(BatchPhase::Planned)?;
    progress.checkpoint(10, "planned row shifts");

    let mut scratch = workbook.clone();
    let reconciler = Reconciler::new(&plan);
    let snapshot = reconciler.capture(&scratch);

    let total_steps: u32 = plan
        .reshaping()
        .flat_map(|p| p.shifts.iter().map(|s| s.extra_records))
        .sum();
    let mut done_steps = 0u32;
    for sheet_plan in plan.reshaping() {
        let sheet = scratch
            .sheet_mut(sheet_plan.sheet())
            .ok_or_else(|| StructuralError::MissingSheet(sheet_plan.sheet().to_string()))?;
        let inserter = SectionInserter::new(sheet_plan);
        let order = inserter.expected_order();
        let mut phase_error = None;
        inserter.run(sheet, &order, &mut |step| {
            let next = BatchPhase::Inserting {
                sheet: step.sheet.clone(),
                section: step.section.clone(),
                pass: step.pass,
            };
            if let Err(e) = machine.advance(next) {
                phase_error.get_or_insert(e);
            }
            done_steps += 1;
            let percent = 10 + 40 * done_steps / total_steps.max(1);
            progress.checkpoint(percent as u8, &format!("extending {} / {}", step.sheet, step.section));
        })?;
        if let Some(e) = phase_error {
            return Err(e);
        }
    }
    machine.advance(BatchPhase::Inserted)?;
    progress.checkpoint(50, "sections extended");

    machine.advance(BatchPhase::Reconciling)?;
    let reconciliation = reconciler.apply(&mut scratch, snapshot);
    progress.checkpoint(60, "formulas reconciled");

    machine.advance(BatchPhase::Placing)?;
    let placer = RecordPlacer::new(config, &plan)?;
    let results = placer.place(&mut scratch, &records, &input.settlements, &mut |placed, of| {
        let percent = 60 + 35 * placed / of.max(1);
        progress.checkpoint(percent as u8, &format!("placed {}/{}", placed, of));
    })?;

    machine.advance(BatchPhase::Supplementing)?;
    let purchases = match PurchaseWriter::new(config) {
        Some(writer) => writer.write(&mut scratch, &input.settlements)?,
        None => Vec::new(),
    };
    let transfers = TransferWriter::new(config, &plan)?.write(&mut scratch, &input.transfers)?;
    progress.checkpoint(97, "transfers written");
    let export = match DepreciationExport::new(config, &plan)? {
        Some(export) => export.run(&mut scratch)?,
        None => ExportReport::default(),
    };

    machine.advance(BatchPhase::Done)?;
    *workbook = scratch;
    progress.checkpoint(100, "done");

    let extra_rows = plan
        .get(&config.primary.chain.sheet)
        .map(|p| p.extra_records(0))
        .unwrap_or(0);
    let report = BatchReport {
        record_count: total,
        extra_rows,
        plans: plan.summaries(),
        results,
        extraction_errors,
        reconciliation,
        transfers,
        purchases,
        export,
    };
    log::info!(
        "batch done: {} placed, {} failed, {} extraction error(s), {} gap(s), {} transfer(s), {} export line(s)",
        report.succeeded(),
        report.failed(),
        report.extraction_errors.len(),
        report.reconciliation.gaps.len(),
        report.transfers.iter().filter(|r| r.is_success()).count(),
        report.export.rows
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_follow_the_documented_order() {
        let mut machine = BatchStateMachine::new();
        machine.advance(BatchPhase::Planned).unwrap();
        machine
            .advance(BatchPhase::Inserting {
                sheet: "S".to_string(),
                section: "E".to_string(),
                pass: 0,
            })
            .unwrap();
        machine.advance(BatchPhase::Inserted).unwrap();
        machine.advance(BatchPhase::Reconciling).unwrap();
        machine.advance(BatchPhase::Placing).unwrap();
        machine.advance(BatchPhase::Supplementing).unwrap();
        machine.advance(BatchPhase::Done).unwrap();
        assert_eq!(machine.phase(), Some(&BatchPhase::Done));
    }

    #[test]
    fn insertion_may_be_skipped() {
        let mut machine = BatchStateMachine::new();
        machine.advance(BatchPhase::Planned).unwrap();
        assert!(machine.advance(BatchPhase::Inserted).is_ok());
    }

    #[test]
    fn placing_before_reconciling_is_rejected() {
        let mut machine = BatchStateMachine::new();
        machine.advance(BatchPhase::Planned).unwrap();
        machine.advance(BatchPhase::Inserted).unwrap();
        let err = machine.advance(BatchPhase::Placing).unwrap_err();
        assert_eq!(
            err,
            LayoutError::PhaseOrder {
                from: "inserted".to_string(),
                to: "placing".to_string()
            }
        );
        assert!(BatchStateMachine::new().advance(BatchPhase::Done).is_err());

        machine.advance(BatchPhase::Reconciling).unwrap();
        machine.advance(BatchPhase::Placing).unwrap();
        assert!(machine.advance(BatchPhase::Done).is_err());
    }
}
