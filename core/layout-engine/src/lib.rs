//! FILENAME: core/layout-engine/src/lib.rs
//! PURPOSE: Grows a rental-statement workbook to fit a batch of properties
//! and writes the properties into it.
//! CONTEXT: The template holds five stacked sections of 20 rows each, plus
//! mirrored blocks on auxiliary sheets. A batch with more properties needs
//! every section extended, every section below moved, every formula that
//! crosses a section boundary repaired, and only then the data written.
//!
//! PIPELINE: Records --> RowShiftPlan --> SectionInserter --> Reconciler --> RecordPlacer
//!           --> PurchaseWriter / TransferWriter --> DepreciationExport --> Workbook

pub mod anchor;
pub mod config;
pub mod error;
pub mod export;
pub mod insertion;
pub mod pipeline;
pub mod placement;
pub mod plan;
pub mod purchase;
pub mod reconcile;
pub mod record;
pub mod report;
pub mod section;
pub mod transfer;

pub use anchor::{RecordIndex, RowAnchor};
pub use config::{
    ChainConfig, ExpenseSection, ExportConfig, LayoutConfig, PrimaryConfig, PurchaseConfig, RegistryConfig,
    SectionConfig, SequenceConfig, SettlementConfig, TransferConfig, DEFAULT_MAX_RECORDS, DEPRECIATION_EXPORT_SHEET,
    DEPRECIATION_SHEET, INCOME_SHEET, INTEREST_SHEET, NEW_PROPERTY_SHEET, USEFUL_LIFE_SHEET,
};
pub use error::{LayoutError, LayoutResult, StructuralError};
pub use export::{DepreciationExport, ExportReport};
pub use insertion::{InsertionStep, RowTracker, SectionInserter};
pub use pipeline::{plan_workbook, run_batch, BatchPhase, BatchStateMachine, NoProgress, ProgressSink};
pub use placement::{normalize_name, RecordPlacer, RegistrySlot};
pub use plan::{PlanSummary, RowShiftPlan, SectionShift, SectionSummary, WorkbookPlan};
pub use purchase::PurchaseWriter;
pub use reconcile::{FormulaFamily, FormulaSnapshot, Reconciler};
pub use record::{
    BatchInput, ExtractionError, Months, PropertyRecord, PurchaseCosts, SettlementRecord, SourceDocument, TransferRecord,
};
pub use report::{BatchReport, GapReason, PlacementStatus, PropertyResult, ReconcileReport, ReconciliationGap};
pub use section::{RowSlot, Section, SectionChain};
pub use transfer::{date_serial, TransferWriter};
