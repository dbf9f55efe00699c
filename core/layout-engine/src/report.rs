//! FILENAME: core/layout-engine/src/report.rs
//! PURPOSE: What a batch tells its caller.
//! CONTEXT: Successful placements, per-property failures, extraction
//! failures and reconciliation gaps are reported side by side so the user
//! sees both what was written and what needs a manual look. Transfers and
//! cost blocks are listed apart from the statement placements.

use crate::export::ExportReport;
use crate::plan::PlanSummary;
use crate::record::ExtractionError;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertyResult {
    pub property_name: Option<String>,
    pub status: PlacementStatus,
    pub message: String,
    /// Section id → 1-based row the record was written to.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rows: BTreeMap<String, u32>,
}

impl PropertyResult {
    pub fn success(name: &str, message: String, rows: BTreeMap<String, u32>) -> Self {
        PropertyResult {
            property_name: Some(name.to_string()),
            status: PlacementStatus::Success,
            message,
            rows,
        }
    }

    pub fn error(name: Option<&str>, message: String) -> Self {
        PropertyResult {
            property_name: name.map(str::to_string),
            status: PlacementStatus::Error,
            message,
            rows: BTreeMap::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == PlacementStatus::Success
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GapReason {
    Unparseable { message: String },
    VolatileFunction { name: String },
    WholeRowReference,
}

/// A formula the reconciler could not re-anchor and left as the insertion
/// primitive produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationGap {
    pub sheet: String,
    /// Final A1 position of the cell.
    pub cell: String,
    pub formula: String,
    pub reason: GapReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Cells rebuilt because they point into another section.
    pub cross_section: u32,
    /// Cells rebuilt because they aggregate a whole section or a trailer.
    pub aggregates: u32,
    /// Cells rebuilt because they point into another, reshaped sheet.
    pub cross_sheet: u32,
    /// Sequence-number cells rewritten.
    pub sequence_cells: u32,
    pub gaps: Vec<ReconciliationGap>,
}

impl ReconcileReport {
    pub fn rewritten(&self) -> u32 {
        self.cross_section + self.aggregates + self.cross_sheet
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// Records placed (annual statements plus settlements).
    pub record_count: u32,
    /// Records added to each primary section beyond its capacity.
    pub extra_rows: u32,
    pub plans: Vec<PlanSummary>,
    pub results: Vec<PropertyResult>,
    pub extraction_errors: Vec<ExtractionError>,
    pub reconciliation: ReconcileReport,
    /// Transfer deeds written into the useful-life chain.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transfers: Vec<PropertyResult>,
    /// Settlement cost blocks on the new-property sheet.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub purchases: Vec<PropertyResult>,
    pub export: ExportReport,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
