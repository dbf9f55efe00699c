//! FILENAME: core/layout-engine/src/error.rs
//! PURPOSE: Error types for planning, insertion, reconciliation and placement.
//! CONTEXT: Every variant aborts the batch as a whole. Per-property problems
//! (missing name, full registry) are reported in the batch report instead.

use engine::StructureError;
use thiserror::Error;

/// The workbook does not have the shape the layout expects, or a structural
/// edit did not land where it was planned.
#[derive(Debug, Error, PartialEq)]
pub enum StructuralError {
    #[error("sheet '{0}' not found in workbook")]
    MissingSheet(String),

    #[error("section {section} expects data at row {row} of '{sheet}', but the sheet has {rows} rows")]
    MissingSection {
        sheet: String,
        section: String,
        row: u32,
        rows: u32,
    },

    #[error("{count} records exceed the ceiling of {ceiling}")]
    CapacityExceeded { count: u32, ceiling: u32 },

    #[error("sections on '{sheet}' must be extended bottom-up {expected:?}, got {found:?}")]
    InsertionOrder {
        sheet: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("'{sheet}' has {actual} rows after extending section {section}, expected {expected}")]
    UnexpectedRowCount {
        sheet: String,
        section: String,
        expected: u32,
        actual: u32,
    },

    #[error("template row {row} of section {section} on '{sheet}' drifted outside rows {start}..{end}")]
    TemplateDrift {
        sheet: String,
        section: String,
        row: u32,
        start: u32,
        end: u32,
    },

    #[error(transparent)]
    Primitive(#[from] StructureError),
}

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("structural error: {0}")]
    Structural(#[from] StructuralError),

    #[error("record {index} ({property}) has no row in section {section}: it holds {capacity} records")]
    PlacementCapacity {
        index: u32,
        property: String,
        section: String,
        capacity: u32,
    },

    #[error("expense items without a section mapping: {}", .0.join(", "))]
    UnclassifiedItems(Vec<String>),

    #[error("column {column} on '{sheet}' holds protected formulas")]
    ProtectedColumn { sheet: String, column: String },

    #[error("batch cannot move from {from} to {to}")]
    PhaseOrder { from: String, to: String },

    #[error("invalid layout configuration: {0}")]
    Config(String),
}

pub type LayoutResult<T> = Result<T, LayoutError>;
