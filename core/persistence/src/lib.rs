//! FILENAME: core/persistence/src/lib.rs
//! Workbook persistence.
//!
//! Loads a template workbook from XLSX into the engine's document model and
//! writes the mutated document back out. Values, formulas, merged regions,
//! cell styles, column widths and custom row heights round-trip. Conditional
//! formats, validations and defined names are not carried.

mod error;
mod xlsx_reader;
mod xlsx_styles;
mod xlsx_writer;

pub use error::PersistenceError;
pub use xlsx_reader::{load_xlsx, load_xlsx_sheets};
pub use xlsx_writer::save_xlsx;
