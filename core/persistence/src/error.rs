//! FILENAME: core/persistence/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XLSX write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("XLSX read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),

    #[error("XLSX package error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    #[error("Cell {cell} on sheet '{sheet}' is outside the xlsx grid")]
    OutOfBounds { sheet: String, cell: String },
}
