//! FILENAME: app/runner/src/error.rs

use layout_engine::LayoutError;
use persistence::PersistenceError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Records file {path:?} is not valid: {message}")]
    Records { path: PathBuf, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Logger error: {0}")]
    Logger(String),
}
