//! FILENAME: app/runner/src/lib.rs
//! PURPOSE: Command-line batch runner around the layout engine.
//! CONTEXT: Loads the template and the extracted records, runs one batch,
//! writes the updated workbook next to a JSON report and keeps a job-status
//! file current while it runs.

pub mod cli;
pub mod error;
pub mod job;
pub mod logging;
pub mod runner;

pub use cli::Args;
pub use error::AppError;
pub use job::{JobFile, JobState, JobStatus};
pub use runner::{load_config, output_paths, read_records, run, RunOutcome};
