//! FILENAME: app/runner/src/runner.rs
//! PURPOSE: One command-line batch: template + records in, updated workbook,
//! report and job status out.
//! CONTEXT: The template file itself is never written. The output name is
//! `<template stem>_updated_<YYYYMMDDHHMMSS>.xlsx`, the report sits next to
//! it as `<same>_report.json`.

use crate::cli::Args;
use crate::error::AppError;
use crate::job::JobFile;
use chrono::{DateTime, Local};
use layout_engine::{run_batch, BatchInput, BatchReport, LayoutConfig, PropertyRecord, SourceDocument};
use persistence::{load_xlsx, save_xlsx};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Accepted shapes of the records file.
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsFile {
    Records(Vec<PropertyRecord>),
    Batch(BatchInput),
}

#[derive(Debug)]
pub struct RunOutcome {
    pub workbook_path: PathBuf,
    pub report_path: PathBuf,
    pub job_path: PathBuf,
    pub report: BatchReport,
}

pub fn output_paths(template: &Path, output_dir: &Path, now: DateTime<Local>) -> (PathBuf, PathBuf) {
    let stem = template
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "workbook".to_string());
    let base = format!("{}_updated_{}", stem, now.format("%Y%m%d%H%M%S"));
    (
        output_dir.join(format!("{}.xlsx", base)),
        output_dir.join(format!("{}_report.json", base)),
    )
}

pub fn read_records(path: &Path) -> Result<BatchInput, AppError> {
    let text = std::fs::read_to_string(path)?;
    let parsed: RecordsFile = serde_json::from_str(&text).map_err(|e| AppError::Records {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok(match parsed {
        RecordsFile::Batch(input) => input,
        RecordsFile::Records(records) => BatchInput {
            documents: records
                .into_iter()
                .enumerate()
                .map(|(i, record)| SourceDocument::parsed(&format!("record {}", i + 1), record))
                .collect(),
            ..BatchInput::default()
        },
    })
}

pub fn load_config(path: Option<&Path>) -> Result<LayoutConfig, AppError> {
    match path {
        Some(path) => Ok(LayoutConfig::load(path)?),
        None => Ok(LayoutConfig::default()),
    }
}

/// Runs the batch and records the outcome in the job file, failed or not.
pub fn run(args: &Args) -> Result<RunOutcome, AppError> {
    let mut job = JobFile::create(args.job_dir())?;
    match execute(args, &mut job) {
        Ok(outcome) => {
            let message = format!(
                "{} placed, {} failed",
                outcome.report.succeeded(),
                outcome.report.failed()
            );
            job.complete(&outcome.workbook_path, &message)?;
            log::info!("{} -> {}", args.template.display(), outcome.workbook_path.display());
            Ok(outcome)
        }
        Err(e) => {
            log::error!("batch failed: {}", e);
            job.fail(&e.to_string())?;
            Err(e)
        }
    }
}

fn execute(args: &Args, job: &mut JobFile) -> Result<RunOutcome, AppError> {
    let config = load_config(args.config.as_deref())?;
    let input = read_records(&args.records)?;
    log::info!(
        "{} document(s), {} settlement(s), {} transfer(s) from {}",
        input.documents.len(),
        input.settlements.len(),
        input.transfers.len(),
        args.records.display()
    );

    let mut workbook = load_xlsx(&args.template)?;
    log::info!("loaded {} ({} sheets)", args.template.display(), workbook.sheets.len());

    let report = run_batch(&mut workbook, &input, &config, job)?;

    std::fs::create_dir_all(&args.output_dir)?;
    let (workbook_path, report_path) = output_paths(&args.template, &args.output_dir, Local::now());
    save_xlsx(&workbook, &workbook_path)?;
    std::fs::write(&report_path, report.to_json()?)?;

    Ok(RunOutcome {
        workbook_path,
        report_path,
        job_path: job.path().to_path_buf(),
        report,
    })
}
