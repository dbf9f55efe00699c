//! FILENAME: app/runner/src/main.rs
// PURPOSE: Command-line entry point with unified logging.
// FORMAT: seq|level|category|message

use clap::Parser;
use log::LevelFilter;
use statement_sync::{logging, run, Args};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args = Args::parse();
    let level = if args.verbose { LevelFilter::Debug } else { LevelFilter::Info };
    if let Err(e) = logging::init(args.log_file.as_deref(), level) {
        eprintln!("[LOG_INIT] {}", e);
    }

    match run(&args) {
        Ok(outcome) => {
            let report = &outcome.report;
            println!(
                "{} placed, {} failed, {} extraction error(s), {} formula gap(s)",
                report.succeeded(),
                report.failed(),
                report.extraction_errors.len(),
                report.reconciliation.gaps.len()
            );
            println!("workbook: {}", outcome.workbook_path.display());
            println!("report:   {}", outcome.report_path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
