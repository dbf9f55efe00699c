//! FILENAME: app/runner/tests/run.rs
//! PURPOSE: Runs the command-line batch against a template written to disk.

use engine::{CellValue, Sheet, Workbook};
use layout_engine::{DEPRECIATION_SHEET, INCOME_SHEET, INTEREST_SHEET, USEFUL_LIFE_SHEET};
use persistence::{load_xlsx, save_xlsx};
use statement_sync::{run, AppError, Args, JobFile, JobStatus};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn sheet_with_marker(name: &str, last_row: u32) -> Sheet {
    let mut sheet = Sheet::new(name);
    sheet.set_value(last_row - 1, 0, CellValue::Text("end".to_string()));
    sheet
}

fn write_template(dir: &Path, with_depreciation: bool) -> PathBuf {
    let mut workbook = Workbook::new();
    workbook.add_sheet(sheet_with_marker(INCOME_SHEET, 175));
    workbook.add_sheet(sheet_with_marker(INTEREST_SHEET, 85));
    workbook.add_sheet(sheet_with_marker(USEFUL_LIFE_SHEET, 50));
    if with_depreciation {
        workbook.add_sheet(sheet_with_marker(DEPRECIATION_SHEET, 45));
    }
    let path = dir.join("template.xlsx");
    save_xlsx(&workbook, &path).unwrap();
    path
}

fn write_records(dir: &Path) -> PathBuf {
    let path = dir.join("records.json");
    std::fs::write(
        &path,
        r#"{
            "documents": [
                {"source": "a.pdf", "record": {"property_name": "コーポ桜", "income": [1,1,1,1,1,1,1,1,1,1,1,1]}},
                {"source": "b.pdf", "error": "no text layer"}
            ],
            "transfers": [
                {"property_name": "コーポ桜", "completion_date": "2010/02/24", "transfer_date": "2024/12/27"}
            ]
        }"#,
    )
    .unwrap();
    path
}

fn args(dir: &Path, template: PathBuf, records: PathBuf) -> Args {
    Args {
        template,
        records,
        config: None,
        output_dir: dir.join("out"),
        job_dir: Some(dir.join("jobs")),
        log_file: None,
        verbose: false,
    }
}

#[test]
fn writes_workbook_report_and_job() {
    let dir = TempDir::new().unwrap();
    let template = write_template(dir.path(), true);
    let records = write_records(dir.path());

    let outcome = run(&args(dir.path(), template.clone(), records)).unwrap();
    assert_eq!(outcome.report.succeeded(), 1);
    assert_eq!(outcome.report.extraction_errors.len(), 1);

    let name = outcome.workbook_path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("template_updated_"), "{}", name);
    assert!(outcome.report_path.exists());
    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&outcome.report_path).unwrap()).unwrap();
    assert_eq!(report["results"][0]["property_name"], "コーポ桜");

    let updated = load_xlsx(&outcome.workbook_path).unwrap();
    let income = updated.sheet(INCOME_SHEET).unwrap();
    assert_eq!(income.value(3, 6), Some(&CellValue::Text("コーポ桜".to_string())));
    assert_eq!(income.value(54, 8), Some(&CellValue::Number(1.0)));
    assert_eq!(report["transfers"][0]["status"], "success");
    let useful_life = updated.sheet(USEFUL_LIFE_SHEET).unwrap();
    assert_eq!(useful_life.value(4, 4), Some(&CellValue::Text("躯体".to_string())));

    // The template is read, never written.
    let original = load_xlsx(&template).unwrap();
    assert_eq!(original.sheet(INCOME_SHEET).unwrap().value(3, 6), None);

    let state = JobFile::read(&outcome.job_path).unwrap();
    assert_eq!(state.status, JobStatus::Completed);
    assert_eq!(state.progress, 100);
}

#[test]
fn failed_batches_mark_the_job_failed() {
    let dir = TempDir::new().unwrap();
    let template = write_template(dir.path(), false);
    let records = write_records(dir.path());

    let err = run(&args(dir.path(), template, records)).unwrap_err();
    assert!(matches!(err, AppError::Layout(_)), "{}", err);

    let jobs: Vec<_> = std::fs::read_dir(dir.path().join("jobs")).unwrap().collect();
    assert_eq!(jobs.len(), 1);
    let state = JobFile::read(&jobs[0].as_ref().unwrap().path()).unwrap();
    assert_eq!(state.status, JobStatus::Failed);
    assert!(state.error.unwrap().contains(DEPRECIATION_SHEET));
    assert!(!dir.path().join("out").exists());
}
