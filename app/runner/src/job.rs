//! FILENAME: app/runner/src/job.rs
//! PURPOSE: JSON job-status file that a poller can read while a batch runs.
//! CONTEXT: The file is rewritten on every progress checkpoint. Its name is
//! `<id>.json` inside the job directory.

use crate::error::AppError;
use chrono::Utc;
use layout_engine::ProgressSink;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobState {
    pub id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub created_at: String,
    pub updated_at: String,
    pub result_path: Option<String>,
    pub error: Option<String>,
}

pub struct JobFile {
    path: PathBuf,
    state: JobState,
}

impl JobFile {
    /// Creates a queued job in `dir`.
    pub fn create(dir: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(dir)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let job = JobFile {
            path: dir.join(format!("{}.json", id)),
            state: JobState {
                id,
                status: JobStatus::Queued,
                progress: 0,
                message: "queued".to_string(),
                created_at: now.clone(),
                updated_at: now,
                result_path: None,
                error: None,
            },
        };
        job.write()?;
        log::info!("job {} queued", job.state.id);
        Ok(job)
    }

    pub fn read(path: &Path) -> Result<JobState, AppError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn update(&mut self, progress: u8, message: &str) -> Result<(), AppError> {
        self.state.status = JobStatus::Processing;
        self.state.progress = progress.min(100);
        self.state.message = message.to_string();
        self.write()
    }

    pub fn complete(&mut self, result_path: &Path, message: &str) -> Result<(), AppError> {
        self.state.status = JobStatus::Completed;
        self.state.progress = 100;
        self.state.message = message.to_string();
        self.state.result_path = Some(result_path.display().to_string());
        self.write()
    }

    pub fn fail(&mut self, error: &str) -> Result<(), AppError> {
        self.state.status = JobStatus::Failed;
        self.state.message = "failed".to_string();
        self.state.error = Some(error.to_string());
        self.write()
    }

    fn write(&self) -> Result<(), AppError> {
        let mut state = self.state.clone();
        state.updated_at = Utc::now().to_rfc3339();
        let text = serde_json::to_string_pretty(&state)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}

impl ProgressSink for JobFile {
    fn checkpoint(&mut self, percent: u8, step: &str) {
        log::debug!("{}% {}", percent, step);
        if let Err(e) = self.update(percent, step) {
            log::warn!("job {}: status not written: {}", self.state.id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn job_file_tracks_the_run() {
        let dir = TempDir::new().unwrap();
        let mut job = JobFile::create(dir.path()).unwrap();
        let state = JobFile::read(job.path()).unwrap();
        assert_eq!(state.status, JobStatus::Queued);
        assert_eq!(state.progress, 0);
        assert!(job.path().ends_with(format!("{}.json", state.id)));

        job.checkpoint(40, "extending sections");
        let state = JobFile::read(job.path()).unwrap();
        assert_eq!(state.status, JobStatus::Processing);
        assert_eq!(state.progress, 40);
        assert_eq!(state.message, "extending sections");

        job.complete(Path::new("out.xlsx"), "2 placed").unwrap();
        let state = JobFile::read(job.path()).unwrap();
        assert_eq!(state.status, JobStatus::Completed);
        assert_eq!(state.progress, 100);
        assert_eq!(state.result_path.as_deref(), Some("out.xlsx"));
    }

    #[test]
    fn failures_keep_the_error() {
        let dir = TempDir::new().unwrap();
        let mut job = JobFile::create(dir.path()).unwrap();
        job.update(10, "planned").unwrap();
        job.fail("sheet 'x' not found").unwrap();
        let text = std::fs::read_to_string(job.path()).unwrap();
        assert!(text.contains("\"status\": \"failed\""));
        let state = JobFile::read(job.path()).unwrap();
        assert_eq!(state.error.as_deref(), Some("sheet 'x' not found"));
        assert_eq!(state.progress, 10);
    }
}
