//! FILENAME: app/runner/src/logging.rs
// PURPOSE: Unified logger behind the `log` facade.
// FORMAT: seq|level|category|message

use crate::error::AppError;
use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

// ============================================================================
// UNIFIED LOGGING SYSTEM
// ============================================================================

/// Global sequence counter, one number per line.
static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

/// Global log file handle
static LOG_FILE: Lazy<Mutex<Option<File>>> = Lazy::new(|| Mutex::new(None));

static LOGGER: Lazy<UnifiedLogger> = Lazy::new(|| UnifiedLogger);

/// Get next sequence number
pub fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst) + 1
}

pub fn level_tag(level: Level) -> &'static str {
    match level {
        Level::Error => "E",
        Level::Warn => "W",
        Level::Info => "I",
        Level::Debug => "D",
        Level::Trace => "T",
    }
}

/// `layout_engine::reconcile` logs as RECONCILE, the runner as RUNNER.
pub fn category(target: &str) -> String {
    let last = target.rsplit("::").next().unwrap_or(target);
    let name = if last == "statement_sync" { "runner" } else { last };
    name.to_uppercase()
}

pub fn format_line(seq: u64, level: Level, target: &str, message: &str) -> String {
    format!("{}|{}|{}|{}", seq, level_tag(level), category(target), message)
}

/// Write a log line in unified format
fn write_line(line: &str) {
    if let Ok(mut guard) = LOG_FILE.lock() {
        if let Some(ref mut file) = *guard {
            if let Err(e) = writeln!(file, "{}", line) {
                eprintln!("[LOG_ERROR] Failed to write: {}", e);
            }
            let _ = file.flush();
        }
    }
    println!("{}", line);
}

struct UnifiedLogger;

impl Log for UnifiedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(next_seq(), record.level(), record.target(), &record.args().to_string());
        write_line(&line);
    }

    fn flush(&self) {
        if let Ok(mut guard) = LOG_FILE.lock() {
            if let Some(ref mut file) = *guard {
                let _ = file.flush();
            }
        }
    }
}

/// Installs the logger. With `log_path` the file is truncated and every
/// line is mirrored into it.
pub fn init(log_path: Option<&Path>, level: LevelFilter) -> Result<(), AppError> {
    if let Some(path) = log_path {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let mut log_file = LOG_FILE.lock().map_err(|e| AppError::Logger(e.to_string()))?;
        *log_file = Some(file);
    }

    log::set_logger(&*LOGGER).map_err(|e| AppError::Logger(e.to_string()))?;
    log::set_max_level(level);

    write_line(&format!(
        "{}|I|SESSION|started {}",
        next_seq(),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    Ok(())
}
