//! FILENAME: app/runner/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "statement-sync",
    about = "Extend a rental-statement template for a batch of properties and fill it in."
)]
pub struct Args {
    /// Template workbook (.xlsx).
    pub template: PathBuf,

    /// Records file: a JSON batch (`documents` + `settlements`) or a plain
    /// array of property records.
    pub records: PathBuf,

    /// Layout override (JSON). Fields left out keep the production layout.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for the updated workbook and its report.
    #[arg(long, short = 'o', default_value = ".")]
    pub output_dir: PathBuf,

    /// Directory for the job-status file. Defaults to the output directory.
    #[arg(long, value_name = "DIR")]
    pub job_dir: Option<PathBuf>,

    /// Log file. Lines go to stdout as well.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log debug lines (one per insertion pass).
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Args {
    pub fn job_dir(&self) -> &std::path::Path {
        self.job_dir.as_deref().unwrap_or(&self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_dir_falls_back_to_output_dir() {
        let args = Args::parse_from(["statement-sync", "t.xlsx", "r.json", "-o", "out"]);
        assert_eq!(args.job_dir(), std::path::Path::new("out"));
        assert!(args.config.is_none());

        let args = Args::parse_from(["statement-sync", "t.xlsx", "r.json", "--job-dir", "jobs", "-v"]);
        assert_eq!(args.job_dir(), std::path::Path::new("jobs"));
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert!(args.verbose);
    }
}
