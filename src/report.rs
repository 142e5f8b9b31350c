use crate::core::{Pass, Result, RunError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// What one file contributed to a pass
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub file_name: String,
    pub lines_read: usize,
    pub lines_modified: u64,
    /// Cumulative pass flag as seen when this file finished
    pub has_error: bool,
    pub renamed: bool,
    pub elapsed_secs: f64,
}

impl FileReport {
    pub fn new(path: &Path, file_name: &str) -> Self {
        Self {
            path: path.to_path_buf(),
            file_name: file_name.to_string(),
            lines_read: 0,
            lines_modified: 0,
            has_error: false,
            renamed: false,
            elapsed_secs: 0.0,
        }
    }

    /// Row count diverged from line count
    pub fn is_mismatched(&self) -> bool {
        self.lines_read as u64 != self.lines_modified
    }

    pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed_secs = round2(elapsed.as_secs_f64());
    }
}

/// Aggregate of one pass over a prefix
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub prefix: String,
    pub pass: Pass,
    pub files: Vec<FileReport>,
    pub has_error: bool,
}

impl BatchReport {
    pub fn new(prefix: &str, pass: Pass) -> Self {
        Self {
            prefix: prefix.to_string(),
            pass,
            files: Vec::new(),
            has_error: false,
        }
    }

    pub fn lines_read(&self) -> usize {
        self.files.iter().map(|f| f.lines_read).sum()
    }

    pub fn lines_modified(&self) -> u64 {
        self.files.iter().map(|f| f.lines_modified).sum()
    }

    pub fn is_clean(&self) -> bool {
        !self.has_error
    }
}

/// Terminal state of the per-prefix state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixState {
    /// Simulation found anomalies, nothing was committed
    DirtySimulation,
    /// Simulation was clean and the run was asked to stop there
    CleanSimulation,
    /// Commit pass found anomalies and rolled back
    FailedCommit,
    /// Committed and every file renamed
    CleanCommit,
}

impl PrefixState {
    pub fn is_success(&self) -> bool {
        matches!(self, PrefixState::CleanSimulation | PrefixState::CleanCommit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrefixState::DirtySimulation => "dirty simulation",
            PrefixState::CleanSimulation => "clean simulation",
            PrefixState::FailedCommit => "failed commit",
            PrefixState::CleanCommit => "committed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PrefixOutcome {
    pub prefix: String,
    pub state: PrefixState,
    pub simulation: BatchReport,
    pub commit: Option<BatchReport>,
}

impl PrefixOutcome {
    pub fn is_success(&self) -> bool {
        self.state.is_success()
    }

    /// The pass that decided the outcome
    pub fn final_report(&self) -> &BatchReport {
        self.commit.as_ref().unwrap_or(&self.simulation)
    }
}

/// Everything a run did, in prefix order
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub prefixes: Vec<PrefixOutcome>,
    /// Fatal error that ended the run early
    pub fault: Option<String>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            elapsed_secs: 0.0,
            prefixes: Vec::new(),
            fault: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.fault.is_none() && self.prefixes.iter().all(PrefixOutcome::is_success)
    }

    pub fn failed_prefixes(&self) -> Vec<&str> {
        self.prefixes
            .iter()
            .filter(|p| !p.is_success())
            .map(|p| p.prefix.as_str())
            .collect()
    }

    pub(crate) fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed_secs = round2(elapsed.as_secs_f64());
    }

    /// `Err` for the first prefix that did not end cleanly
    pub fn check(&self) -> Result<()> {
        let failed = self.prefixes.iter().find(|p| !p.is_success());
        match failed {
            Some(outcome) => Err(RunError::DirtyBatch {
                prefix: outcome.prefix.clone(),
                pass: outcome.final_report().pass,
            }),
            None => Ok(()),
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|err| RunError::io(path, std::io::Error::other(err)))?;
        std::fs::write(path, json).map_err(|err| RunError::io(path, err))
    }

    pub fn print(&self) {
        if self.prefixes.is_empty() {
            println!("No prefixes processed");
            return;
        }

        let columns = ["prefix", "state", "files", "lines read", "lines modified"];
        let rows: Vec<[String; 5]> = self
            .prefixes
            .iter()
            .map(|outcome| {
                let report = outcome.final_report();
                [
                    outcome.prefix.clone(),
                    outcome.state.as_str().to_string(),
                    report.files.len().to_string(),
                    report.lines_read().to_string(),
                    report.lines_modified().to_string(),
                ]
            })
            .collect();

        // Calculate column widths
        let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
        for row in &rows {
            for (i, value) in row.iter().enumerate() {
                widths[i] = widths[i].max(value.len());
            }
        }

        let header: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{:width$}", col, width = widths[i]))
            .collect();
        println!("{}", header.join(" | "));

        let separator: String = widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("-+-");
        println!("{}", separator);

        for row in &rows {
            let row_str: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, val)| format!("{:width$}", val, width = widths[i]))
                .collect();
            println!("{}", row_str.join(" | "));
        }
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(secs: f64) -> f64 {
    (secs * 100.0).round() / 100.0
}
