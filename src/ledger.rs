// ============================================================================
// Error Ledger
// ============================================================================
//
// Plain-text audit trail of a run. The file is truncated once when the run
// starts; after that every record is appended as a complete line.
//
// ============================================================================

use crate::core::{Result, RunError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default ledger file name, created in the current working directory
pub const DEFAULT_LEDGER_FILE: &str = "ImportErrors.txt";

#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    file: File,
    records: usize,
}

impl Ledger {
    /// Create the ledger, discarding whatever a previous run left behind
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        File::create(&path).map_err(|source| RunError::Ledger {
            path: path.clone(),
            source,
        })?;

        let file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|source| RunError::Ledger {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            file,
            records: 0,
        })
    }

    /// Append `message` followed by a newline
    pub fn record(&mut self, message: &str) -> Result<()> {
        let mut line = String::with_capacity(message.len() + 1);
        line.push_str(message);
        line.push('\n');

        self.file
            .write_all(line.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|source| RunError::Ledger {
                path: self.path.clone(),
                source,
            })?;

        self.records += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written by this run
    pub fn records(&self) -> usize {
        self.records
    }
}
