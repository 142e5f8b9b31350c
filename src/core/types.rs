use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Separator between the prefix and the rest of a batch file name
pub const FILE_PREFIX_SEPARATOR: &str = "_";

/// Lowercased file name endings accepted as batch files
pub const ALLOWED_SUFFIXES: [&str; 2] = [".txt", ".sql"];

/// Appended to a file name once its statements have been committed
pub const PROCESSED_FILE_SUFFIX: &str = ".done";

/// Ledger line written after every clean pass
pub const NO_ERRORS_MSG: &str = "No errors\n";

pub const DEFAULT_PREFIXES: [&str; 2] = ["Prefix1", "Prefix2"];

/// Which of the two passes over a prefix is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    /// Executed inside a transaction that is always rolled back
    Simulation,
    /// Executed and committed, files renamed afterwards
    Commit,
}

impl Pass {
    pub fn is_simulation(&self) -> bool {
        matches!(self, Pass::Simulation)
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Simulation => write!(f, "simulation"),
            Pass::Commit => write!(f, "commit"),
        }
    }
}

/// A file selected for a prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFile {
    path: PathBuf,
    file_name: String,
}

impl BatchFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, file_name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Path the file is moved to once committed
    pub fn done_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(PROCESSED_FILE_SUFFIX);
        PathBuf::from(name)
    }

    /// `true` when `file_name` belongs to `prefix` and has an allowed ending
    pub fn matches(file_name: &str, prefix: &str) -> bool {
        let Some(rest) = file_name.strip_prefix(prefix) else {
            return false;
        };
        if !rest.starts_with(FILE_PREFIX_SEPARATOR) {
            return false;
        }
        let lowered = file_name.to_lowercase();
        ALLOWED_SUFFIXES.iter().any(|suffix| lowered.ends_with(suffix))
    }
}

/// One physical line of a batch file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// 1-based
    pub line: usize,
    pub text: String,
}

impl Statement {
    pub fn new(line: usize, text: impl Into<String>) -> Self {
        Self {
            line,
            text: text.into(),
        }
    }
}

/// Result of executing a single statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementOutcome {
    /// Exactly one row affected
    Success,
    ZeroRowsAffected,
    MultiRowAffected(u64),
    ExecutionError(String),
}

impl StatementOutcome {
    pub fn from_rows(rows: u64) -> Self {
        match rows {
            0 => StatementOutcome::ZeroRowsAffected,
            1 => StatementOutcome::Success,
            n => StatementOutcome::MultiRowAffected(n),
        }
    }

    /// Whether this outcome marks the whole pass as errored
    ///
    /// Multi-row modifications are only reported; they can still make the
    /// per-file row count diverge from the line count.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            StatementOutcome::ZeroRowsAffected | StatementOutcome::ExecutionError(_)
        )
    }

    pub fn rows_modified(&self) -> u64 {
        match self {
            StatementOutcome::Success => 1,
            StatementOutcome::MultiRowAffected(n) => *n,
            StatementOutcome::ZeroRowsAffected | StatementOutcome::ExecutionError(_) => 0,
        }
    }

    /// Ledger entry for this outcome, `None` for a clean statement
    pub fn ledger_entry(&self, file_name: &str, statement: &Statement) -> Option<String> {
        let line = statement.line;
        let text = &statement.text;
        match self {
            StatementOutcome::Success => None,
            StatementOutcome::MultiRowAffected(rows) => Some(format!(
                "{file_name} line {line} statement modified {rows} records:\n{text}\n"
            )),
            StatementOutcome::ZeroRowsAffected => Some(format!(
                "{file_name} line {line} statement modified no records:\n{text}\n"
            )),
            StatementOutcome::ExecutionError(detail) => {
                Some(format!("{file_name} line {line}\n{text}\n{detail}\n"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_prefix_and_suffix() {
        assert!(BatchFile::matches("Prefix1_001.sql", "Prefix1"));
        assert!(BatchFile::matches("Prefix1_users.TXT", "Prefix1"));
        assert!(!BatchFile::matches("Prefix1-001.sql", "Prefix1"));
        assert!(!BatchFile::matches("Prefix10_001.sql", "Prefix1"));
        assert!(!BatchFile::matches("Prefix1_001.sql.done", "Prefix1"));
        assert!(!BatchFile::matches("Prefix1_001.csv", "Prefix1"));
        assert!(!BatchFile::matches("prefix1_001.sql", "Prefix1"));
    }

    #[test]
    fn test_done_path() {
        let file = BatchFile::new("/data/batches/Prefix1_2.sql");
        assert_eq!(file.file_name(), "Prefix1_2.sql");
        assert_eq!(
            file.done_path(),
            PathBuf::from("/data/batches/Prefix1_2.sql.done")
        );
    }

    #[test]
    fn test_outcome_classification() {
        assert_eq!(StatementOutcome::from_rows(0), StatementOutcome::ZeroRowsAffected);
        assert_eq!(StatementOutcome::from_rows(1), StatementOutcome::Success);
        assert_eq!(StatementOutcome::from_rows(7), StatementOutcome::MultiRowAffected(7));

        assert!(StatementOutcome::ZeroRowsAffected.is_error());
        assert!(StatementOutcome::ExecutionError("boom".into()).is_error());
        assert!(!StatementOutcome::MultiRowAffected(3).is_error());
        assert!(!StatementOutcome::Success.is_error());

        assert_eq!(StatementOutcome::MultiRowAffected(3).rows_modified(), 3);
        assert_eq!(StatementOutcome::ExecutionError("x".into()).rows_modified(), 0);
    }

    #[test]
    fn test_ledger_entries() {
        let stmt = Statement::new(2, "UPDATE t SET a = 1");

        assert_eq!(StatementOutcome::Success.ledger_entry("f.sql", &stmt), None);
        assert_eq!(
            StatementOutcome::ZeroRowsAffected.ledger_entry("f.sql", &stmt).unwrap(),
            "f.sql line 2 statement modified no records:\nUPDATE t SET a = 1\n"
        );
        assert_eq!(
            StatementOutcome::MultiRowAffected(4).ledger_entry("f.sql", &stmt).unwrap(),
            "f.sql line 2 statement modified 4 records:\nUPDATE t SET a = 1\n"
        );
        assert_eq!(
            StatementOutcome::ExecutionError("no such table: t".into())
                .ledger_entry("f.sql", &stmt)
                .unwrap(),
            "f.sql line 2\nUPDATE t SET a = 1\nno such table: t\n"
        );
    }
}
