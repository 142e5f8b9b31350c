use crate::core::types::Pass;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by the database capability
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection error: {0}")]
    Connect(String),

    #[error("{0}")]
    Execute(String),

    #[error("Commit failed: {0}")]
    Commit(String),

    #[error("Rollback failed: {0}")]
    Rollback(String),
}

/// Errors that stop a run
///
/// Statement-level failures never show up here: they are classified into
/// `StatementOutcome` and written to the ledger instead.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Directory '{}' does not exist.", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("'{}' is not a directory.", .0.display())]
    NotADirectory(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot walk '{}': {message}", path.display())]
    Walk { path: PathBuf, message: String },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Ledger '{}' is not writable: {source}", path.display())]
    Ledger {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transaction error: {0}")]
    Transaction(#[from] DbError),

    #[error("{prefix} {pass} found errors, see the ledger")]
    DirtyBatch { prefix: String, pass: Pass },
}

impl RunError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Configuration errors are reported before any batch work begins
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::DirectoryNotFound(_) | Self::NotADirectory(_) | Self::InvalidConfig(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RunError>;

pub type DbResult<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_flagged() {
        assert!(RunError::DirectoryNotFound(PathBuf::from("/nope")).is_config());
        assert!(RunError::InvalidConfig("empty".into()).is_config());
        assert!(!RunError::Transaction(DbError::Commit("lost".into())).is_config());
    }

    #[test]
    fn test_messages() {
        let err = RunError::DirectoryNotFound(PathBuf::from("/data/sql"));
        assert_eq!(err.to_string(), "Directory '/data/sql' does not exist.");

        let err = RunError::DirtyBatch {
            prefix: "Prefix1".into(),
            pass: Pass::Simulation,
        };
        assert_eq!(err.to_string(), "Prefix1 simulation found errors, see the ledger");
    }
}
