pub mod error;
pub mod types;

pub use error::{DbError, DbResult, Result, RunError};
pub use types::{
    ALLOWED_SUFFIXES, BatchFile, DEFAULT_PREFIXES, FILE_PREFIX_SEPARATOR, NO_ERRORS_MSG,
    PROCESSED_FILE_SUFFIX, Pass, Statement, StatementOutcome,
};
