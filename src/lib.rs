// ============================================================================
// sqlbatch Library
// ============================================================================

pub mod connection;
pub mod core;
pub mod executor;
pub mod fileset;
pub mod ledger;
pub mod report;
pub mod runner;
pub mod statement;

// Re-export main types for convenience
pub use crate::core::{BatchFile, DbError, Pass, Result, RunError, Statement, StatementOutcome};
pub use connection::{
    AnyConnectionProvider, ConnectionConfig, ConnectionProvider, SqlSession, Transaction,
};
pub use executor::{BatchExecutor, ExecutionMode};
pub use ledger::Ledger;
pub use report::{BatchReport, FileReport, PrefixOutcome, PrefixState, RunSummary};
pub use runner::{RunConfig, Runner};
