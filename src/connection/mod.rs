pub mod any;
pub mod config;
pub mod memory;

use crate::core::{DbError, DbResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

pub use any::AnyConnectionProvider;
pub use config::ConnectionConfig;

static NEXT_TXN_ID: AtomicU64 = AtomicU64::new(1);

/// One database connection with an open transaction
///
/// Implementations must roll back when dropped without an explicit commit.
#[async_trait]
pub trait SqlSession: Send {
    /// Execute one statement verbatim and return the number of affected rows
    async fn execute(&mut self, sql: &str) -> DbResult<u64>;

    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn rollback(self: Box<Self>) -> DbResult<()>;
}

/// Hands out sessions, one per pass
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    /// Acquire a connection with autocommit disabled
    async fn begin(&self) -> DbResult<Box<dyn SqlSession>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

/// Scoped transaction for a single pass
///
/// State transitions:
/// ```text
/// Active ──commit──> Committed
///   │
///   └──rollback──> Aborted
/// ```
///
/// Dropping an active transaction rolls it back.
pub struct Transaction {
    id: u64,
    session: Option<Box<dyn SqlSession>>,
    state: TransactionState,
}

impl Transaction {
    /// Open a connection and start a transaction on it
    pub async fn begin(provider: &dyn ConnectionProvider) -> DbResult<Self> {
        let session = provider.begin().await?;
        Ok(Self {
            id: NEXT_TXN_ID.fetch_add(1, Ordering::SeqCst),
            session: Some(session),
            state: TransactionState::Active,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub async fn execute(&mut self, sql: &str) -> DbResult<u64> {
        match self.session.as_mut() {
            Some(session) if self.state == TransactionState::Active => session.execute(sql).await,
            _ => Err(DbError::Execute("Transaction is not active".into())),
        }
    }

    pub async fn commit(mut self) -> DbResult<()> {
        let session = self.take_active()?;
        // A failed commit leaves nothing to roll back on our side
        self.state = TransactionState::Aborted;
        session.commit().await?;
        self.state = TransactionState::Committed;
        Ok(())
    }

    pub async fn rollback(mut self) -> DbResult<()> {
        let session = self.take_active()?;
        self.state = TransactionState::Aborted;
        session.rollback().await
    }

    fn take_active(&mut self) -> DbResult<Box<dyn SqlSession>> {
        if self.state != TransactionState::Active {
            return Err(DbError::Execute("Transaction is not active".into()));
        }
        self.session
            .take()
            .ok_or_else(|| DbError::Execute("Transaction is not active".into()))
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if self.state == TransactionState::Active && self.session.is_some() {
            warn!(txn = self.id, "transaction dropped while active, rolling back");
        }
    }
}
