use super::{ConnectionConfig, ConnectionProvider, SqlSession};
use crate::core::{DbError, DbResult};
use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::{Any, AnyPool};
use tracing::debug;

/// Provider backed by a `sqlx` pool, driver chosen by the URL scheme
#[derive(Clone)]
pub struct AnyConnectionProvider {
    pool: AnyPool,
}

impl AnyConnectionProvider {
    pub async fn connect(config: &ConnectionConfig) -> DbResult<Self> {
        config.validate().map_err(DbError::Connect)?;
        install_default_drivers();

        let pool = AnyPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await
            .map_err(|err| {
                DbError::Connect(format!("{}: {err}", config.redacted_url()))
            })?;

        debug!(url = %config.redacted_url(), "database pool ready");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ConnectionProvider for AnyConnectionProvider {
    async fn begin(&self) -> DbResult<Box<dyn SqlSession>> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|err| DbError::Connect(err.to_string()))?;

        Ok(Box::new(AnySession { tx }))
    }
}

/// Rolls back on drop through the wrapped `sqlx::Transaction`
struct AnySession {
    tx: sqlx::Transaction<'static, Any>,
}

#[async_trait]
impl SqlSession for AnySession {
    async fn execute(&mut self, sql: &str) -> DbResult<u64> {
        let conn: &mut sqlx::AnyConnection = &mut self.tx;
        let result = sqlx::Executor::execute(conn, sqlx::raw_sql(sql))
            .await
            .map_err(|err| DbError::Execute(err.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|err| DbError::Commit(err.to_string()))
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|err| DbError::Rollback(err.to_string()))
    }
}
