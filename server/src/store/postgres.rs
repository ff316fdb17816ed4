//! `PostgreSQL` store backed by a sqlx connection pool.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Executor, PgPool, Postgres, Row as _};

use super::{Cell, Param, Row, Statement, StatementSet, Store, StoreError, StoreTransaction};

pub struct PgStore {
    pool: PgPool,
    statements: Arc<StatementSet>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            statements: Arc::new(StatementSet::default()),
        }
    }

    /// Opens a pool against `database_url`, keeping at least one live
    /// connection so [`Store::is_connected`] reflects reachability.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(1)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bind_params<'q>(statement: &'q Statement, params: &[Param<'_>]) -> Query<'q, Postgres, PgArguments> {
    params.iter().fold(sqlx::query(&statement.sql), |query, param| {
        query.bind(param.map(str::to_owned))
    })
}

fn exec_failed(error: sqlx::Error) -> StoreError {
    match error {
        sqlx::Error::Database(db) => StoreError::ExecFailed(db.message().to_string()),
        other => StoreError::ExecFailed(other.to_string()),
    }
}

fn to_rows(rows: Vec<PgRow>) -> Result<Vec<Row>, StoreError> {
    rows.iter()
        .map(|row| {
            (0..row.len())
                .map(|i| row.try_get::<Option<String>, _>(i).map(Cell::from))
                .collect::<Result<Row, _>>()
                .map_err(exec_failed)
        })
        .collect()
}

#[async_trait]
impl Store for PgStore {
    async fn prepare(&mut self, name: &str, sql: &str, arity: usize) -> Result<(), StoreError> {
        (&self.pool)
            .prepare(sql)
            .await
            .map_err(|e| StoreError::PrepareFailed {
                name: name.to_string(),
                message: e.to_string(),
            })?;

        Arc::make_mut(&mut self.statements).insert(name, sql, arity);
        tracing::debug!(statement = name, arity, "Prepared statement");
        Ok(())
    }

    async fn exec_prepared(
        &self,
        name: &str,
        params: &[Param<'_>],
    ) -> Result<Vec<Row>, StoreError> {
        let statement = self.statements.resolve(name, params)?;
        let rows = bind_params(statement, params)
            .fetch_all(&self.pool)
            .await
            .map_err(exec_failed)?;
        to_rows(rows)
    }

    async fn exec_prepared_command(
        &self,
        name: &str,
        params: &[Param<'_>],
    ) -> Result<u64, StoreError> {
        let statement = self.statements.resolve(name, params)?;
        let result = bind_params(statement, params)
            .execute(&self.pool)
            .await
            .map_err(exec_failed)?;
        Ok(result.rows_affected())
    }

    async fn transaction(&self) -> Result<Box<dyn StoreTransaction>, StoreError> {
        let tx = self.pool.begin().await.map_err(exec_failed)?;
        Ok(Box::new(PgTransaction {
            tx,
            statements: Arc::clone(&self.statements),
        }))
    }

    fn is_connected(&self) -> bool {
        !self.pool.is_closed() && self.pool.size() > 0
    }
}

/// Rolled back by sqlx when dropped without a commit.
struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
    statements: Arc<StatementSet>,
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn exec_prepared(
        &mut self,
        name: &str,
        params: &[Param<'_>],
    ) -> Result<Vec<Row>, StoreError> {
        let statement = self.statements.resolve(name, params)?;
        let rows = bind_params(statement, params)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(exec_failed)?;
        to_rows(rows)
    }

    async fn exec_prepared_command(
        &mut self,
        name: &str,
        params: &[Param<'_>],
    ) -> Result<u64, StoreError> {
        let statement = self.statements.resolve(name, params)?;
        let result = bind_params(statement, params)
            .execute(&mut *self.tx)
            .await
            .map_err(exec_failed)?;
        Ok(result.rows_affected())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(exec_failed)
    }

    async fn rollback(self: Box<Self>) {
        if let Err(e) = self.tx.rollback().await {
            tracing::warn!(error = %e, "Transaction rollback failed");
        }
    }
}
