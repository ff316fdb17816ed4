//! Store gateway: named, pre-registered parameterized statements over a
//! relational store.
//!
//! Statements are registered once with [`Store::prepare`], which needs
//! `&mut self`; once the store is shared behind an `Arc` the statement set
//! can no longer change. Every cell comes back as text, with SQL NULL kept
//! distinct from the empty string ([`Cell::Null`]).

pub mod catalog;
pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Positional statement parameter; `None` binds SQL NULL.
pub type Param<'a> = Option<&'a str>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Failed to prepare statement {name}: {message}")]
    PrepareFailed { name: String, message: String },

    #[error("Statement {0} has not been prepared")]
    UnknownStatement(String),

    #[error("Statement {name} expects {expected} parameters, got {actual}")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Statement failed: {0}")]
    ExecFailed(String),

    #[error("Column {0} is NULL")]
    UnexpectedNull(usize),

    #[error("Column {0} is missing")]
    MissingColumn(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Null,
    Text(String),
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map_or(Cell::Null, Cell::Text)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

/// One result tuple.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    cells: Vec<Cell>,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    pub fn cell(&self, index: usize) -> Result<&Cell, StoreError> {
        self.cells
            .get(index)
            .ok_or(StoreError::MissingColumn(index))
    }

    /// Text of a column that must not be NULL.
    pub fn text(&self, index: usize) -> Result<&str, StoreError> {
        match self.cell(index)? {
            Cell::Text(value) => Ok(value),
            Cell::Null => Err(StoreError::UnexpectedNull(index)),
        }
    }

    /// Text of a nullable column.
    pub fn opt_text(&self, index: usize) -> Result<Option<&str>, StoreError> {
        match self.cell(index)? {
            Cell::Text(value) => Ok(Some(value)),
            Cell::Null => Ok(None),
        }
    }
}

impl FromIterator<Cell> for Row {
    fn from_iter<I: IntoIterator<Item = Cell>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Statement {
    pub sql: String,
    pub arity: usize,
}

/// Registered statements, keyed by name.
#[derive(Debug, Clone, Default)]
pub(crate) struct StatementSet {
    statements: HashMap<String, Statement>,
}

impl StatementSet {
    pub fn insert(&mut self, name: &str, sql: &str, arity: usize) {
        self.statements.insert(
            name.to_string(),
            Statement {
                sql: sql.to_string(),
                arity,
            },
        );
    }

    /// Looks up `name` and checks the parameter count against its arity.
    pub fn resolve(&self, name: &str, params: &[Param<'_>]) -> Result<&Statement, StoreError> {
        let statement = self
            .statements
            .get(name)
            .ok_or_else(|| StoreError::UnknownStatement(name.to_string()))?;

        if statement.arity != params.len() {
            return Err(StoreError::ArityMismatch {
                name: name.to_string(),
                expected: statement.arity,
                actual: params.len(),
            });
        }

        Ok(statement)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Registers `sql` under `name`. Must happen before the store is shared.
    async fn prepare(&mut self, name: &str, sql: &str, arity: usize) -> Result<(), StoreError>;

    /// Runs a statement that returns tuples.
    async fn exec_prepared(&self, name: &str, params: &[Param<'_>])
        -> Result<Vec<Row>, StoreError>;

    /// Runs a statement without result tuples; returns the affected row count.
    async fn exec_prepared_command(
        &self,
        name: &str,
        params: &[Param<'_>],
    ) -> Result<u64, StoreError>;

    /// Begins a transaction. It commits only through
    /// [`StoreTransaction::commit`]; any other exit rolls it back.
    async fn transaction(&self) -> Result<Box<dyn StoreTransaction>, StoreError>;

    /// Liveness probe without side effects.
    fn is_connected(&self) -> bool;
}

#[async_trait]
pub trait StoreTransaction: Send {
    async fn exec_prepared(
        &mut self,
        name: &str,
        params: &[Param<'_>],
    ) -> Result<Vec<Row>, StoreError>;

    async fn exec_prepared_command(
        &mut self,
        name: &str,
        params: &[Param<'_>],
    ) -> Result<u64, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Rolls back explicitly. Failures are logged, never returned.
    async fn rollback(self: Box<Self>);
}
