//! Applies a parsed SQL statement against the KV façade, shared between the
//! replicated FSM (writes, via the consensus log) and the local read path
//! (SELECTs), so the two never disagree about what "the engine" means.
//! Modeled as a value type over a `KvStore` handle rather than a hidden
//! global.

mod cell;
mod create;
mod insert;
mod select;

pub use cell::Cell;
pub use select::ExecResult;

use pgraft_catalog::{put_table, CatalogError};
use pgraft_kv::{KvError, KvStore, DATA_BUCKET};
use sqlparser::ast::Statement;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("statement not supported: {0}")]
    UnsupportedStatement(String),
    #[error("unsupported value in INSERT: {0}")]
    UnsupportedValue(String),
    #[error("unsupported query shape: {0}")]
    UnsupportedQuery(String),
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("table `{0}` not found")]
    TableMissing(String),
    #[error("could not encode/decode row or table definition: {0}")]
    EncodingError(#[from] bincode::Error),
    #[error("storage error: {0}")]
    StorageError(#[from] KvError),
}

impl From<CatalogError> for ExecError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::TableMissing(name) => ExecError::TableMissing(name),
            CatalogError::EncodingError(e) => ExecError::EncodingError(e),
            CatalogError::StorageError(e) => ExecError::StorageError(e),
        }
    }
}

/// The outcome of executing one statement. SELECT carries rows; CREATE
/// TABLE and INSERT carry nothing but success.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    Ddl,
    Inserted { row_count: usize },
    Rows(ExecResult),
}

/// A value type wrapping one `KvStore` handle. Cheap to construct per call;
/// holds no state of its own.
pub struct Executor<'a> {
    store: &'a KvStore,
}

impl<'a> Executor<'a> {
    pub fn new(store: &'a KvStore) -> Self {
        Self { store }
    }

    /// Executes the first statement of `stmts`. Callers must refuse
    /// multi-statement input upstream: this dispatch only ever looks at
    /// `stmts[0]`.
    pub fn execute(&self, stmts: &[Statement]) -> Result<ExecOutcome, ExecError> {
        let stmt = stmts
            .first()
            .ok_or_else(|| ExecError::UnsupportedStatement("empty statement list".into()))?;

        match stmt {
            Statement::CreateTable(create) => self.execute_create(create),
            Statement::Insert(insert) => self.execute_insert(insert),
            Statement::Query(query) => select::run_select(self.store, query).map(ExecOutcome::Rows),
            other => Err(ExecError::UnsupportedStatement(other.to_string())),
        }
    }

    fn execute_create(&self, stmt: &sqlparser::ast::CreateTable) -> Result<ExecOutcome, ExecError> {
        let def = create::table_def_from_create(stmt)?;
        put_table(self.store, &def)?;
        Ok(ExecOutcome::Ddl)
    }

    fn execute_insert(&self, stmt: &sqlparser::ast::Insert) -> Result<ExecOutcome, ExecError> {
        let (table_name, rows) = insert::rows_from_insert(stmt)?;

        // Each row is written in its own write transaction — an
        // acknowledged simplification; a batch insert is not atomic.
        for row in &rows {
            let row_bytes = bincode::serialize(row)?;
            let id = Uuid::new_v4();
            let key = format!("rows_{table_name}_{id}");
            self.store.write(DATA_BUCKET, |txn| {
                txn.create_bucket_if_missing(DATA_BUCKET)?;
                txn.put(key.as_bytes(), &row_bytes)?;
                Ok(())
            })?;
        }

        Ok(ExecOutcome::Inserted { row_count: rows.len() })
    }
}
