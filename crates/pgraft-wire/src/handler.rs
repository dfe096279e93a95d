//! The simple-query handler: the one place a parsed statement turns into
//! either a local read (SELECT, answered straight from this node's KV
//! store) or a replicated write (everything else, routed through
//! [`ConsensusHandle::apply`]). Mirrors `pgWire.go`'s `handleMessage`
//! dispatch, minus the bytes-on-the-wire bookkeeping `pgwire` now owns for
//! us.

use std::sync::Arc;
use std::time::Duration;

use pgraft_consensus::ConsensusHandle;
use pgraft_executor::{ExecError, ExecOutcome, Executor};
use pgraft_kv::KvStore;
use pgwire::api::query::SimpleQueryHandler;
use pgwire::api::results::{DataRowEncoder, FieldFormat, FieldInfo, QueryResponse, Response, Tag};
use pgwire::api::ClientInfo;
use pgwire::error::PgWireResult;
use sqlparser::ast::Statement;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::error::WireError;
use crate::types::pg_type_for;

/// How long a write waits for its log entry to commit and apply locally
/// before the client gets an error.
const APPLY_TIMEOUT: Duration = Duration::from_millis(500);

/// Holds the two handles every query needs: the local store for SELECTs,
/// and the consensus runtime for everything that must be replicated before
/// it is visible. One instance is shared across every connection.
pub struct PgraftHandler {
    store: Arc<KvStore>,
    consensus: Arc<ConsensusHandle>,
}

impl PgraftHandler {
    pub fn new(store: Arc<KvStore>, consensus: Arc<ConsensusHandle>) -> Self {
        Self { store, consensus }
    }

    /// `CommandComplete`'s tag for a non-SELECT statement: the upper-cased
    /// first token of the statement text followed by `ok`, e.g. `CREATE ok`
    /// (mirrors `pgWire.go`'s `done()` helper).
    fn command_tag(sql: &str) -> String {
        let verb = sql.split_whitespace().next().unwrap_or("").to_uppercase();
        format!("{verb} ok")
    }

    async fn run_select(&self, stmts: &[Statement]) -> PgWireResult<Response<'static>> {
        let exec = Executor::new(&self.store);
        let outcome = exec.execute(stmts).map_err(WireError::from)?;
        let ExecOutcome::Rows(result) = outcome else {
            return Err(WireError::Exec(ExecError::UnsupportedStatement(
                "a Query statement produced a non-row outcome".into(),
            ))
            .into());
        };

        let fields: Vec<FieldInfo> = result
            .field_names
            .iter()
            .zip(result.field_types.iter())
            .map(|(name, ty)| FieldInfo::new(name.clone(), 0, 0, pg_type_for(ty), FieldFormat::Text))
            .collect();
        let fields = Arc::new(fields);

        let encode_fields = fields.clone();
        let data_rows: Vec<PgWireResult<_>> = result
            .rows
            .into_iter()
            .map(move |row| {
                let mut encoder = DataRowEncoder::new(encode_fields.clone());
                for cell in row {
                    encoder.encode_field(&cell.to_text())?;
                }
                encoder.finish()
            })
            .collect();

        Ok(Response::Query(QueryResponse::new(fields, futures::stream::iter(data_rows))))
    }

    async fn run_write(&self, sql: &str) -> PgWireResult<Response<'static>> {
        self.consensus
            .apply(sql.as_bytes().to_vec(), APPLY_TIMEOUT)
            .await
            .map_err(WireError::from)?;
        Ok(Response::Execution(Tag::new(&Self::command_tag(sql))))
    }
}

#[async_trait::async_trait]
impl SimpleQueryHandler for PgraftHandler {
    async fn do_query<'a, C>(&self, _client: &mut C, query: &'a str) -> PgWireResult<Vec<Response<'a>>>
    where
        C: ClientInfo + Unpin + Send + Sync,
    {
        let stmts =
            Parser::parse_sql(&GenericDialect {}, query).map_err(|e| WireError::ParseError(e.to_string()))?;

        // Only one statement per `Query` message is supported: reject the
        // rest outright rather than silently running only the first.
        if stmts.len() != 1 {
            return Err(WireError::MultiStatementUnsupported.into());
        }

        let response = if matches!(stmts[0], Statement::Query(_)) {
            self.run_select(&stmts).await?
        } else {
            self.run_write(query).await?
        };

        Ok(vec![response])
    }
}
