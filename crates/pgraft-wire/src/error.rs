use pgraft_consensus::ConsensusError;
use pgraft_executor::ExecError;
use pgwire::error::PgWireError;
use thiserror::Error;

/// The connection-handler error taxonomy: every variant here ends a
/// connection, with no `ErrorResponse` the client could recover from and
/// keep querying. `pgwire`'s own `ApiError` is the recoverable path (it
/// answers with `ErrorResponse` + `ReadyForQuery` and keeps the session
/// open, matching real Postgres's simple-query error semantics) — the
/// opposite of what this system wants, so every variant here is carried
/// to `pgwire` as `PgWireError::IoError` instead, which `process_socket`
/// treats as fatal and closes the socket on.
#[derive(Error, Debug)]
pub enum WireError {
    #[error("sql did not parse: {0}")]
    ParseError(String),
    #[error("only a single statement per query message is supported")]
    MultiStatementUnsupported,
    #[error("statement execution failed: {0}")]
    Exec(#[from] ExecError),
    #[error("consensus apply failed: {0}")]
    Consensus(#[from] ConsensusError),
}

impl From<WireError> for PgWireError {
    fn from(err: WireError) -> Self {
        PgWireError::IoError(std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))
    }
}
