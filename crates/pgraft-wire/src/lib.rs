//! The Postgres wire protocol front end: `[Accept] →
//! [Startup] → [Ready] ⇄ [Executing] → [Closed]`. `pgwire` owns the frame
//! codec, the startup/authentication handshake, and the `SSLRequest` denial
//! (this node never advertises TLS); this crate only
//! supplies the query dispatch in [`handler::PgraftHandler`].
//!
//! Every accepted connection is its own task; a connection
//! that errors is logged and dropped rather than kept alive to retry,
//! matching `pgWire.go`'s log-and-close behavior. [`error::WireError`]
//! converts to `PgWireError::IoError` rather than `ApiError` so that
//! `process_socket` treats every query failure as fatal and closes the
//! socket, instead of answering with `ErrorResponse` and waiting for
//! another query the way `pgwire`'s own recoverable-error path does.

mod error;
mod handler;
mod types;

pub use error::WireError;
pub use handler::PgraftHandler;
pub use types::pg_type_for;

use std::sync::Arc;

use pgraft_consensus::ConsensusHandle;
use pgraft_kv::KvStore;
use pgwire::api::auth::noop::NoopStartupHandler;
use pgwire::api::query::PlaceholderExtendedQueryHandler;
use pgwire::api::{MakeHandler, StatelessMakeHandler};
use pgwire::tokio::process_socket;
use tokio::net::TcpListener;

/// Accepts connections on `listener` until the process is torn down,
/// spawning one task per connection. Never returns under normal operation.
pub async fn serve(listener: TcpListener, store: Arc<KvStore>, consensus: Arc<ConsensusHandle>) {
    let query_handler = Arc::new(StatelessMakeHandler::new(Arc::new(PgraftHandler::new(store, consensus))));
    let startup_handler = Arc::new(StatelessMakeHandler::new(Arc::new(NoopStartupHandler)));
    let extended_handler = Arc::new(StatelessMakeHandler::new(Arc::new(PlaceholderExtendedQueryHandler)));

    loop {
        let (socket, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(error = %e, "failed to accept pg wire connection");
                continue;
            }
        };

        let query_handler = query_handler.make();
        let startup_handler = startup_handler.make();
        let extended_handler = extended_handler.make();

        tokio::spawn(async move {
            tracing::debug!(%peer, "pg wire connection accepted");
            // No TLS acceptor: any `SSLRequest` is denied with `N` and the
            // client is expected to retry in cleartext.
            if let Err(e) = process_socket(socket, None, startup_handler, query_handler, extended_handler).await {
                tracing::warn!(%peer, error = %e, "pg wire connection ended with an error");
            }
        });
    }
}
