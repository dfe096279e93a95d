//! The listener side of the peer RPC transport: an `axum` router mounted on
//! this node's raft bind address, forwarding each request straight into the
//! local `openraft::Raft` handle.

use crate::type_config::TypeConfig;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use openraft::Raft;

type SharedRaft = Raft<TypeConfig>;
type RpcResult<T> = Result<Json<T>, (StatusCode, String)>;

/// A fatal local-node error (storage failure, shutdown) surfaces as a 500
/// rather than unwinding the request task — a transient hiccup on one peer
/// RPC should not crash the connection handling it.
fn rpc_error(err: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

async fn append_entries(
    State(raft): State<SharedRaft>,
    Json(req): Json<openraft::raft::AppendEntriesRequest<TypeConfig>>,
) -> RpcResult<openraft::raft::AppendEntriesResponse<u64>> {
    raft.append_entries(req).await.map(Json).map_err(rpc_error)
}

async fn vote(
    State(raft): State<SharedRaft>,
    Json(req): Json<openraft::raft::VoteRequest<u64>>,
) -> RpcResult<openraft::raft::VoteResponse<u64>> {
    raft.vote(req).await.map(Json).map_err(rpc_error)
}

async fn install_snapshot(
    State(raft): State<SharedRaft>,
    Json(req): Json<openraft::raft::InstallSnapshotRequest<TypeConfig>>,
) -> RpcResult<openraft::raft::InstallSnapshotResponse<u64>> {
    raft.install_snapshot(req).await.map(Json).map_err(rpc_error)
}

pub fn router(raft: SharedRaft) -> Router {
    Router::new()
        .route("/raft/append-entries", post(append_entries))
        .route("/raft/vote", post(vote))
        .route("/raft/install-snapshot", post(install_snapshot))
        .with_state(raft)
}
