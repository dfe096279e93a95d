//! The cluster membership control surface: one endpoint a human or a
//! deploy script calls on the current leader to bring a freshly started
//! follower into the voter set. A thin
//! `axum::extract::State` handler returning a JSON body and the right
//! status code, nothing more.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use http::StatusCode;
use pgraft_consensus::{ConsensusError, ConsensusHandle};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AddFollowerParams {
    #[serde(rename = "followerId")]
    follower_id: u64,
    #[serde(rename = "followerAddr")]
    follower_addr: String,
}

fn status_for(err: &ConsensusError) -> StatusCode {
    match err {
        ConsensusError::NotLeader => StatusCode::CONFLICT,
        ConsensusError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ConsensusError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ConsensusError::Rejected(_) => StatusCode::BAD_REQUEST,
    }
}

async fn add_follower(
    State(consensus): State<Arc<ConsensusHandle>>,
    Query(params): Query<AddFollowerParams>,
) -> impl IntoResponse {
    match consensus.join(params.follower_id, params.follower_addr.clone()).await {
        Ok(()) => {
            tracing::info!(follower_id = params.follower_id, addr = %params.follower_addr, "follower joined");
            (
                StatusCode::OK,
                serde_json::json!({ "joined": params.follower_id }).to_string(),
            )
        }
        Err(e) => {
            tracing::warn!(follower_id = params.follower_id, error = %e, "add-follower failed");
            (status_for(&e), serde_json::json!({ "error": e.to_string() }).to_string())
        }
    }
}

/// Mounts the endpoint on a fresh router bound to one node's
/// `ConsensusHandle`. Callers nest or serve this directly on the admin
/// HTTP port.
pub fn router(consensus: Arc<ConsensusHandle>) -> axum::Router {
    axum::Router::new()
        .route("/add-follower", axum::routing::post(add_follower))
        .with_state(consensus)
}
