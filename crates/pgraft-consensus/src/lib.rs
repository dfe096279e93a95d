//! Configures and drives the `openraft` consensus runtime for one node:
//! bring-up, `apply(bytes, timeout)`, leader/follower state, and the join
//! operation that adds a voter to the cluster.

mod handle;
mod log_store;
mod network;
mod server;
mod type_config;

pub use handle::{ConsensusError, ConsensusHandle};
pub use openraft::{BasicNode, Raft, RaftStateMachine};
pub use server::router as raft_rpc_router;
pub use type_config::{FsmResponse, TypeConfig};
