//! Peer-to-peer RPC transport for `openraft`'s `AppendEntries`/`Vote`/
//! `InstallSnapshot` messages, carried over plain HTTP/JSON — the same
//! `axum`/`reqwest` stack the rest of this system already depends on, there
//! being no `tonic`/gRPC precedent anywhere in this corpus.

use crate::type_config::TypeConfig;
use openraft::error::{InstallSnapshotError, NetworkError, RPCError, RaftError};
use openraft::network::{RPCOption, RaftNetwork, RaftNetworkFactory};
use openraft::raft::{
    AppendEntriesRequest, AppendEntriesResponse, InstallSnapshotRequest, InstallSnapshotResponse, VoteRequest,
    VoteResponse,
};
use openraft::BasicNode;

#[derive(Clone)]
pub struct NetworkFactory {
    client: reqwest::Client,
}

impl Default for NetworkFactory {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl RaftNetworkFactory<TypeConfig> for NetworkFactory {
    type Network = PeerClient;

    async fn new_client(&mut self, _target: u64, node: &BasicNode) -> Self::Network {
        PeerClient {
            client: self.client.clone(),
            addr: node.addr.clone(),
        }
    }
}

pub struct PeerClient {
    client: reqwest::Client,
    addr: String,
}

impl PeerClient {
    /// Generic over the RPC's own error subtype (`E`, e.g.
    /// `InstallSnapshotError`) since each `RaftNetwork` method's `Result`
    /// carries a different one; `E` is resolved from the caller's
    /// declared return type, not from anything in this function's body.
    async fn post<Req, Resp, E>(&self, path: &str, body: &Req) -> Result<Resp, RPCError<TypeConfig, RaftError<u64, E>>>
    where
        Req: serde::Serialize,
        Resp: serde::de::DeserializeOwned,
    {
        let url = format!("http://{}/raft/{path}", self.addr);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RPCError::Network(NetworkError::new(&e)))?;
        resp.json::<Resp>()
            .await
            .map_err(|e| RPCError::Network(NetworkError::new(&e)))
    }
}

impl RaftNetwork<TypeConfig> for PeerClient {
    async fn append_entries(
        &mut self,
        req: AppendEntriesRequest<TypeConfig>,
        _option: RPCOption,
    ) -> Result<AppendEntriesResponse<u64>, RPCError<TypeConfig, RaftError<u64>>> {
        self.post("append-entries", &req).await
    }

    async fn install_snapshot(
        &mut self,
        req: InstallSnapshotRequest<TypeConfig>,
        _option: RPCOption,
    ) -> Result<InstallSnapshotResponse<u64>, RPCError<TypeConfig, RaftError<u64, InstallSnapshotError>>> {
        self.post("install-snapshot", &req).await
    }

    async fn vote(
        &mut self,
        req: VoteRequest<u64>,
        _option: RPCOption,
    ) -> Result<VoteResponse<u64>, RPCError<TypeConfig, RaftError<u64>>> {
        self.post("vote", &req).await
    }
}
