use crate::log_store::LogStore;
use crate::network::NetworkFactory;
use crate::type_config::TypeConfig;
use openraft::error::{ClientWriteError, RaftError};
use openraft::{BasicNode, Raft, RaftStateMachine};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsensusError {
    #[error("this node is not the leader")]
    NotLeader,
    #[error("apply did not complete within the deadline")]
    Timeout,
    #[error("consensus runtime unavailable: {0}")]
    Unavailable(String),
    #[error("applied entry was rejected: {0}")]
    Rejected(String),
}

/// Drives one node's `openraft` instance: bring-up, `apply`, and cluster
/// membership changes. Only the leader's `apply` succeeds; everyone else's
/// fails with `NotLeader`, which the wire front end forwards to the client
/// as a query error.
pub struct ConsensusHandle {
    raft: Raft<TypeConfig>,
    node_id: u64,
}

impl ConsensusHandle {
    /// Brings up the raft node with a stable id and bind address. If
    /// `seed` is set, bootstraps a brand-new single-node cluster;
    /// otherwise the node starts as an uninitialized member waiting to be
    /// joined via `ConsensusHandle::join` on some existing leader.
    pub async fn start<SM>(
        node_id: u64,
        bind_addr: String,
        raft_dir: impl AsRef<std::path::Path>,
        state_machine: SM,
        seed: bool,
    ) -> anyhow::Result<Self>
    where
        SM: RaftStateMachine<TypeConfig> + Send + Sync + 'static,
    {
        let config = openraft::Config {
            heartbeat_interval: 250,
            election_timeout_min: 500,
            election_timeout_max: 1000,
            ..Default::default()
        };
        let config = std::sync::Arc::new(config.validate()?);

        let log_store = LogStore::open(raft_dir)?;
        let network = NetworkFactory::default();

        let raft = Raft::new(node_id, config, network, log_store, state_machine).await?;

        if seed {
            let mut members = BTreeMap::new();
            members.insert(node_id, BasicNode { addr: bind_addr });
            raft.initialize(members).await?;
        }

        Ok(Self { raft, node_id })
    }

    pub fn raft(&self) -> Raft<TypeConfig> {
        self.raft.clone()
    }

    /// Replicates `payload` (the raw SQL statement text) through the log
    /// and waits up to `timeout` for it to commit and apply on this node.
    pub async fn apply(&self, payload: Vec<u8>, timeout: Duration) -> Result<(), ConsensusError> {
        let result = tokio::time::timeout(timeout, self.raft.client_write(payload))
            .await
            .map_err(|_| ConsensusError::Timeout)?;

        let response = match result {
            Ok(resp) => resp,
            Err(RaftError::APIError(ClientWriteError::ForwardToLeader(_))) => return Err(ConsensusError::NotLeader),
            Err(e) => return Err(ConsensusError::Unavailable(e.to_string())),
        };

        response
            .data
            .map_err(ConsensusError::Rejected)
    }

    /// Adds `follower_id`/`follower_addr` as a learner, then promotes the
    /// full membership (existing voters plus the new node) to voters — the
    /// two-step `openraft` equivalent of `hashicorp/raft`'s single
    /// `AddVoter` call.
    pub async fn join(&self, follower_id: u64, follower_addr: String) -> Result<(), ConsensusError> {
        if !self.is_leader().await {
            return Err(ConsensusError::NotLeader);
        }

        self.raft
            .add_learner(follower_id, BasicNode { addr: follower_addr }, true)
            .await
            .map_err(|e| ConsensusError::Unavailable(e.to_string()))?;

        let metrics = self.raft.metrics().borrow().clone();
        let mut voters: std::collections::BTreeSet<u64> =
            metrics.membership_config.voter_ids().collect();
        voters.insert(follower_id);

        self.raft
            .change_membership(voters, false)
            .await
            .map_err(|e| ConsensusError::Unavailable(e.to_string()))?;
        Ok(())
    }

    pub async fn is_leader(&self) -> bool {
        self.raft.metrics().borrow().current_leader == Some(self.node_id)
    }

    pub fn node_id(&self) -> u64 {
        self.node_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_config::FsmResponse;
    use openraft::storage::Snapshot;
    use openraft::{LogId, OptionalSend, RaftSnapshotBuilder, SnapshotMeta, StorageError, StoredMembership};
    use std::io::Cursor;
    use tempfile::TempDir;

    /// A state machine that accepts every entry and records nothing —
    /// enough to exercise bring-up and `apply` here without depending on
    /// `pgraft-fsm`, which itself depends on this crate.
    #[derive(Clone, Default)]
    struct NoopFsm;

    impl RaftStateMachine<TypeConfig> for NoopFsm {
        type SnapshotBuilder = NoopFsm;

        async fn applied_state(
            &mut self,
        ) -> Result<(Option<LogId<u64>>, StoredMembership<u64, BasicNode>), StorageError<TypeConfig>> {
            Ok((None, StoredMembership::default()))
        }

        async fn apply<I>(&mut self, entries: I) -> Result<Vec<FsmResponse>, StorageError<TypeConfig>>
        where
            I: IntoIterator<Item = openraft::Entry<TypeConfig>> + OptionalSend,
        {
            Ok(entries.into_iter().map(|_| Ok(())).collect())
        }

        async fn begin_receiving_snapshot(&mut self) -> Result<Box<Cursor<Vec<u8>>>, StorageError<TypeConfig>> {
            Ok(Box::new(Cursor::new(Vec::new())))
        }

        async fn install_snapshot(
            &mut self,
            _meta: &SnapshotMeta<u64, BasicNode>,
            _snapshot: Box<Cursor<Vec<u8>>>,
        ) -> Result<(), StorageError<TypeConfig>> {
            Ok(())
        }

        async fn get_current_snapshot(&mut self) -> Result<Option<Snapshot<TypeConfig>>, StorageError<TypeConfig>> {
            Ok(None)
        }

        async fn get_snapshot_builder(&mut self) -> Self::SnapshotBuilder {
            self.clone()
        }
    }

    impl RaftSnapshotBuilder<TypeConfig> for NoopFsm {
        async fn build_snapshot(&mut self) -> Result<Snapshot<TypeConfig>, StorageError<TypeConfig>> {
            Err(StorageError::IO {
                source: openraft::StorageIOError::new(
                    openraft::ErrorSubject::Snapshot(None),
                    openraft::ErrorVerb::Write,
                    openraft::AnyError::error("snapshotting is a no-op in this test double"),
                ),
            })
        }
    }

    #[tokio::test]
    async fn seeded_single_node_becomes_leader_and_accepts_apply() {
        let dir = TempDir::with_prefix("pgraft-consensus-test").unwrap();
        let handle = ConsensusHandle::start(1, "127.0.0.1:0".into(), dir.path().join("raft"), NoopFsm, true)
            .await
            .unwrap();

        for _ in 0..100 {
            if handle.is_leader().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(handle.is_leader().await, "single seeded node should elect itself leader");

        handle
            .apply(b"noop".to_vec(), Duration::from_millis(500))
            .await
            .expect("leader apply should succeed");
    }

    #[tokio::test]
    async fn unseeded_node_starts_without_a_leader() {
        let dir = TempDir::with_prefix("pgraft-consensus-test").unwrap();
        let handle = ConsensusHandle::start(2, "127.0.0.1:0".into(), dir.path().join("raft"), NoopFsm, false)
            .await
            .unwrap();
        assert!(!handle.is_leader().await);
    }
}
