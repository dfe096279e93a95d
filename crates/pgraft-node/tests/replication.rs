//! Multi-node integration tests driving real `ConsensusHandle` instances
//! bound to loopback ports end-to-end rather than mocking the consensus
//! runtime. Covers three-node replication consistency and follower
//! rejection of writes.

use std::sync::Arc;
use std::time::Duration;

use pgraft_consensus::ConsensusHandle;
use pgraft_executor::{Cell, ExecOutcome, Executor};
use pgraft_fsm::Fsm;
use pgraft_kv::{KvStore, DATA_BUCKET};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use tempfile::TempDir;

/// One running node: its store (so the test can read local state directly,
/// bypassing the wire front end) and its consensus handle.
struct Node {
    _dir: TempDir,
    store: Arc<KvStore>,
    consensus: Arc<ConsensusHandle>,
}

async fn free_port() -> u16 {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

async fn start_node(id: u64, raft_port: u16, seed: bool) -> Node {
    let dir = TempDir::with_prefix("pgraft-node-test").unwrap();
    let store = Arc::new(KvStore::open(dir.path().join("kv")).unwrap());
    store.reset_bucket(DATA_BUCKET).unwrap();

    let fsm = Fsm::new(store.clone());
    let raft_dir = dir.path().join("raft");
    let addr = format!("127.0.0.1:{raft_port}");
    let consensus = Arc::new(ConsensusHandle::start(id, addr, raft_dir, fsm, seed).await.unwrap());

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", raft_port)).await.unwrap();
    let router = pgraft_consensus::raft_rpc_router(consensus.raft());
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Node {
        _dir: dir,
        store,
        consensus,
    }
}

fn select_rows(store: &KvStore, sql: &str) -> Vec<Vec<Cell>> {
    let stmts = Parser::parse_sql(&GenericDialect {}, sql).unwrap();
    let exec = Executor::new(store);
    match exec.execute(&stmts).unwrap() {
        ExecOutcome::Rows(result) => result.rows,
        other => panic!("expected rows, got {other:?}"),
    }
}

#[tokio::test]
async fn three_node_cluster_replicates_writes_to_every_follower() {
    let leader_port = free_port().await;
    let leader = start_node(1, leader_port, true).await;

    let follower_b_port = free_port().await;
    let follower_b = start_node(2, follower_b_port, false).await;
    let follower_c_port = free_port().await;
    let follower_c = start_node(3, follower_c_port, false).await;

    leader
        .consensus
        .join(2, format!("127.0.0.1:{follower_b_port}"))
        .await
        .unwrap();
    leader
        .consensus
        .join(3, format!("127.0.0.1:{follower_c_port}"))
        .await
        .unwrap();

    leader
        .consensus
        .apply(b"CREATE TABLE k (n INT)".to_vec(), Duration::from_millis(500))
        .await
        .unwrap();
    leader
        .consensus
        .apply(b"INSERT INTO k VALUES (7)".to_vec(), Duration::from_millis(500))
        .await
        .unwrap();

    // Replication is asynchronous past the leader's own apply; give
    // followers a moment to catch up before asserting (within the 1 s
    // allowance).
    tokio::time::sleep(Duration::from_millis(500)).await;

    for follower in [&follower_b, &follower_c] {
        let rows = select_rows(&follower.store, "SELECT n FROM k");
        assert_eq!(rows, vec![vec![Cell::Int32(7)]]);
    }
}

#[tokio::test]
async fn follower_rejects_writes_and_state_is_unchanged() {
    let leader_port = free_port().await;
    let leader = start_node(1, leader_port, true).await;
    let follower_port = free_port().await;
    let follower = start_node(2, follower_port, false).await;

    leader.consensus.join(2, format!("127.0.0.1:{follower_port}")).await.unwrap();
    leader
        .consensus
        .apply(b"CREATE TABLE k (n INT)".to_vec(), Duration::from_millis(500))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let err = follower
        .consensus
        .apply(b"INSERT INTO k VALUES (1)".to_vec(), Duration::from_millis(500))
        .await
        .unwrap_err();
    assert!(matches!(err, pgraft_consensus::ConsensusError::NotLeader));

    let rows = select_rows(&follower.store, "SELECT n FROM k");
    assert!(rows.is_empty());
}
