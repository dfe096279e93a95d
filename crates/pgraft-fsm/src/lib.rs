//! The replicated FSM: the single hook `openraft` calls to apply a
//! committed log entry. The entry payload is the raw SQL statement text, as
//! received from the client; this module re-parses it and
//! invokes the same [`pgraft_executor::Executor`] the local SELECT path
//! uses, so writes and reads never drift apart on what "the engine" means.

use pgraft_consensus::{BasicNode, FsmResponse, RaftStateMachine, TypeConfig};
use pgraft_executor::Executor;
use pgraft_kv::KvStore;
use openraft::storage::Snapshot;
use openraft::{
    LogId, OptionalSend, RaftSnapshotBuilder, SnapshotMeta, StorageError, StoredMembership,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;
use std::io::Cursor;
use std::sync::Arc;

/// Applies committed entries against a shared `KvStore` handle. Cheap to
/// clone: all state lives behind the `Arc`.
#[derive(Clone)]
pub struct Fsm {
    store: Arc<KvStore>,
    last_applied: Arc<std::sync::Mutex<Option<LogId<u64>>>>,
}

impl Fsm {
    pub fn new(store: Arc<KvStore>) -> Self {
        Self {
            store,
            last_applied: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    /// Re-parses `sql` and runs it through the executor, discarding the
    /// parsed result and keeping only success/failure — the only thing
    /// `openraft`'s client-write response channel carries back to the
    /// caller that invoked `apply` on the leader.
    fn apply_one(&self, sql: &[u8]) -> FsmResponse {
        let sql = std::str::from_utf8(sql).map_err(|e| e.to_string())?;
        let stmts = Parser::parse_sql(&GenericDialect {}, sql).map_err(|e| e.to_string())?;
        let exec = Executor::new(&self.store);
        exec.execute(&stmts).map(|_| ()).map_err(|e| e.to_string())
    }
}

impl RaftStateMachine<TypeConfig> for Fsm {
    type SnapshotBuilder = NoopSnapshotBuilder;

    async fn applied_state(
        &mut self,
    ) -> Result<(Option<LogId<u64>>, StoredMembership<u64, BasicNode>), StorageError<TypeConfig>> {
        let last = *self.last_applied.lock().expect("fsm mutex poisoned");
        Ok((last, StoredMembership::default()))
    }

    async fn apply<I>(&mut self, entries: I) -> Result<Vec<FsmResponse>, StorageError<TypeConfig>>
    where
        I: IntoIterator<Item = openraft::Entry<TypeConfig>> + OptionalSend,
    {
        let mut responses = Vec::new();
        for entry in entries {
            tracing::debug!(index = entry.log_id.index, "applying replicated entry");
            let response = match &entry.payload {
                openraft::EntryPayload::Normal(sql) => self.apply_one(sql),
                openraft::EntryPayload::Blank | openraft::EntryPayload::Membership(_) => Ok(()),
            };
            *self.last_applied.lock().expect("fsm mutex poisoned") = Some(entry.log_id);
            responses.push(response);
        }
        Ok(responses)
    }

    async fn begin_receiving_snapshot(&mut self) -> Result<Box<Cursor<Vec<u8>>>, StorageError<TypeConfig>> {
        Ok(Box::new(Cursor::new(Vec::new())))
    }

    /// Always fails: this FSM cannot be warm-restarted from a snapshot.
    /// Replicas must replay the log from the beginning, which is the
    /// intended path since the local KV bucket is wiped at every boot
    /// anyway.
    async fn install_snapshot(
        &mut self,
        _meta: &SnapshotMeta<u64, BasicNode>,
        _snapshot: Box<Cursor<Vec<u8>>>,
    ) -> Result<(), StorageError<TypeConfig>> {
        Err(StorageError::IO {
            source: openraft::StorageIOError::new(
                openraft::ErrorSubject::Snapshot(None),
                openraft::ErrorVerb::Write,
                openraft::AnyError::error("nothing to restore"),
            ),
        })
    }

    async fn get_current_snapshot(&mut self) -> Result<Option<Snapshot<TypeConfig>>, StorageError<TypeConfig>> {
        Ok(None)
    }

    async fn get_snapshot_builder(&mut self) -> Self::SnapshotBuilder {
        NoopSnapshotBuilder
    }
}

/// A snapshot sink that, when persisted, immediately cancels — the Rust
/// shape of `hashicorp/raft`'s `snapshotNoop`.
pub struct NoopSnapshotBuilder;

impl RaftSnapshotBuilder<TypeConfig> for NoopSnapshotBuilder {
    async fn build_snapshot(&mut self) -> Result<Snapshot<TypeConfig>, StorageError<TypeConfig>> {
        Err(StorageError::IO {
            source: openraft::StorageIOError::new(
                openraft::ErrorSubject::Snapshot(None),
                openraft::ErrorVerb::Write,
                openraft::AnyError::error("snapshotting is a no-op by design"),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgraft_executor::{Cell, ExecOutcome};
    use pgraft_kv::DATA_BUCKET;
    use sqlparser::dialect::GenericDialect;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Arc<KvStore>) {
        let dir = TempDir::with_prefix("pgraft-fsm-test").unwrap();
        let store = Arc::new(KvStore::open(dir.path()).unwrap());
        store.reset_bucket(DATA_BUCKET).unwrap();
        (dir, store)
    }

    #[test]
    fn apply_one_runs_ddl_and_dml_against_the_shared_store() {
        let (_dir, store) = setup();
        let fsm = Fsm::new(store.clone());

        assert!(fsm.apply_one(b"CREATE TABLE k (n INT)").is_ok());
        assert!(fsm.apply_one(b"INSERT INTO k VALUES (7)").is_ok());

        let exec = Executor::new(&store);
        let stmts = Parser::parse_sql(&GenericDialect {}, "SELECT n FROM k").unwrap();
        let ExecOutcome::Rows(result) = exec.execute(&stmts).unwrap() else {
            panic!("expected rows");
        };
        assert_eq!(result.rows, vec![vec![Cell::Int32(7)]]);
    }

    #[test]
    fn apply_one_surfaces_executor_errors_as_strings_not_panics() {
        let (_dir, store) = setup();
        let fsm = Fsm::new(store);
        let err = fsm.apply_one(b"SELECT x FROM missing").unwrap_err();
        assert!(err.contains("missing"));
    }

    #[test]
    fn apply_one_rejects_non_utf8_payloads() {
        let (_dir, store) = setup();
        let fsm = Fsm::new(store);
        let err = fsm.apply_one(&[0xff, 0xfe]).unwrap_err();
        assert!(!err.is_empty());
    }
}
