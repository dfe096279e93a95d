//! A single-node-durable log store: every `AppendEntries` write lands in a
//! `sled::Tree` under the node's raft directory before the call returns,
//! so a crash-and-restart can replay committed entries (the FSM itself
//! still starts from a wiped KV bucket every boot, but the
//! log the FSM replays against survives).

use crate::type_config::TypeConfig;
use openraft::storage::{IOFlushed, LogState, RaftLogReader, RaftLogStorage};
use openraft::{AnyError, Entry, LogId, OptionalSend, StorageError, StorageIOError, Vote};
use std::fmt::Debug;
use std::ops::RangeBounds;
use std::path::Path;

#[derive(Clone)]
pub struct LogStore {
    entries: sled::Tree,
    meta: sled::Tree,
}

const VOTE_KEY: &[u8] = b"vote";

impl LogStore {
    pub fn open(raft_dir: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::Config::default().path(raft_dir).open()?;
        Ok(Self {
            entries: db.open_tree("log_entries")?,
            meta: db.open_tree("log_meta")?,
        })
    }

    fn io_err(e: impl std::error::Error + 'static, verb: openraft::ErrorVerb) -> StorageError<TypeConfig> {
        StorageError::IO {
            source: StorageIOError::new(openraft::ErrorSubject::Logs, verb, AnyError::new(&e)),
        }
    }
}

impl RaftLogReader<TypeConfig> for LogStore {
    async fn try_get_log_entries<RB: RangeBounds<u64> + Clone + Debug + OptionalSend>(
        &mut self,
        range: RB,
    ) -> Result<Vec<Entry<TypeConfig>>, StorageError<TypeConfig>> {
        let mut out = Vec::new();
        for item in self.entries.iter() {
            let (k, v) = item.map_err(|e| Self::io_err(e, openraft::ErrorVerb::Read))?;
            let index = u64::from_be_bytes(k.as_ref().try_into().unwrap_or([0; 8]));
            if range.contains(&index) {
                let entry: Entry<TypeConfig> =
                    serde_json::from_slice(&v).map_err(|e| Self::io_err(e, openraft::ErrorVerb::Read))?;
                out.push(entry);
            }
        }
        Ok(out)
    }
}

impl RaftLogStorage<TypeConfig> for LogStore {
    type LogReader = Self;

    async fn get_log_state(&mut self) -> Result<LogState<TypeConfig>, StorageError<TypeConfig>> {
        let last = self
            .entries
            .last()
            .map_err(|e| Self::io_err(e, openraft::ErrorVerb::Read))?
            .map(|(_, v)| serde_json::from_slice::<Entry<TypeConfig>>(&v))
            .transpose()
            .map_err(|e| Self::io_err(e, openraft::ErrorVerb::Read))?;
        Ok(LogState {
            last_purged_log_id: None,
            last_log_id: last.map(|e| e.log_id),
        })
    }

    async fn save_vote(&mut self, vote: &Vote<u64>) -> Result<(), StorageError<TypeConfig>> {
        let bytes = serde_json::to_vec(vote).map_err(|e| Self::io_err(e, openraft::ErrorVerb::Write))?;
        self.meta
            .insert(VOTE_KEY, bytes)
            .map_err(|e| Self::io_err(e, openraft::ErrorVerb::Write))?;
        Ok(())
    }

    async fn read_vote(&mut self) -> Result<Option<Vote<u64>>, StorageError<TypeConfig>> {
        let bytes = self
            .meta
            .get(VOTE_KEY)
            .map_err(|e| Self::io_err(e, openraft::ErrorVerb::Read))?;
        bytes
            .map(|b| serde_json::from_slice(&b))
            .transpose()
            .map_err(|e| Self::io_err(e, openraft::ErrorVerb::Read))
    }

    async fn append<I>(&mut self, entries: I, callback: IOFlushed<TypeConfig>) -> Result<(), StorageError<TypeConfig>>
    where
        I: IntoIterator<Item = Entry<TypeConfig>> + OptionalSend,
    {
        for entry in entries {
            let key = entry.log_id.index.to_be_bytes();
            let value = serde_json::to_vec(&entry).map_err(|e| Self::io_err(e, openraft::ErrorVerb::Write))?;
            self.entries
                .insert(key, value)
                .map_err(|e| Self::io_err(e, openraft::ErrorVerb::Write))?;
        }
        self.entries.flush_async().await.map_err(|e| Self::io_err(e, openraft::ErrorVerb::Write))?;
        callback.io_completed(Ok(()));
        Ok(())
    }

    async fn truncate(&mut self, log_id: LogId<u64>) -> Result<(), StorageError<TypeConfig>> {
        let keys: Vec<_> = self
            .entries
            .range(log_id.index.to_be_bytes().to_vec()..)
            .keys()
            .filter_map(|k| k.ok())
            .collect();
        for key in keys {
            self.entries.remove(key).map_err(|e| Self::io_err(e, openraft::ErrorVerb::Write))?;
        }
        Ok(())
    }

    async fn purge(&mut self, log_id: LogId<u64>) -> Result<(), StorageError<TypeConfig>> {
        let keys: Vec<_> = self
            .entries
            .range(..=log_id.index.to_be_bytes().to_vec())
            .keys()
            .filter_map(|k| k.ok())
            .collect();
        for key in keys {
            self.entries.remove(key).map_err(|e| Self::io_err(e, openraft::ErrorVerb::Write))?;
        }
        Ok(())
    }

    async fn get_log_reader(&mut self) -> Self::LogReader {
        self.clone()
    }
}
