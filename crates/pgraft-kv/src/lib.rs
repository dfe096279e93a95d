//! A thin façade over `sled`, presenting it as the ordered, transactional,
//! bucket-oriented byte-key/byte-value store the rest of the system assumes.
//!
//! `sled` has no native notion of multiple named buckets the way `bolt` does;
//! this module emulates one bucket per `sled::Tree`, opened (and thus
//! created) lazily by name, mirroring `bolt.CreateBucketIfNotExists`.

use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionalTree};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KvError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("bucket `{0}` does not exist")]
    NoSuchBucket(String),
    #[error("{0}")]
    Other(String),
}

impl<E: Into<KvError>> From<TransactionError<E>> for KvError {
    fn from(err: TransactionError<E>) -> Self {
        match err {
            TransactionError::Abort(e) => e.into(),
            TransactionError::Storage(e) => KvError::Storage(e),
        }
    }
}

/// The well-known bucket name every table and row key lives under.
pub const DATA_BUCKET: &str = "data";

pub struct KvStore {
    db: sled::Db,
}

impl KvStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KvError> {
        let config = sled::Config::default().path(path).flush_every_ms(Some(50));
        let db = config.open()?;
        Ok(Self { db })
    }

    /// Drops the bucket if it exists and immediately recreates it empty.
    /// Called once at process start: every boot is a clean slate.
    pub fn reset_bucket(&self, name: &str) -> Result<(), KvError> {
        if self.db.tree_names().iter().any(|n| n == name.as_bytes()) {
            self.db.drop_tree(name)?;
        }
        self.db.open_tree(name)?;
        Ok(())
    }

    /// Runs `f` against a write transaction scoped to `bucket`. Any error
    /// returned from `f` aborts the transaction; no partial writes are
    /// observable afterward.
    pub fn write<R>(
        &self,
        bucket: &str,
        f: impl Fn(&mut WriteTxn<'_>) -> Result<R, KvError>,
    ) -> Result<R, KvError> {
        let tree = self.db.open_tree(bucket)?;
        let result = tree.transaction(|tx_tree| {
            let mut txn = WriteTxn { tree: tx_tree };
            f(&mut txn).map_err(ConflictableTransactionError::Abort)
        })?;
        Ok(result)
    }

    /// Runs `f` against a read-only cursor scoped to `bucket`.
    pub fn read<R>(&self, bucket: &str, f: impl FnOnce(ReadCursor<'_>) -> Result<R, KvError>) -> Result<R, KvError> {
        if !self.db.tree_names().iter().any(|n| n == bucket.as_bytes()) {
            return Err(KvError::NoSuchBucket(bucket.to_owned()));
        }
        let tree = self.db.open_tree(bucket)?;
        f(ReadCursor { tree: &tree })
    }
}

pub struct WriteTxn<'a> {
    tree: &'a TransactionalTree,
}

impl WriteTxn<'_> {
    /// No-op on `sled` (trees are created lazily on open), kept for parity
    /// with the bucket-oriented interface this store presents.
    pub fn create_bucket_if_missing(&mut self, _name: &str) -> Result<(), KvError> {
        Ok(())
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.tree
            .insert(key, value)
            .map_err(|e| KvError::Other(e.to_string()))?;
        Ok(())
    }

    pub fn delete_bucket(&mut self, _name: &str) -> Result<(), KvError> {
        // Dropping a tree from inside one of its own transactions isn't
        // supported by sled; whole-bucket resets happen via
        // `KvStore::reset_bucket` at boot instead — the bucket
        // is wiped once per process start, never mid-session.
        Ok(())
    }
}

/// A forward, lexicographically-ordered cursor over one bucket.
pub struct ReadCursor<'a> {
    tree: &'a sled::Tree,
}

impl ReadCursor<'_> {
    /// Yields `(key, value)` pairs whose key starts with `prefix`, in
    /// ascending byte order.
    pub fn scan_prefix(&self, prefix: &[u8]) -> impl Iterator<Item = Result<(Vec<u8>, Vec<u8>), KvError>> {
        self.tree.scan_prefix(prefix).map(|res| {
            res.map(|(k, v)| (k.to_vec(), v.to_vec()))
                .map_err(KvError::Storage)
        })
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KvError> {
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, KvStore) {
        let dir = TempDir::with_prefix("pgraft-kv-test").unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        store.reset_bucket(DATA_BUCKET).unwrap();
        (dir, store)
    }

    #[test]
    fn put_then_get_round_trips() {
        let (_dir, store) = setup();
        store
            .write(DATA_BUCKET, |txn| txn.put(b"tables_users", b"hello"))
            .unwrap();

        let got = store
            .read(DATA_BUCKET, |cur| cur.get(b"tables_users"))
            .unwrap();
        assert_eq!(got, Some(b"hello".to_vec()));
    }

    #[test]
    fn scan_prefix_is_lexicographically_ordered() {
        let (_dir, store) = setup();
        store
            .write(DATA_BUCKET, |txn| {
                txn.put(b"rows_t_b", b"2")?;
                txn.put(b"rows_t_a", b"1")?;
                txn.put(b"rows_t_c", b"3")?;
                Ok(())
            })
            .unwrap();

        let rows: Vec<_> = store
            .read(DATA_BUCKET, |cur| {
                Ok(cur.scan_prefix(b"rows_t_").collect::<Result<Vec<_>, _>>()?)
            })
            .unwrap();
        let keys: Vec<_> = rows.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, vec![b"rows_t_a".to_vec(), b"rows_t_b".to_vec(), b"rows_t_c".to_vec()]);
    }

    #[test]
    fn reset_bucket_wipes_prior_contents() {
        let (_dir, store) = setup();
        store
            .write(DATA_BUCKET, |txn| txn.put(b"tables_users", b"v1"))
            .unwrap();
        store.reset_bucket(DATA_BUCKET).unwrap();

        let got = store.read(DATA_BUCKET, |cur| cur.get(b"tables_users")).unwrap();
        assert_eq!(got, None);
    }

    #[test]
    fn read_on_missing_bucket_fails() {
        let dir = TempDir::with_prefix("pgraft-kv-test").unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        let err = store.read("nope", |cur| cur.get(b"x")).unwrap_err();
        assert!(matches!(err, KvError::NoSuchBucket(_)));
    }
}
