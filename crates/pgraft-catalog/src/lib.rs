//! The table catalog: `tables_<name>` keys holding a serialized
//! `TableDef`, one per `CREATE TABLE`.

use pgraft_kv::{KvError, KvStore, DATA_BUCKET};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("table `{0}` not found")]
    TableMissing(String),
    #[error("could not encode table definition: {0}")]
    EncodingError(#[from] bincode::Error),
    #[error("storage error: {0}")]
    StorageError(#[from] KvError),
}

/// A table's schema: a name plus two positionally-aligned parallel arrays.
///
/// `column_types` carry the parser's namespaced catalog prefix, e.g.
/// `pg_catalog.int4` for `INT`, bare `text` for `TEXT`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    pub name: String,
    pub column_names: Vec<String>,
    pub column_types: Vec<String>,
}

fn table_key(name: &str) -> Vec<u8> {
    format!("tables_{name}").into_bytes()
}

/// Serialize `def` and store it under `tables_<name>`. Re-creation of an
/// existing table silently overwrites, with no pre-existence check —
/// acceptable given the clean-slate lifecycle.
pub fn put_table(store: &KvStore, def: &TableDef) -> Result<(), CatalogError> {
    let bytes = bincode::serialize(def)?;
    store.write(DATA_BUCKET, |txn| {
        txn.create_bucket_if_missing(DATA_BUCKET)?;
        txn.put(&table_key(&def.name), &bytes)?;
        Ok(())
    })?;
    Ok(())
}

/// Deserialize the table definition stored under `tables_<name>`.
pub fn get_table(store: &KvStore, name: &str) -> Result<TableDef, CatalogError> {
    let bytes = store
        .read(DATA_BUCKET, |cur| cur.get(&table_key(name)))
        .map_err(|_| CatalogError::TableMissing(name.to_owned()))?
        .ok_or_else(|| CatalogError::TableMissing(name.to_owned()))?;
    Ok(bincode::deserialize(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, KvStore) {
        let dir = TempDir::with_prefix("pgraft-catalog-test").unwrap();
        let store = KvStore::open(dir.path()).unwrap();
        store.reset_bucket(DATA_BUCKET).unwrap();
        (dir, store)
    }

    #[test]
    fn round_trips_through_put_and_get() {
        let (_dir, store) = setup();
        let def = TableDef {
            name: "users".into(),
            column_names: vec!["id".into(), "name".into()],
            column_types: vec!["pg_catalog.int4".into(), "text".into()],
        };
        put_table(&store, &def).unwrap();
        let got = get_table(&store, "users").unwrap();
        assert_eq!(got, def);
    }

    #[test]
    fn recreating_a_table_overwrites_silently() {
        let (_dir, store) = setup();
        let v1 = TableDef {
            name: "t".into(),
            column_names: vec!["a".into()],
            column_types: vec!["text".into()],
        };
        let v2 = TableDef {
            name: "t".into(),
            column_names: vec!["a".into(), "b".into()],
            column_types: vec!["text".into(), "pg_catalog.int4".into()],
        };
        put_table(&store, &v1).unwrap();
        put_table(&store, &v2).unwrap();
        assert_eq!(get_table(&store, "t").unwrap(), v2);
    }

    #[test]
    fn missing_table_fails_with_table_missing() {
        let (_dir, store) = setup();
        let err = get_table(&store, "ghost").unwrap_err();
        assert!(matches!(err, CatalogError::TableMissing(name) if name == "ghost"));
    }
}
