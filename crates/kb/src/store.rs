//! Durable lookup cache in a redb file.
//!
//! Two key/value tables, both keyed by exact string match:
//! - `entity`: entity id -> semicolon-joined parent type ids
//! - `token`: probed text -> semicolon-joined candidate entity ids
//!
//! Writes are insert-or-ignore: when two workers miss on the same key, the
//! second write is dropped instead of overwriting the first.

use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::EntityId;
use crate::error::{KbError, unavailable};

type IdTable = TableDefinition<'static, &'static str, &'static str>;

const ENTITY_TABLE: IdTable = TableDefinition::new("entity");
const TOKEN_TABLE: IdTable = TableDefinition::new("token");

const SEPARATOR: char = ';';

/// Cheap to clone; clones share one database handle.
#[derive(Clone)]
pub struct CacheStore {
    db: Arc<Database>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct StoreStats {
    pub entities: u64,
    pub tokens: u64,
}

impl CacheStore {
    /// Open or create the cache file, creating both tables.
    pub fn open(path: &Path) -> Result<Self, KbError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(unavailable)?;
        }

        let db = Database::create(path).map_err(unavailable)?;

        let txn = db.begin_write().map_err(unavailable)?;
        txn.open_table(ENTITY_TABLE).map_err(unavailable)?;
        txn.open_table(TOKEN_TABLE).map_err(unavailable)?;
        txn.commit().map_err(unavailable)?;

        Ok(Self { db: Arc::new(db) })
    }

    pub async fn parent_types(&self, entity: &str) -> Result<Option<Vec<EntityId>>, KbError> {
        self.get(ENTITY_TABLE, entity).await
    }

    pub async fn put_parent_types(&self, entity: &str, parents: &[EntityId]) -> Result<bool, KbError> {
        self.put_if_absent(ENTITY_TABLE, entity, parents).await
    }

    pub async fn candidates(&self, text: &str) -> Result<Option<Vec<EntityId>>, KbError> {
        self.get(TOKEN_TABLE, text).await
    }

    pub async fn put_candidates(&self, text: &str, candidates: &[EntityId]) -> Result<bool, KbError> {
        self.put_if_absent(TOKEN_TABLE, text, candidates).await
    }

    pub fn stats(&self) -> Result<StoreStats, KbError> {
        let txn = self.db.begin_read().map_err(unavailable)?;
        let entities = txn.open_table(ENTITY_TABLE).map_err(unavailable)?.len().map_err(unavailable)?;
        let tokens = txn.open_table(TOKEN_TABLE).map_err(unavailable)?.len().map_err(unavailable)?;
        Ok(StoreStats { entities, tokens })
    }

    /// redb transactions block (a write commit syncs the file), so they run
    /// on tokio's blocking pool.
    async fn get(&self, table: IdTable, key: &str) -> Result<Option<Vec<EntityId>>, KbError> {
        let db = Arc::clone(&self.db);
        let key = key.to_string();

        tokio::task::spawn_blocking(move || read_ids(&db, table, &key))
            .await
            .map_err(|e| unavailable(format!("cache read task failed: {}", e)))?
    }

    /// Returns `true` when the key was new.
    async fn put_if_absent(&self, table: IdTable, key: &str, ids: &[EntityId]) -> Result<bool, KbError> {
        let db = Arc::clone(&self.db);
        let key = key.to_string();
        let encoded = encode_ids(ids);

        tokio::task::spawn_blocking(move || insert_if_absent(&db, table, &key, &encoded))
            .await
            .map_err(|e| unavailable(format!("cache write task failed: {}", e)))?
    }
}

fn read_ids(db: &Database, table: IdTable, key: &str) -> Result<Option<Vec<EntityId>>, KbError> {
    let txn = db.begin_read().map_err(unavailable)?;
    let table = txn.open_table(table).map_err(unavailable)?;
    let value = table.get(key).map_err(unavailable)?;
    Ok(value.map(|v| decode_ids(v.value())))
}

fn insert_if_absent(db: &Database, table: IdTable, key: &str, encoded: &str) -> Result<bool, KbError> {
    let txn = db.begin_write().map_err(unavailable)?;
    let inserted = {
        let mut table = txn.open_table(table).map_err(unavailable)?;
        let exists = table.get(key).map_err(unavailable)?.is_some();
        if !exists {
            table.insert(key, encoded).map_err(unavailable)?;
        }
        !exists
    };
    txn.commit().map_err(unavailable)?;
    Ok(inserted)
}

pub fn encode_ids(ids: &[EntityId]) -> String {
    ids.join(&SEPARATOR.to_string())
}

pub fn decode_ids(value: &str) -> Vec<EntityId> {
    value
        .split(SEPARATOR)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<EntityId> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_decode_tolerates_trailing_separator() {
        assert_eq!(decode_ids("Q5;Q215627;"), ids(&["Q5", "Q215627"]));
        assert!(decode_ids("").is_empty());
        assert_eq!(encode_ids(&ids(&["Q1", "Q2"])), "Q1;Q2");
    }

    #[tokio::test]
    async fn test_store_insert_or_ignore() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(&dir.path().join("cache/entity_linking.redb")).unwrap();

        assert_eq!(store.parent_types("Q2616791").await.unwrap(), None);
        assert!(store.put_parent_types("Q2616791", &ids(&["Q515", "Q486972"])).await.unwrap());
        assert!(!store.put_parent_types("Q2616791", &ids(&["Q1"])).await.unwrap());
        assert_eq!(store.parent_types("Q2616791").await.unwrap(), Some(ids(&["Q515", "Q486972"])));

        // empty answers are cached too
        assert!(store.put_candidates("xyzzy", &[]).await.unwrap());
        assert_eq!(store.candidates("xyzzy").await.unwrap(), Some(Vec::new()));

        let stats = store.stats().unwrap();
        assert_eq!(stats.entities, 1);
        assert_eq!(stats.tokens, 1);
    }

    #[tokio::test]
    async fn test_store_reopen_keeps_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.redb");
        {
            let store = CacheStore::open(&path).unwrap();
            store.put_candidates("Nowy Targ", &ids(&["Q2616791"])).await.unwrap();
        }
        let store = CacheStore::open(&path).unwrap();
        assert_eq!(store.candidates("Nowy Targ").await.unwrap(), Some(ids(&["Q2616791"])));
    }

    #[tokio::test]
    async fn test_concurrent_writers_insert_once() {
        let dir = tempfile::tempdir().unwrap();
        let store = CacheStore::open(&dir.path().join("kb.redb")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.put_candidates("Kraków", &[format!("Q{}", i)]).await })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() {
                inserted += 1;
            }
        }
        assert_eq!(inserted, 1);
        assert_eq!(store.stats().unwrap().tokens, 1);
    }

    #[test]
    fn test_open_unusable_path_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be opened as a database file
        let err = CacheStore::open(dir.path()).err().unwrap();
        assert!(err.is_fatal());
    }
}
