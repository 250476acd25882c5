// src/storage/rocks.rs
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, WriteOptions, DB};
use tracing::{error, info};

use super::{duplicate, TemplateStore};
use crate::{
    core::identity::types::StoredTemplate,
    utils::error::{FaceError, Result},
};

const FACE_PREFIX: &[u8] = b"face:";
const TEMPLATE_PREFIX: &[u8] = b"tpl:";
// first key after every "tpl:" key
const TEMPLATE_UPPER: &[u8] = b"tpl;";

/// RocksDB backend.
///
/// Layout: `face:{id}` → sequence number (big endian), `tpl:{seq:020}` →
/// JSON record. Iterating the `tpl:` range yields insertion order.
pub struct RocksTemplateStore {
    db: DB,
    // guards the uniqueness check and holds the next sequence number
    next_seq: Mutex<u64>,
}

impl RocksTemplateStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Create directory if it doesn't exist
        if !path.exists() {
            std::fs::create_dir_all(path)
                .map_err(|e| FaceError::Storage(format!("Failed to create storage directory: {}", e)))?;
        }

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_keep_log_file_num(10);
        opts.set_max_open_files(1000);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)
            .map_err(|e| FaceError::Storage(format!("Failed to open database: {}", e)))?;

        let next_seq = last_sequence(&db)?.map_or(0, |seq| seq + 1);
        info!("Opened template database at {:?} ({} records)", path, next_seq);

        Ok(Self {
            db,
            next_seq: Mutex::new(next_seq),
        })
    }
}

fn face_key(face_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(FACE_PREFIX.len() + face_id.len());
    key.extend_from_slice(FACE_PREFIX);
    key.extend_from_slice(face_id.as_bytes());
    key
}

fn template_key(seq: u64) -> Vec<u8> {
    format!("tpl:{:020}", seq).into_bytes()
}

fn parse_template_key(key: &[u8]) -> Option<u64> {
    std::str::from_utf8(key.strip_prefix(TEMPLATE_PREFIX)?)
        .ok()?
        .parse()
        .ok()
}

fn last_sequence(db: &DB) -> Result<Option<u64>> {
    let mut iter = db.iterator(IteratorMode::From(TEMPLATE_UPPER, Direction::Reverse));
    match iter.next() {
        Some(item) => {
            let (key, _) = item
                .map_err(|e| FaceError::Storage(format!("Database read failed: {}", e)))?;
            Ok(parse_template_key(&key))
        }
        None => Ok(None),
    }
}

#[async_trait]
impl TemplateStore for RocksTemplateStore {
    async fn insert(&self, record: StoredTemplate) -> Result<()> {
        let mut next_seq = self.next_seq.lock();

        let id_key = face_key(&record.face_id);
        let existing = self.db
            .get(&id_key)
            .map_err(|e| FaceError::Storage(format!("Database read failed: {}", e)))?;
        if existing.is_some() {
            return Err(duplicate(&record.face_id));
        }

        let seq = *next_seq;
        let value = serde_json::to_vec(&record)
            .map_err(|e| FaceError::Storage(format!("Serialization failed: {}", e)))?;

        let mut batch = WriteBatch::default();
        batch.put(&id_key, seq.to_be_bytes());
        batch.put(template_key(seq), value);

        let mut write_opts = WriteOptions::default();
        write_opts.set_sync(true);
        self.db
            .write_opt(batch, &write_opts)
            .map_err(|e| FaceError::Storage(format!("Database write failed: {}", e)))?;

        *next_seq += 1;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<StoredTemplate>> {
        let mut records = Vec::new();
        let mut unreadable = 0usize;

        for item in self.db.iterator(IteratorMode::From(TEMPLATE_PREFIX, Direction::Forward)) {
            let (key, value) = item
                .map_err(|e| FaceError::Storage(format!("Database read failed: {}", e)))?;
            if !key.starts_with(TEMPLATE_PREFIX) {
                break;
            }

            match serde_json::from_slice::<StoredTemplate>(&value) {
                Ok(record) => records.push(record),
                Err(e) => {
                    error!(
                        key = %String::from_utf8_lossy(&key),
                        "Skipping unreadable template record: {}", e
                    );
                    unreadable += 1;
                }
            }
        }

        // A database of nothing but corrupt records must not read as empty
        if records.is_empty() && unreadable > 0 {
            return Err(FaceError::Storage(format!(
                "all {} template records are unreadable",
                unreadable
            )));
        }

        Ok(records)
    }

    async fn contains(&self, face_id: &str) -> Result<bool> {
        let found = self.db
            .get_pinned(face_key(face_id))
            .map_err(|e| FaceError::Storage(format!("Database read failed: {}", e)))?;
        Ok(found.is_some())
    }

    async fn count(&self) -> Result<usize> {
        Ok(*self.next_seq.lock() as usize)
    }

    async fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| FaceError::Storage(format!("Database flush failed: {}", e)))
    }

    fn backend_name(&self) -> &'static str {
        "rocksdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn record(id: &str) -> StoredTemplate {
        StoredTemplate::new(id, None, vec![7; 40])
    }

    #[tokio::test]
    async fn test_insertion_order_survives_reopen() {
        let temp_dir = tempdir().unwrap();
        {
            let store = RocksTemplateStore::open(temp_dir.path()).unwrap();
            for id in ["zeta", "alpha", "mid"] {
                store.insert(record(id)).await.unwrap();
            }
        }

        let store = RocksTemplateStore::open(temp_dir.path()).unwrap();
        let ids: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.face_id)
            .collect();
        assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
        assert_eq!(store.count().await.unwrap(), 3);

        // sequence numbering continues after reopen
        store.insert(record("late")).await.unwrap();
        let last = store.list_all().await.unwrap().pop().unwrap();
        assert_eq!(last.face_id, "late");
    }

    #[tokio::test]
    async fn test_duplicate_identifier() {
        let temp_dir = tempdir().unwrap();
        let store = RocksTemplateStore::open(temp_dir.path()).unwrap();

        store.insert(record("u1")).await.unwrap();
        assert!(store.contains("u1").await.unwrap());
        assert!(!store.contains("u2").await.unwrap());

        let err = store.insert(record("u1")).await.unwrap_err();
        assert!(matches!(err, FaceError::DuplicateIdentifier(_)));
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_have_one_winner() {
        let temp_dir = tempdir().unwrap();
        let store = Arc::new(RocksTemplateStore::open(temp_dir.path()).unwrap());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert(record("race")).await })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreadable_records_are_skipped() {
        let temp_dir = tempdir().unwrap();
        let store = RocksTemplateStore::open(temp_dir.path()).unwrap();

        store.insert(record("u1")).await.unwrap();
        store.db.put(template_key(1), b"not json").unwrap();

        let records = store.list_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].face_id, "u1");
    }

    #[tokio::test]
    async fn test_only_unreadable_records_is_a_storage_error() {
        let temp_dir = tempdir().unwrap();
        let store = RocksTemplateStore::open(temp_dir.path()).unwrap();

        store.db.put(template_key(0), b"not json").unwrap();
        store.db.put(template_key(1), b"{}").unwrap();

        let err = store.list_all().await.unwrap_err();
        assert!(matches!(err, FaceError::Storage(_)));
    }

    #[test]
    fn test_template_key_ordering() {
        assert!(template_key(9) < template_key(10));
        assert_eq!(parse_template_key(&template_key(42)), Some(42));
        assert!(template_key(u64::MAX).as_slice() < TEMPLATE_UPPER);
    }
}
