// src/storage/file.rs
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{duplicate, TemplateStore};
use crate::{
    core::identity::types::StoredTemplate,
    utils::error::{FaceError, Result},
};

const STORE_FILE: &str = "templates.json";
const STORE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    templates: Vec<StoredTemplate>,
}

/// Single JSON file holding every record, mirrored in memory.
///
/// Each insert rewrites the file through a temp file and an atomic rename, so
/// the file on disk is always a complete snapshot. One process per file.
pub struct FileTemplateStore {
    path: PathBuf,
    records: RwLock<Vec<StoredTemplate>>,
}

impl FileTemplateStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .map_err(|e| FaceError::Storage(format!("Failed to create storage directory: {}", e)))?;

        let path = dir.join(STORE_FILE);
        let records = if path.exists() {
            read_store(&path)?
        } else {
            Vec::new()
        };
        info!("Loaded {} template(s) from {:?}", records.len(), path);

        Ok(Self {
            path,
            records: RwLock::new(records),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TemplateStore for FileTemplateStore {
    async fn insert(&self, record: StoredTemplate) -> Result<()> {
        let mut records = self.records.write();
        if records.iter().any(|existing| existing.face_id == record.face_id) {
            return Err(duplicate(&record.face_id));
        }

        records.push(record);
        if let Err(e) = write_store(&self.path, &records) {
            // keep memory and disk in agreement
            records.pop();
            return Err(e);
        }

        debug!("Persisted {} template(s) to {:?}", records.len(), self.path);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<StoredTemplate>> {
        Ok(self.records.read().clone())
    }

    async fn contains(&self, face_id: &str) -> Result<bool> {
        Ok(self.records.read().iter().any(|record| record.face_id == face_id))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().len())
    }

    async fn flush(&self) -> Result<()> {
        // every insert is already on disk
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}

fn read_store(path: &Path) -> Result<Vec<StoredTemplate>> {
    let data = fs::read(path)
        .map_err(|e| FaceError::Storage(format!("Failed to read {:?}: {}", path, e)))?;
    let file: StoreFile = serde_json::from_slice(&data)
        .map_err(|e| FaceError::Storage(format!("Invalid template store {:?}: {}", path, e)))?;

    if file.version != STORE_VERSION {
        return Err(FaceError::Storage(format!(
            "Unsupported template store version {}",
            file.version
        )));
    }

    let mut seen = std::collections::HashSet::new();
    for record in &file.templates {
        if !seen.insert(record.face_id.as_str()) {
            return Err(FaceError::Storage(format!(
                "Template store {:?} contains faceId {} twice",
                path, record.face_id
            )));
        }
    }

    Ok(file.templates)
}

fn write_store(path: &Path, records: &[StoredTemplate]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let write_err = |e: std::io::Error| FaceError::Storage(format!("Failed to write {:?}: {}", path, e));

    let mut tmp = NamedTempFile::new_in(parent).map_err(write_err)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        let snapshot = StoreFile {
            version: STORE_VERSION,
            templates: records.to_vec(),
        };
        serde_json::to_writer_pretty(&mut writer, &snapshot)
            .map_err(|e| FaceError::Storage(format!("Serialization failed: {}", e)))?;
        writer.flush().map_err(write_err)?;
    }
    tmp.as_file().sync_all().map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(write_err)?;
    }

    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn record(id: &str) -> StoredTemplate {
        StoredTemplate::new(id, Some(format!("name of {}", id)), vec![1, 2, 3, id.len() as u8])
    }

    #[tokio::test]
    async fn test_insert_list_and_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = FileTemplateStore::open(dir.path()).unwrap();
            store.insert(record("b")).await.unwrap();
            store.insert(record("a")).await.unwrap();
            store.insert(record("c")).await.unwrap();
        }

        let reopened = FileTemplateStore::open(dir.path()).unwrap();
        let ids: Vec<String> = reopened
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.face_id)
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        assert!(reopened.contains("a").await.unwrap());
        assert_eq!(reopened.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_duplicate_is_rejected_and_original_kept() {
        let dir = tempdir().unwrap();
        let store = FileTemplateStore::open(dir.path()).unwrap();
        let original = record("u1");
        store.insert(original.clone()).await.unwrap();

        let mut replacement = record("u1");
        replacement.template = vec![9, 9, 9];
        let err = store.insert(replacement).await.unwrap_err();
        assert!(matches!(err, FaceError::DuplicateIdentifier(ref id) if id == "u1"));

        let records = store.list_all().await.unwrap();
        assert_eq!(records, vec![original]);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_have_one_winner() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileTemplateStore::open(dir.path()).unwrap());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert(record("same")).await })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => wins += 1,
                Err(FaceError::DuplicateIdentifier(_)) => {}
                Err(other) => panic!("unexpected error: {:?}", other),
            }
        }
        assert_eq!(wins, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[test]
    fn test_corrupt_store_file_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(STORE_FILE), b"{ not json").unwrap();
        assert!(matches!(
            FileTemplateStore::open(dir.path()),
            Err(FaceError::Storage(_))
        ));
    }

    #[test]
    fn test_template_is_stored_as_hex() {
        let dir = tempdir().unwrap();
        let store = FileTemplateStore::open(dir.path()).unwrap();
        tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(store.insert(StoredTemplate::new("u1", None, vec![0xca, 0xfe])))
            .unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"cafe\""));
    }
}
