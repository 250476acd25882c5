// src/storage/mod.rs
pub mod file;
#[cfg(feature = "rocksdb")]
pub mod rocks;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::{
    core::identity::types::StoredTemplate,
    utils::{
        config::{StorageBackend, StorageConfig},
        error::{FaceError, Result},
    },
};

pub use file::FileTemplateStore;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksTemplateStore;

/// Durable identifier → encrypted template mapping.
///
/// Implementations only ever see ciphertext. `insert` is the single
/// authority on uniqueness: of any number of concurrent inserts for one
/// identifier exactly one succeeds and the rest get `DuplicateIdentifier`.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn insert(&self, record: StoredTemplate) -> Result<()>;

    /// Every record, in insertion order.
    async fn list_all(&self) -> Result<Vec<StoredTemplate>>;

    async fn contains(&self, face_id: &str) -> Result<bool>;

    async fn count(&self) -> Result<usize>;

    async fn flush(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn TemplateStore>> {
    info!("Opening {:?} template store at {}", config.backend, config.path);

    match config.backend {
        #[cfg(feature = "rocksdb")]
        StorageBackend::Rocksdb => Ok(Arc::new(RocksTemplateStore::open(&config.path)?)),
        #[cfg(not(feature = "rocksdb"))]
        StorageBackend::Rocksdb => Err(FaceError::Config(
            "rocksdb backend requested but the rocksdb feature is disabled".into(),
        )),
        StorageBackend::File => Ok(Arc::new(FileTemplateStore::open(&config.path)?)),
    }
}

pub(crate) fn duplicate(face_id: &str) -> FaceError {
    FaceError::DuplicateIdentifier(face_id.to_string())
}
