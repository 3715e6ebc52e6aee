use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::error::PersistError;

/// Receipt for one persisted variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    pub name: String,
    pub size_bytes: u64,
}

/// Persistence collaborator. Each call creates a new asset instance; the
/// pipeline never updates or deletes through this interface, and variants
/// persisted before a later failure are not retracted.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn create(&self, name: &str, bytes: &[u8]) -> Result<StoredAsset, PersistError>;
}

/// In-memory store for tests and embedders. Duplicate names are kept as
/// separate instances, matching create-new-instance semantics.
#[derive(Debug, Default)]
pub struct MemoryAssetStore {
    assets: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.assets.lock().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.assets
            .lock()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| b.clone())
    }

    pub fn len(&self) -> usize {
        self.assets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.lock().is_empty()
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn create(&self, name: &str, bytes: &[u8]) -> Result<StoredAsset, PersistError> {
        self.assets.lock().push((name.to_string(), bytes.to_vec()));
        Ok(StoredAsset {
            name: name.to_string(),
            size_bytes: bytes.len() as u64,
        })
    }
}

/// Directory-backed store used by the server binary. Duplicate names
/// overwrite the previous file (last write wins).
#[derive(Debug, Clone)]
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetStore for DirAssetStore {
    async fn create(&self, name: &str, bytes: &[u8]) -> Result<StoredAsset, PersistError> {
        // variant names come from user-supplied upload names
        if name.contains('/') || name.contains("..") {
            return Err(PersistError::Rejected {
                name: name.to_string(),
                reason: "asset name must not contain path components".to_string(),
            });
        }

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| PersistError::Io {
                name: name.to_string(),
                source,
            })?;
        tokio::fs::write(self.root.join(name), bytes)
            .await
            .map_err(|source| PersistError::Io {
                name: name.to_string(),
                source,
            })?;

        tracing::info!("persisted asset {name} ({} bytes)", bytes.len());
        Ok(StoredAsset {
            name: name.to_string(),
            size_bytes: bytes.len() as u64,
        })
    }
}
