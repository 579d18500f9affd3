//! Asset storage collaborator boundary
//!
//! The engine never manipulates raw image bytes; it stores and fetches
//! them through opaque handles issued by an [`AssetStore`]. The bundled
//! [`MemoryAssetStore`] keeps blobs in process memory and is the default
//! for tests and single-process deployments.

use crate::error::{Result, TagcanvasError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// Opaque handle to a stored blob
///
/// Issued by an [`AssetStore`]; the engine treats it as an identity and
/// never inspects its contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageHandle(String);

impl StorageHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StorageHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Blob storage for uploaded assets and generated artifacts
///
/// Implementations own the bytes; the engine only keeps handles. All
/// blobs belonging to a session are destroyed together when the session
/// is deleted.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store a blob under a session, returning its handle
    async fn store(&self, session_id: Uuid, filename: &str, bytes: Vec<u8>)
        -> Result<StorageHandle>;

    /// Fetch the bytes behind a handle
    async fn fetch(&self, handle: &StorageHandle) -> Result<Vec<u8>>;

    /// Destroy every blob stored under a session
    async fn delete_all(&self, session_id: Uuid) -> Result<()>;
}

/// In-memory asset store
///
/// Handles are `mem://{session}/{filename}`. Suitable for tests and for
/// deployments where the compositing backend shares the process.
#[derive(Default)]
pub struct MemoryAssetStore {
    blobs: RwLock<HashMap<StorageHandle, (Uuid, Vec<u8>)>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently held
    pub fn len(&self) -> usize {
        self.blobs.read().expect("blob lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn store(
        &self,
        session_id: Uuid,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<StorageHandle> {
        let handle = StorageHandle::new(format!("mem://{session_id}/{filename}"));
        let mut blobs = self.blobs.write().expect("blob lock poisoned");
        blobs.insert(handle.clone(), (session_id, bytes));
        tracing::debug!(session = %session_id, %handle, "stored blob");
        Ok(handle)
    }

    async fn fetch(&self, handle: &StorageHandle) -> Result<Vec<u8>> {
        let blobs = self.blobs.read().expect("blob lock poisoned");
        blobs
            .get(handle)
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| {
                TagcanvasError::Collaborator {
                    collaborator: "storage",
                    message: format!("no blob for handle '{handle}'"),
                }
                .into()
            })
    }

    async fn delete_all(&self, session_id: Uuid) -> Result<()> {
        let mut blobs = self.blobs.write().expect("blob lock poisoned");
        let before = blobs.len();
        blobs.retain(|_, (owner, _)| *owner != session_id);
        tracing::debug!(
            session = %session_id,
            removed = before - blobs.len(),
            "deleted session blobs"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_and_fetch() {
        let store = MemoryAssetStore::new();
        let session = Uuid::new_v4();
        let handle = store.store(session, "a.png", vec![1, 2, 3]).await.unwrap();
        assert_eq!(store.fetch(&handle).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_unknown_handle_fails() {
        let store = MemoryAssetStore::new();
        let err = store
            .fetch(&StorageHandle::new("mem://nope"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TagcanvasError>(),
            Some(TagcanvasError::Collaborator {
                collaborator: "storage",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_delete_all_is_scoped_to_session() {
        let store = MemoryAssetStore::new();
        let keep = Uuid::new_v4();
        let purge = Uuid::new_v4();
        let kept = store.store(keep, "k.png", vec![0]).await.unwrap();
        store.store(purge, "p1.png", vec![1]).await.unwrap();
        store.store(purge, "p2.png", vec![2]).await.unwrap();

        store.delete_all(purge).await.unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.fetch(&kept).await.is_ok());
    }

    #[test]
    fn test_handle_serde_is_transparent() {
        let handle = StorageHandle::new("mem://s/f.png");
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, "\"mem://s/f.png\"");
        let parsed: StorageHandle = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, handle);
    }
}
