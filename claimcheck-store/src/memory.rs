use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::backend::{AccessTier, BlobBackend, EncryptionOptions, PutOptions};
use crate::{StoreError, StoreResult};

/// A stored blob plus the options observed at put time
#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub access_tier: Option<AccessTier>,
    pub encryption: Option<EncryptionOptions>,
}

/// In-memory blob backend for testing and development.
///
/// Records the options applied to each upload and counts puts so tests can
/// assert on backend traffic. Fault injection hooks fail the next matching
/// operation once.
#[derive(Clone, Default)]
pub struct MemoryBlobBackend {
    containers: Arc<RwLock<HashMap<String, HashMap<String, StoredBlob>>>>,
    puts: Arc<AtomicUsize>,
    fail_next_put: Arc<AtomicBool>,
    fail_next_download: Arc<AtomicBool>,
    fail_next_delete: Arc<AtomicBool>,
}

impl MemoryBlobBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of uploads performed, including overwrites
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Total number of blobs currently stored across all containers
    pub fn blob_count(&self) -> usize {
        self.containers.read().values().map(HashMap::len).sum()
    }

    /// Look up a stored blob
    pub fn blob(&self, container: &str, blob: &str) -> Option<StoredBlob> {
        self.containers.read().get(container)?.get(blob).cloned()
    }

    /// Check whether a container has been created
    pub fn container_exists(&self, container: &str) -> bool {
        self.containers.read().contains_key(container)
    }

    /// Fail the next `put` with a backend error
    pub fn fail_next_put(&self) {
        self.fail_next_put.store(true, Ordering::SeqCst);
    }

    /// Fail the next `download` with a backend error
    pub fn fail_next_download(&self) {
        self.fail_next_download.store(true, Ordering::SeqCst);
    }

    /// Fail the next `delete` with a backend error
    pub fn fail_next_delete(&self) {
        self.fail_next_delete.store(true, Ordering::SeqCst);
    }

    fn injected_failure(flag: &AtomicBool, operation: &str) -> Option<StoreError> {
        if flag.swap(false, Ordering::SeqCst) {
            Some(StoreError::backend(std::io::Error::other(format!(
                "injected {} failure",
                operation
            ))))
        } else {
            None
        }
    }
}

#[async_trait]
impl BlobBackend for MemoryBlobBackend {
    async fn ensure_container(&self, container: &str) -> StoreResult<()> {
        self.containers
            .write()
            .entry(container.to_string())
            .or_default();
        Ok(())
    }

    async fn put(
        &self,
        container: &str,
        blob: &str,
        body: Bytes,
        options: PutOptions,
    ) -> StoreResult<()> {
        if let Some(err) = Self::injected_failure(&self.fail_next_put, "put") {
            return Err(err);
        }

        let stored = StoredBlob {
            body,
            content_type: options.content_type,
            access_tier: options.access_tier,
            encryption: options.encryption,
        };

        self.containers
            .write()
            .entry(container.to_string())
            .or_default()
            .insert(blob.to_string(), stored);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn download(&self, container: &str, blob: &str) -> StoreResult<Bytes> {
        if let Some(err) = Self::injected_failure(&self.fail_next_download, "download") {
            return Err(err);
        }

        self.containers
            .read()
            .get(container)
            .and_then(|blobs| blobs.get(blob))
            .map(|stored| stored.body.clone())
            .ok_or_else(|| StoreError::not_found(container, blob))
    }

    async fn delete(&self, container: &str, blob: &str) -> StoreResult<()> {
        if let Some(err) = Self::injected_failure(&self.fail_next_delete, "delete") {
            return Err(err);
        }

        let removed = self
            .containers
            .write()
            .get_mut(container)
            .and_then(|blobs| blobs.remove(blob));

        match removed {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(container, blob)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_download() {
        let backend = MemoryBlobBackend::new();

        backend
            .put(
                "payloads",
                "blob-1",
                Bytes::from_static(b"hello"),
                PutOptions::new().with_content_type("text/plain"),
            )
            .await
            .unwrap();

        let body = backend.download("payloads", "blob-1").await.unwrap();
        assert_eq!(body, Bytes::from_static(b"hello"));
        assert_eq!(backend.put_count(), 1);

        let stored = backend.blob("payloads", "blob-1").unwrap();
        assert_eq!(stored.content_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_download_missing_blob_is_not_found() {
        let backend = MemoryBlobBackend::new();

        let result = backend.download("payloads", "absent").await;

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_missing_blob_is_not_found() {
        let backend = MemoryBlobBackend::new();
        backend
            .put("payloads", "blob-1", Bytes::from_static(b"x"), PutOptions::new())
            .await
            .unwrap();

        backend.delete("payloads", "blob-1").await.unwrap();
        let second = backend.delete("payloads", "blob-1").await;

        assert!(matches!(second, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_ensure_container_is_idempotent() {
        let backend = MemoryBlobBackend::new();

        backend.ensure_container("payloads").await.unwrap();
        backend.ensure_container("payloads").await.unwrap();

        assert!(backend.container_exists("payloads"));
    }

    #[tokio::test]
    async fn test_injected_put_failure_fires_once() {
        let backend = MemoryBlobBackend::new();
        backend.fail_next_put();

        let first = backend
            .put("payloads", "b", Bytes::from_static(b"x"), PutOptions::new())
            .await;
        let second = backend
            .put("payloads", "b", Bytes::from_static(b"x"), PutOptions::new())
            .await;

        assert!(matches!(first, Err(StoreError::Backend { .. })));
        assert!(second.is_ok());
    }
}
