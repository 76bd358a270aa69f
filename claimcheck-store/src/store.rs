use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::backend::{AccessTier, BlobBackend, EncryptionOptions, PutOptions};
use crate::pointer::BlobPointer;
use crate::{StoreError, StoreResult};

/// Hints applied by the payload store when writing and reading blobs
#[derive(Debug, Clone, Default)]
pub struct StoreOptions {
    /// Access tier applied to every stored payload
    pub access_tier: Option<AccessTier>,

    /// Encryption hints applied to every stored payload
    pub encryption: Option<EncryptionOptions>,

    /// Treat a missing blob as an absent body instead of failing the read
    pub ignore_payload_not_found: bool,
}

/// Stores message payloads as blobs in a fixed container.
///
/// Payloads are written as UTF-8 `text/plain` blobs. The container is
/// created at construction time if absent and never deleted by this store.
#[derive(Clone)]
pub struct PayloadStore {
    backend: Arc<dyn BlobBackend>,
    container: String,
    options: StoreOptions,
}

impl PayloadStore {
    /// Create a store against `container`, creating the container if absent
    pub async fn new<C: Into<String>>(
        backend: Arc<dyn BlobBackend>,
        container: C,
    ) -> StoreResult<Self> {
        Self::with_options(backend, container, StoreOptions::default()).await
    }

    /// Create a store with explicit read/write hints
    pub async fn with_options<C: Into<String>>(
        backend: Arc<dyn BlobBackend>,
        container: C,
        options: StoreOptions,
    ) -> StoreResult<Self> {
        let container = container.into();
        backend.ensure_container(&container).await?;
        debug!(container = %container, "payload container ready");

        Ok(Self {
            backend,
            container,
            options,
        })
    }

    /// Name of the container this store writes into
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Hints this store applies
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    /// Store a payload under `blob_name` and return a pointer to it.
    /// Overwrites any existing blob with the same name.
    pub async fn store(&self, blob_name: &str, payload: &str) -> StoreResult<BlobPointer> {
        let mut put = PutOptions::new().with_content_type("text/plain");
        if let Some(tier) = self.options.access_tier {
            put = put.with_access_tier(tier);
        }
        if let Some(encryption) = &self.options.encryption {
            put = put.with_encryption(encryption.clone());
        }

        debug!(blob = blob_name, size = payload.len(), "storing payload blob");
        self.backend
            .put(
                &self.container,
                blob_name,
                Bytes::copy_from_slice(payload.as_bytes()),
                put,
            )
            .await?;

        Ok(BlobPointer::new(self.container.clone(), blob_name))
    }

    /// Fetch the payload a pointer refers to.
    ///
    /// Returns `None` when the blob is missing and the store is configured
    /// to ignore missing payloads; any other failure propagates.
    pub async fn get(&self, pointer: &BlobPointer) -> StoreResult<Option<String>> {
        let downloaded = self
            .backend
            .download(&pointer.container_name, &pointer.blob_name)
            .await;

        match downloaded {
            Ok(bytes) => {
                let body = String::from_utf8(bytes.to_vec()).map_err(|_| {
                    StoreError::InvalidPayload {
                        container: pointer.container_name.clone(),
                        blob: pointer.blob_name.clone(),
                    }
                })?;
                debug!(pointer = %pointer, size = body.len(), "payload retrieved");
                Ok(Some(body))
            }
            Err(err) if err.is_not_found() => {
                if self.options.ignore_payload_not_found {
                    warn!(pointer = %pointer, "payload blob not found, ignoring");
                    Ok(None)
                } else {
                    error!(pointer = %pointer, "payload blob not found");
                    Err(err)
                }
            }
            Err(err) => Err(err),
        }
    }

    /// Delete the blob a pointer refers to. Deleting an already-deleted blob
    /// is a no-op.
    pub async fn delete(&self, pointer: &BlobPointer) -> StoreResult<()> {
        let deleted = self
            .backend
            .delete(&pointer.container_name, &pointer.blob_name)
            .await;

        match deleted {
            Ok(()) => {
                debug!(pointer = %pointer, "payload blob deleted");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                debug!(pointer = %pointer, "payload blob already deleted");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBlobBackend;

    async fn store_with(options: StoreOptions) -> (PayloadStore, Arc<MemoryBlobBackend>) {
        let backend = Arc::new(MemoryBlobBackend::new());
        let store = PayloadStore::with_options(backend.clone(), "payloads", options)
            .await
            .unwrap();
        (store, backend)
    }

    #[tokio::test]
    async fn test_container_created_at_construction() {
        let (_store, backend) = store_with(StoreOptions::default()).await;

        assert!(backend.container_exists("payloads"));
    }

    #[tokio::test]
    async fn test_store_then_get_roundtrip() {
        let (store, backend) = store_with(StoreOptions::default()).await;

        let pointer = store.store("blob-1", "payload body").await.unwrap();
        let body = store.get(&pointer).await.unwrap();

        assert_eq!(pointer, BlobPointer::new("payloads", "blob-1"));
        assert_eq!(body.as_deref(), Some("payload body"));

        let stored = backend.blob("payloads", "blob-1").unwrap();
        assert_eq!(stored.content_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_store_forwards_tier_and_encryption() {
        let options = StoreOptions {
            access_tier: Some(AccessTier::Cool),
            encryption: Some(EncryptionOptions::new().with_encryption_scope("scope-a")),
            ignore_payload_not_found: false,
        };
        let (store, backend) = store_with(options).await;

        store.store("blob-1", "body").await.unwrap();

        let stored = backend.blob("payloads", "blob-1").unwrap();
        assert_eq!(stored.access_tier, Some(AccessTier::Cool));
        assert_eq!(
            stored.encryption,
            Some(EncryptionOptions::new().with_encryption_scope("scope-a"))
        );
    }

    #[tokio::test]
    async fn test_get_missing_blob_fails_by_default() {
        let (store, _backend) = store_with(StoreOptions::default()).await;
        let pointer = BlobPointer::new("payloads", "absent");

        let result = store.get(&pointer).await;

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_get_missing_blob_ignored_when_configured() {
        let options = StoreOptions {
            ignore_payload_not_found: true,
            ..StoreOptions::default()
        };
        let (store, _backend) = store_with(options).await;
        let pointer = BlobPointer::new("payloads", "absent");

        let body = store.get(&pointer).await.unwrap();

        assert_eq!(body, None);
    }

    #[tokio::test]
    async fn test_delete_twice_is_a_noop() {
        let (store, _backend) = store_with(StoreOptions::default()).await;
        let pointer = store.store("blob-1", "body").await.unwrap();

        store.delete(&pointer).await.unwrap();
        store.delete(&pointer).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_propagates_backend_failures() {
        let (store, backend) = store_with(StoreOptions::default()).await;
        let pointer = store.store("blob-1", "body").await.unwrap();
        backend.fail_next_delete();

        let result = store.delete(&pointer).await;

        assert!(matches!(result, Err(StoreError::Backend { .. })));
    }

    #[tokio::test]
    async fn test_store_overwrites_existing_blob() {
        let (store, backend) = store_with(StoreOptions::default()).await;

        store.store("blob-1", "first").await.unwrap();
        let pointer = store.store("blob-1", "second").await.unwrap();

        let body = store.get(&pointer).await.unwrap();
        assert_eq!(body.as_deref(), Some("second"));
        assert_eq!(backend.blob_count(), 1);
    }
}
