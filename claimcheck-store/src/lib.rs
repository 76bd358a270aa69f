//! # claimcheck-store: payload blob storage for the claimcheck extension
//!
//! Over-threshold message bodies are parked in a blob container and replaced
//! on the wire by a small pointer record. This crate owns the storage side of
//! that exchange:
//!
//! - **`BlobPointer`**: the two-field pointer record and its stable JSON wire
//!   form (`containerName` / `blobName`)
//! - **`BlobBackend`**: the capability trait concrete storage backends
//!   implement (container ensure, put, download, delete)
//! - **`PayloadStore`**: the semantic layer the messaging client talks to -
//!   store/get/delete with a not-found policy and optional tier/encryption
//!   hints
//! - **`MemoryBlobBackend`**: an in-memory backend for tests and development
//!
//! ```rust
//! use std::sync::Arc;
//! use claimcheck_store::{MemoryBlobBackend, PayloadStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), claimcheck_store::StoreError> {
//! let backend = Arc::new(MemoryBlobBackend::new());
//! let store = PayloadStore::new(backend, "payloads").await?;
//!
//! let pointer = store.store("blob-1", "a large message body").await?;
//! let body = store.get(&pointer).await?;
//! assert_eq!(body.as_deref(), Some("a large message body"));
//!
//! store.delete(&pointer).await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
mod error;
mod memory;
mod pointer;
mod store;

pub use backend::{
    AccessTier, BlobBackend, EncryptionOptions, PutOptions, UnknownAccessTier,
};
pub use error::{StoreError, StoreResult};
pub use memory::{MemoryBlobBackend, StoredBlob};
pub use pointer::{BlobPointer, PointerError};
pub use store::{PayloadStore, StoreOptions};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobBackend, BlobPointer, PayloadStore, StoreError, StoreOptions, StoreResult,
    };
}
