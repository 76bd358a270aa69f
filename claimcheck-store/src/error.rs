use thiserror::Error;

/// Result type for payload store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while storing, fetching, or deleting payload blobs
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("blob not found: {container}/{blob}")]
    NotFound { container: String, blob: String },

    #[error("blob payload is not valid UTF-8: {container}/{blob}")]
    InvalidPayload { container: String, blob: String },

    #[error("storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl StoreError {
    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Create a not found error
    pub fn not_found<C, B>(container: C, blob: B) -> Self
    where
        C: Into<String>,
        B: Into<String>,
    {
        Self::NotFound {
            container: container.into(),
            blob: blob.into(),
        }
    }

    /// Check whether this error is the blob-not-found case
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
