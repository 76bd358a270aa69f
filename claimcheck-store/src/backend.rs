use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::StoreResult;

/// Storage primitives for payload blobs - implemented by concrete backends
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Create the container if it does not already exist
    async fn ensure_container(&self, container: &str) -> StoreResult<()>;

    /// Upload a blob, overwriting any existing blob with the same name
    async fn put(
        &self,
        container: &str,
        blob: &str,
        body: Bytes,
        options: PutOptions,
    ) -> StoreResult<()>;

    /// Download the full contents of a blob
    async fn download(&self, container: &str, blob: &str) -> StoreResult<Bytes>;

    /// Delete a blob. Deleting a missing blob fails with `StoreError::NotFound`
    async fn delete(&self, container: &str, blob: &str) -> StoreResult<()>;
}

/// Options applied when uploading a blob
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub access_tier: Option<AccessTier>,
    pub encryption: Option<EncryptionOptions>,
}

impl PutOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the content type header
    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the access tier
    pub fn with_access_tier(mut self, tier: AccessTier) -> Self {
        self.access_tier = Some(tier);
        self
    }

    /// Set the encryption options
    pub fn with_encryption(mut self, encryption: EncryptionOptions) -> Self {
        self.encryption = Some(encryption);
        self
    }
}

/// Storage tier hint for uploaded blobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessTier {
    Hot,
    Cool,
    Archive,
}

/// Error returned when parsing an unknown access tier name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown blob access tier: {0}")]
pub struct UnknownAccessTier(pub String);

impl FromStr for AccessTier {
    type Err = UnknownAccessTier;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "hot" => Ok(Self::Hot),
            "cool" => Ok(Self::Cool),
            "archive" => Ok(Self::Archive),
            _ => Err(UnknownAccessTier(value.to_string())),
        }
    }
}

impl fmt::Display for AccessTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hot => "Hot",
            Self::Cool => "Cool",
            Self::Archive => "Archive",
        };
        write!(f, "{}", name)
    }
}

/// Encryption hints forwarded to the backend at upload time.
///
/// Backends must either apply these or fail the upload; they are never
/// silently dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptionOptions {
    pub encryption_scope: Option<String>,
    pub customer_provided_key: Option<String>,
}

impl EncryptionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the encryption scope name
    pub fn with_encryption_scope<S: Into<String>>(mut self, scope: S) -> Self {
        self.encryption_scope = Some(scope.into());
        self
    }

    /// Set the customer-provided encryption key
    pub fn with_customer_provided_key<S: Into<String>>(mut self, key: S) -> Self {
        self.customer_provided_key = Some(key.into());
        self
    }

    /// Check whether any encryption hint is present
    pub fn is_configured(&self) -> bool {
        self.encryption_scope.is_some() || self.customer_provided_key.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_tier_parses_case_insensitively() {
        assert_eq!("Hot".parse::<AccessTier>().unwrap(), AccessTier::Hot);
        assert_eq!("cool".parse::<AccessTier>().unwrap(), AccessTier::Cool);
        assert_eq!("ARCHIVE".parse::<AccessTier>().unwrap(), AccessTier::Archive);
    }

    #[test]
    fn test_access_tier_rejects_unknown_names() {
        let result = "glacier".parse::<AccessTier>();
        assert_eq!(result, Err(UnknownAccessTier("glacier".to_string())));
    }

    #[test]
    fn test_encryption_options_configured() {
        assert!(!EncryptionOptions::new().is_configured());
        assert!(EncryptionOptions::new()
            .with_encryption_scope("scope-a")
            .is_configured());
        assert!(EncryptionOptions::new()
            .with_customer_provided_key("key-bytes")
            .is_configured());
    }
}
