use std::collections::HashMap;
use std::str::FromStr;

use claimcheck_store::{AccessTier, EncryptionOptions, StoreOptions};

use crate::error::ConfigError;
use crate::validate;

/// Default message size threshold: 256 KiB. Bodies longer than this are
/// offloaded to blob storage.
pub const DEFAULT_MESSAGE_SIZE_THRESHOLD: usize = 262_144;

/// Reserved property carrying the original payload size (modern name)
pub const RESERVED_ATTRIBUTE_NAME: &str = "ExtendedPayloadSize";

/// Legacy size property name. Default-on so consumers of the predecessor
/// system keep working unchanged.
pub const LEGACY_RESERVED_ATTRIBUTE_NAME: &str = "ServiceBusLargePayloadSize";

/// Marker property indicating the message body is a blob pointer
pub const BLOB_POINTER_MARKER: &str = "com.azure.servicebus.extended.BlobPointer";

/// Property stamping messages sent through the extended client
pub const EXTENDED_CLIENT_USER_AGENT: &str = "ExtendedClientUserAgent";

/// Value of the user-agent property
pub const USER_AGENT: &str = concat!("claimcheck-client/", env!("CARGO_PKG_VERSION"));

/// The broker allows 10 application properties per message; the extension
/// reserves one for itself.
pub const MAX_ALLOWED_PROPERTIES: usize = 9;

/// The four property names owned by the extension protocol
pub const RESERVED_PROPERTY_NAMES: [&str; 4] = [
    RESERVED_ATTRIBUTE_NAME,
    LEGACY_RESERVED_ATTRIBUTE_NAME,
    BLOB_POINTER_MARKER,
    EXTENDED_CLIENT_USER_AGENT,
];

/// Tunables for the extended client
#[derive(Debug, Clone)]
pub struct ExtendedConfig {
    /// Bodies longer than this (UTF-8 octets) are offloaded
    pub message_size_threshold: usize,

    /// Offload every message regardless of size
    pub always_through_blob: bool,

    /// Reclaim blobs during `delete_payload`
    pub cleanup_blob_on_delete: bool,

    /// Treat a missing blob as an empty body on receive
    pub ignore_payload_not_found: bool,

    /// Use the predecessor's size property name on outgoing messages
    pub use_legacy_reserved_attribute_name: bool,

    /// Master switch; when false, send and receive bypass the offload
    /// pipeline entirely
    pub payload_support_enabled: bool,

    /// Access tier hint forwarded to the payload store
    pub blob_access_tier: Option<AccessTier>,

    /// Encryption hints forwarded to the payload store
    pub encryption: Option<EncryptionOptions>,

    /// Ceiling on user-supplied application properties per message
    pub max_allowed_properties: usize,

    blob_key_prefix: String,
}

impl Default for ExtendedConfig {
    fn default() -> Self {
        Self {
            message_size_threshold: DEFAULT_MESSAGE_SIZE_THRESHOLD,
            always_through_blob: false,
            cleanup_blob_on_delete: true,
            ignore_payload_not_found: false,
            use_legacy_reserved_attribute_name: true,
            payload_support_enabled: true,
            blob_access_tier: None,
            encryption: None,
            max_allowed_properties: MAX_ALLOWED_PROPERTIES,
            blob_key_prefix: String::new(),
        }
    }
}

impl ExtendedConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the offload threshold in UTF-8 octets
    pub fn with_message_size_threshold(mut self, threshold: usize) -> Self {
        self.message_size_threshold = threshold;
        self
    }

    /// Force every message through blob storage
    pub fn with_always_through_blob(mut self, always: bool) -> Self {
        self.always_through_blob = always;
        self
    }

    /// Enable or disable blob reclamation on delete
    pub fn with_cleanup_blob_on_delete(mut self, cleanup: bool) -> Self {
        self.cleanup_blob_on_delete = cleanup;
        self
    }

    /// Treat missing blobs as empty bodies on receive
    pub fn with_ignore_payload_not_found(mut self, ignore: bool) -> Self {
        self.ignore_payload_not_found = ignore;
        self
    }

    /// Select the legacy or modern size property name
    pub fn with_legacy_reserved_attribute_name(mut self, legacy: bool) -> Self {
        self.use_legacy_reserved_attribute_name = legacy;
        self
    }

    /// Enable or disable the offload pipeline
    pub fn with_payload_support_enabled(mut self, enabled: bool) -> Self {
        self.payload_support_enabled = enabled;
        self
    }

    /// Set the access tier hint for stored payloads
    pub fn with_blob_access_tier(mut self, tier: AccessTier) -> Self {
        self.blob_access_tier = Some(tier);
        self
    }

    /// Set the encryption hints for stored payloads
    pub fn with_encryption(mut self, encryption: EncryptionOptions) -> Self {
        self.encryption = Some(encryption);
        self
    }

    /// Set the ceiling on user-supplied properties
    pub fn with_max_allowed_properties(mut self, max: usize) -> Self {
        self.max_allowed_properties = max;
        self
    }

    /// Set the prefix prepended to minted blob keys, validating it first
    pub fn with_blob_key_prefix<S: Into<String>>(mut self, prefix: S) -> Result<Self, ConfigError> {
        self.set_blob_key_prefix(prefix)?;
        Ok(self)
    }

    /// Set the blob key prefix. A rejected prefix leaves the previous value
    /// in place.
    pub fn set_blob_key_prefix<S: Into<String>>(&mut self, prefix: S) -> Result<(), ConfigError> {
        let prefix = prefix.into();
        validate::validate_blob_key_prefix(&prefix)?;
        self.blob_key_prefix = prefix;
        Ok(())
    }

    /// Prefix prepended to every minted blob key
    pub fn blob_key_prefix(&self) -> &str {
        &self.blob_key_prefix
    }

    /// Size property name selected by `use_legacy_reserved_attribute_name`
    pub fn reserved_attribute_name(&self) -> &'static str {
        if self.use_legacy_reserved_attribute_name {
            LEGACY_RESERVED_ATTRIBUTE_NAME
        } else {
            RESERVED_ATTRIBUTE_NAME
        }
    }

    /// Project the store-bound hints for constructing a `PayloadStore`
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            access_tier: self.blob_access_tier,
            encryption: self.encryption.clone(),
            ignore_payload_not_found: self.ignore_payload_not_found,
        }
    }

    /// Build a config from the documented string key/value surface.
    ///
    /// Unrecognized keys and malformed values are rejected outright; nothing
    /// is partially applied. How the map is produced (environment, TOML,
    /// JSON) is the host application's concern.
    pub fn from_map(values: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut encryption = EncryptionOptions::default();

        for (key, value) in values {
            match key.as_str() {
                "messageSizeThreshold" => {
                    config.message_size_threshold = parse(key, value)?;
                }
                "alwaysThroughBlob" => {
                    config.always_through_blob = parse(key, value)?;
                }
                "cleanupBlobOnDelete" => {
                    config.cleanup_blob_on_delete = parse(key, value)?;
                }
                "blobKeyPrefix" => {
                    config.set_blob_key_prefix(value.clone())?;
                }
                "ignorePayloadNotFound" => {
                    config.ignore_payload_not_found = parse(key, value)?;
                }
                "useLegacyReservedAttributeName" => {
                    config.use_legacy_reserved_attribute_name = parse(key, value)?;
                }
                "payloadSupportEnabled" => {
                    config.payload_support_enabled = parse(key, value)?;
                }
                "blobAccessTier" => {
                    config.blob_access_tier = Some(parse(key, value)?);
                }
                "encryption.encryptionScope" => {
                    encryption.encryption_scope = Some(value.clone());
                }
                "encryption.customerProvidedKey" => {
                    encryption.customer_provided_key = Some(value.clone());
                }
                "maxAllowedProperties" => {
                    config.max_allowed_properties = parse(key, value)?;
                }
                other => return Err(ConfigError::UnknownKey(other.to_string())),
            }
        }

        if encryption.is_configured() {
            config.encryption = Some(encryption);
        }

        Ok(config)
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtendedConfig::default();

        assert_eq!(config.message_size_threshold, 262_144);
        assert!(!config.always_through_blob);
        assert!(config.cleanup_blob_on_delete);
        assert!(!config.ignore_payload_not_found);
        assert!(config.use_legacy_reserved_attribute_name);
        assert!(config.payload_support_enabled);
        assert_eq!(config.blob_key_prefix(), "");
        assert_eq!(config.max_allowed_properties, 9);
    }

    #[test]
    fn test_reserved_attribute_name_selection() {
        let legacy = ExtendedConfig::default();
        let modern = ExtendedConfig::default().with_legacy_reserved_attribute_name(false);

        assert_eq!(legacy.reserved_attribute_name(), "ServiceBusLargePayloadSize");
        assert_eq!(modern.reserved_attribute_name(), "ExtendedPayloadSize");
    }

    #[test]
    fn test_rejected_prefix_leaves_state_unchanged() {
        let mut config = ExtendedConfig::default()
            .with_blob_key_prefix("valid/")
            .unwrap();

        let result = config.set_blob_key_prefix("invalid@prefix");

        assert_eq!(result, Err(ConfigError::PrefixInvalidChars));
        assert_eq!(config.blob_key_prefix(), "valid/");
    }

    #[test]
    fn test_over_long_prefix_rejected() {
        let mut config = ExtendedConfig::default();

        let result = config.set_blob_key_prefix("a".repeat(1000));

        assert!(matches!(result, Err(ConfigError::PrefixTooLong { .. })));
        assert_eq!(config.blob_key_prefix(), "");
    }

    #[test]
    fn test_store_options_projection() {
        let config = ExtendedConfig::default()
            .with_blob_access_tier(AccessTier::Cool)
            .with_ignore_payload_not_found(true);

        let options = config.store_options();

        assert_eq!(options.access_tier, Some(AccessTier::Cool));
        assert!(options.ignore_payload_not_found);
        assert_eq!(options.encryption, None);
    }

    #[test]
    fn test_from_map_applies_known_keys() {
        let values: HashMap<String, String> = [
            ("messageSizeThreshold", "1024"),
            ("alwaysThroughBlob", "true"),
            ("blobKeyPrefix", "orders/"),
            ("useLegacyReservedAttributeName", "false"),
            ("blobAccessTier", "Cool"),
            ("encryption.encryptionScope", "scope-a"),
            ("maxAllowedProperties", "5"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = ExtendedConfig::from_map(&values).unwrap();

        assert_eq!(config.message_size_threshold, 1024);
        assert!(config.always_through_blob);
        assert_eq!(config.blob_key_prefix(), "orders/");
        assert_eq!(config.reserved_attribute_name(), "ExtendedPayloadSize");
        assert_eq!(config.blob_access_tier, Some(AccessTier::Cool));
        assert_eq!(
            config.encryption.unwrap().encryption_scope.as_deref(),
            Some("scope-a")
        );
        assert_eq!(config.max_allowed_properties, 5);
    }

    #[test]
    fn test_from_map_rejects_unknown_key() {
        let values: HashMap<String, String> =
            [("messageSizeTreshold".to_string(), "1024".to_string())]
                .into_iter()
                .collect();

        let result = ExtendedConfig::from_map(&values);

        assert_eq!(
            result.unwrap_err(),
            ConfigError::UnknownKey("messageSizeTreshold".to_string())
        );
    }

    #[test]
    fn test_from_map_rejects_malformed_values() {
        let values: HashMap<String, String> =
            [("alwaysThroughBlob".to_string(), "maybe".to_string())]
                .into_iter()
                .collect();

        let result = ExtendedConfig::from_map(&values);

        assert_eq!(
            result.unwrap_err(),
            ConfigError::InvalidValue {
                key: "alwaysThroughBlob".to_string(),
                value: "maybe".to_string(),
            }
        );
    }

    #[test]
    fn test_from_map_rejects_invalid_prefix() {
        let values: HashMap<String, String> =
            [("blobKeyPrefix".to_string(), "bad prefix".to_string())]
                .into_iter()
                .collect();

        assert!(ExtendedConfig::from_map(&values).is_err());
    }
}
