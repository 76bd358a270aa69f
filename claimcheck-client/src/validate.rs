use std::collections::HashMap;

use crate::error::{ConfigError, PropertyViolation};
use crate::message::PropertyValue;

/// Maximum length for a blob key prefix. Backend blob names cap at 1024
/// characters and a minted v4 identifier consumes 36 of them.
pub const MAX_PREFIX_LENGTH: usize = 988;

/// Default ceiling on the combined octet size of application properties: 64 KiB
pub const DEFAULT_MAX_PROPERTIES_SIZE: usize = 64 * 1024;

/// Validate a blob key prefix against the charset and length rules.
///
/// Empty prefixes are accepted. Rejection is atomic: callers must leave the
/// previous prefix in place.
pub fn validate_blob_key_prefix(prefix: &str) -> Result<(), ConfigError> {
    if prefix.len() > MAX_PREFIX_LENGTH {
        return Err(ConfigError::PrefixTooLong {
            length: prefix.len(),
            max: MAX_PREFIX_LENGTH,
        });
    }

    if !prefix.chars().all(is_prefix_char) {
        return Err(ConfigError::PrefixInvalidChars);
    }

    Ok(())
}

fn is_prefix_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-')
}

/// Validate user-supplied application properties before a send.
///
/// Pure and side-effect free; runs before any blob or broker I/O.
pub fn validate_application_properties(
    properties: &HashMap<String, PropertyValue>,
    reserved: &[&str],
    max_count: usize,
    max_bytes: usize,
) -> Result<(), PropertyViolation> {
    if properties.is_empty() {
        return Ok(());
    }

    if properties.len() > max_count {
        return Err(PropertyViolation::TooMany {
            count: properties.len(),
            max: max_count,
        });
    }

    for name in properties.keys() {
        if reserved.contains(&name.as_str()) {
            return Err(PropertyViolation::Reserved { name: name.clone() });
        }
    }

    let size = properties_size(properties);
    if size > max_bytes {
        return Err(PropertyViolation::TooLarge {
            size,
            max: max_bytes,
        });
    }

    Ok(())
}

/// Combined UTF-8 octet size of property keys and rendered values
pub fn properties_size(properties: &HashMap<String, PropertyValue>) -> usize {
    properties
        .iter()
        .map(|(key, value)| key.len() + value.octet_len())
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RESERVED_PROPERTY_NAMES;

    fn props(entries: &[(&str, &str)]) -> HashMap<String, PropertyValue> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), PropertyValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_prefix_accepts_empty_and_allowed_charset() {
        assert!(validate_blob_key_prefix("").is_ok());
        assert!(validate_blob_key_prefix("orders/2024/large-payloads_v1.").is_ok());
    }

    #[test]
    fn test_prefix_rejects_invalid_characters() {
        let result = validate_blob_key_prefix("invalid@prefix");
        assert_eq!(result, Err(ConfigError::PrefixInvalidChars));

        assert!(validate_blob_key_prefix("spaces not allowed").is_err());
        assert!(validate_blob_key_prefix("unicode-ü").is_err());
    }

    #[test]
    fn test_prefix_rejects_over_length() {
        let at_limit = "a".repeat(MAX_PREFIX_LENGTH);
        let over_limit = "a".repeat(MAX_PREFIX_LENGTH + 1);

        assert!(validate_blob_key_prefix(&at_limit).is_ok());
        assert_eq!(
            validate_blob_key_prefix(&over_limit),
            Err(ConfigError::PrefixTooLong {
                length: MAX_PREFIX_LENGTH + 1,
                max: MAX_PREFIX_LENGTH,
            })
        );
    }

    #[test]
    fn test_properties_empty_map_is_valid() {
        let empty = HashMap::new();
        assert!(validate_application_properties(&empty, &RESERVED_PROPERTY_NAMES, 0, 0).is_ok());
    }

    #[test]
    fn test_properties_too_many() {
        let properties = props(&[("a", "1"), ("b", "2"), ("c", "3"), ("d", "4")]);

        let result =
            validate_application_properties(&properties, &RESERVED_PROPERTY_NAMES, 3, 65536);

        assert_eq!(
            result,
            Err(PropertyViolation::TooMany { count: 4, max: 3 })
        );
    }

    #[test]
    fn test_properties_reserved_name() {
        let properties = props(&[("ExtendedPayloadSize", "123")]);

        let result =
            validate_application_properties(&properties, &RESERVED_PROPERTY_NAMES, 9, 65536);

        assert_eq!(
            result,
            Err(PropertyViolation::Reserved {
                name: "ExtendedPayloadSize".to_string(),
            })
        );
    }

    #[test]
    fn test_properties_too_large() {
        let big = "x".repeat(70_000);
        let properties = props(&[("payload", big.as_str())]);

        let result = validate_application_properties(
            &properties,
            &RESERVED_PROPERTY_NAMES,
            9,
            DEFAULT_MAX_PROPERTIES_SIZE,
        );

        assert!(matches!(result, Err(PropertyViolation::TooLarge { .. })));
    }

    #[test]
    fn test_properties_size_accounting() {
        let mut properties = props(&[("key", "value")]);
        properties.insert("count".to_string(), PropertyValue::from(1234));
        properties.insert("absent".to_string(), PropertyValue::Null);

        // "key"+"value" = 8, "count"+"1234" = 9, "absent"+null = 6
        assert_eq!(properties_size(&properties), 23);
    }
}
