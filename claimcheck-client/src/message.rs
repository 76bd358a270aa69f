use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use claimcheck_store::BlobPointer;

/// Scalar application property value.
///
/// Brokers carry property maps of string keys to scalar values; `Null` is
/// kept distinct from an absent entry because some transports do the same.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl PropertyValue {
    /// UTF-8 octet size of the rendered value; null contributes nothing
    pub fn octet_len(&self) -> usize {
        match self {
            Self::Null => 0,
            Self::Str(value) => value.len(),
            other => other.to_string().len(),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(value) => write!(f, "{}", value),
            Self::Int(value) => write!(f, "{}", value),
            Self::Float(value) => write!(f, "{}", value),
            Self::Str(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Message handed to the broker sender
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub body: String,
    pub application_properties: HashMap<String, PropertyValue>,
}

impl OutgoingMessage {
    /// Create a message with no application properties
    pub fn new<S: Into<String>>(body: S) -> Self {
        Self {
            body: body.into(),
            application_properties: HashMap::new(),
        }
    }

    /// Add an application property
    pub fn with_property<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        self.application_properties.insert(key.into(), value.into());
        self
    }

    /// Approximate wire size: body octets plus rendered properties.
    /// Used by byte-budgeted batch packing.
    pub fn encoded_size(&self) -> usize {
        let properties: usize = self
            .application_properties
            .iter()
            .map(|(key, value)| key.len() + value.octet_len())
            .sum();
        self.body.len() + properties
    }
}

/// Message pulled from the broker, before pointer resolution.
///
/// This is the broker-side handle: lock renewal operates on it, and the
/// caller keeps ownership of it across lifecycle calls.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub message_id: String,
    pub body: String,
    pub application_properties: HashMap<String, PropertyValue>,
}

impl ReceivedMessage {
    pub fn new<I, S>(message_id: I, body: S) -> Self
    where
        I: Into<String>,
        S: Into<String>,
    {
        Self {
            message_id: message_id.into(),
            body: body.into(),
            application_properties: HashMap::new(),
        }
    }

    /// Add an application property
    pub fn with_property<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<PropertyValue>,
    {
        self.application_properties.insert(key.into(), value.into());
        self
    }
}

/// Message handed to application code after pointer resolution.
///
/// The property map never contains the extension's reserved keys. When the
/// body came out of blob storage the pointer is retained so the blob can be
/// reclaimed after acknowledgement.
#[derive(Debug, Clone)]
pub struct ResolvedMessage {
    pub message_id: String,
    pub body: String,
    pub properties: HashMap<String, PropertyValue>,
    pub payload_from_blob: bool,
    pub pointer: Option<BlobPointer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_value_rendering() {
        assert_eq!(PropertyValue::from("true").to_string(), "true");
        assert_eq!(PropertyValue::from(true).to_string(), "true");
        assert_eq!(PropertyValue::from(2048).to_string(), "2048");
        assert_eq!(PropertyValue::Null.to_string(), "");
    }

    #[test]
    fn test_octet_len_counts_rendered_bytes() {
        assert_eq!(PropertyValue::from("abc").octet_len(), 3);
        assert_eq!(PropertyValue::from(1234).octet_len(), 4);
        assert_eq!(PropertyValue::Null.octet_len(), 0);
    }

    #[test]
    fn test_encoded_size_includes_properties() {
        let message = OutgoingMessage::new("0123456789")
            .with_property("k", "vvv")
            .with_property("n", 42);

        // body 10 + "k"+"vvv" 4 + "n"+"42" 3
        assert_eq!(message.encoded_size(), 17);
    }
}
