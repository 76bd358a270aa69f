use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Reference to an offloaded payload blob, sent as the message body in place
/// of the payload itself.
///
/// The wire form is a JSON object with exactly the labels `containerName`
/// and `blobName`. Consumers of the predecessor system recognise this shape,
/// so the labels must never change. Unknown fields are tolerated on decode
/// so newer producers can add fields without breaking older consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobPointer {
    #[serde(rename = "containerName")]
    pub container_name: String,

    #[serde(rename = "blobName")]
    pub blob_name: String,
}

/// Errors produced while decoding a pointer from a message body
#[derive(Error, Debug)]
pub enum PointerError {
    #[error("malformed blob pointer: {source}")]
    Malformed {
        #[from]
        source: serde_json::Error,
    },

    #[error("blob pointer field '{0}' is empty")]
    EmptyField(&'static str),
}

impl BlobPointer {
    /// Create a pointer to `blob_name` inside `container_name`
    pub fn new<C, B>(container_name: C, blob_name: B) -> Self
    where
        C: Into<String>,
        B: Into<String>,
    {
        Self {
            container_name: container_name.into(),
            blob_name: blob_name.into(),
        }
    }

    /// Serialize to the wire form
    pub fn encode(&self) -> String {
        // Two plain string fields; serialization cannot fail
        serde_json::to_string(self).expect("blob pointer serializes to JSON")
    }

    /// Parse the wire form. Missing or blank fields are rejected; unknown
    /// fields are ignored.
    pub fn decode(body: &str) -> Result<Self, PointerError> {
        let pointer: Self = serde_json::from_str(body)?;

        if pointer.container_name.trim().is_empty() {
            return Err(PointerError::EmptyField("containerName"));
        }
        if pointer.blob_name.trim().is_empty() {
            return Err(PointerError::EmptyField("blobName"));
        }

        Ok(pointer)
    }
}

impl fmt::Display for BlobPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container_name, self.blob_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let pointer = BlobPointer::new("payloads", "prefix/4f2a-blob");

        let encoded = pointer.encode();
        let decoded = BlobPointer::decode(&encoded).unwrap();

        assert_eq!(pointer, decoded);
    }

    #[test]
    fn test_wire_labels_are_stable() {
        let pointer = BlobPointer::new("c", "b");
        let encoded = pointer.encode();

        assert!(encoded.contains("\"containerName\":\"c\""));
        assert!(encoded.contains("\"blobName\":\"b\""));
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let body = r#"{"containerName":"c","blobName":"b","ttlSeconds":3600}"#;

        let decoded = BlobPointer::decode(body).unwrap();

        assert_eq!(decoded, BlobPointer::new("c", "b"));
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        let body = r#"{"containerName":"c"}"#;

        let result = BlobPointer::decode(body);

        assert!(matches!(result, Err(PointerError::Malformed { .. })));
    }

    #[test]
    fn test_decode_rejects_blank_fields() {
        let empty_container = r#"{"containerName":"","blobName":"b"}"#;
        let whitespace_blob = r#"{"containerName":"c","blobName":"   "}"#;

        assert!(matches!(
            BlobPointer::decode(empty_container),
            Err(PointerError::EmptyField("containerName"))
        ));
        assert!(matches!(
            BlobPointer::decode(whitespace_blob),
            Err(PointerError::EmptyField("blobName"))
        ));
    }

    #[test]
    fn test_decode_rejects_non_object_body() {
        assert!(BlobPointer::decode("just a plain message body").is_err());
    }
}
