//! # claimcheck-client: transparent payload offloading for queue messaging
//!
//! Brokers cap the size of a single message. This client wraps a broker
//! sender/receiver pair so that over-threshold bodies are parked in blob
//! storage and replaced on the wire by a small pointer record - the
//! claim-check pattern. Receiving resolves pointers back into the original
//! bodies, and acknowledged payload blobs are reclaimed on request.
//!
//! - **Send**: per-message offload decision, property validation, pointer
//!   encoding, user-agent stamping, byte-budgeted batch packing with
//!   overflow split
//! - **Receive**: marker detection, pointer decode, blob fetch with a
//!   configurable missing-blob policy, reserved-property stripping
//! - **Lifecycle**: post-ack blob cleanup (single and batch), lock renewal
//!   pass-through, push-processor delivery with conservative settlement
//! - **Compatibility**: the size-marker property name defaults to the
//!   predecessor system's, so existing consumers keep working
//!
//! The broker itself is reached only through the capability traits in
//! [`broker`]; tests run against the in-memory implementations.
//!
//! ```rust
//! use std::sync::Arc;
//! use claimcheck_client::prelude::*;
//! use claimcheck_client::broker::memory::MemoryBroker;
//! use claimcheck_store::MemoryBlobBackend;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExtendedConfig::new().with_message_size_threshold(1024);
//!
//! let backend = Arc::new(MemoryBlobBackend::new());
//! let store = PayloadStore::with_options(backend, "payloads", config.store_options()).await?;
//! let broker = Arc::new(MemoryBroker::new());
//!
//! let client = ExtendedClient::new(broker.clone(), broker.clone(), store, config);
//!
//! client.send_message("a".repeat(4096)).await?;   // offloaded
//! client.send_message("small message").await?;    // sent directly
//!
//! for outcome in client.receive_messages(10, std::time::Duration::from_secs(10)).await? {
//!     let message = outcome?;
//!     println!("{} bytes from blob: {}", message.body.len(), message.payload_from_blob);
//!     client.delete_payload(&message).await;
//! }
//! # Ok(())
//! # }
//! ```

pub mod blocking;
pub mod broker;
mod client;
mod config;
mod error;
mod message;
mod validate;

pub use blocking::BlockingClient;
pub use client::{
    CleanupReport, ErrorHandler, ExtendedClient, MessageHandler, RenewReport,
};
pub use config::{
    ExtendedConfig, BLOB_POINTER_MARKER, DEFAULT_MESSAGE_SIZE_THRESHOLD,
    EXTENDED_CLIENT_USER_AGENT, LEGACY_RESERVED_ATTRIBUTE_NAME, MAX_ALLOWED_PROPERTIES,
    RESERVED_ATTRIBUTE_NAME, RESERVED_PROPERTY_NAMES, USER_AGENT,
};
pub use error::{
    BrokerError, BrokerResult, ClientError, ClientResult, ConfigError, PropertyViolation,
};
pub use message::{OutgoingMessage, PropertyValue, ReceivedMessage, ResolvedMessage};
pub use validate::{
    properties_size, validate_application_properties, validate_blob_key_prefix,
    DEFAULT_MAX_PROPERTIES_SIZE, MAX_PREFIX_LENGTH,
};

// Storage-side types most callers need alongside the client
pub use claimcheck_store::{BlobPointer, PayloadStore};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::broker::{BrokerProcessor, BrokerReceiver, BrokerSender};
    pub use crate::{
        BlobPointer, ClientError, ClientResult, ExtendedClient, ExtendedConfig, PayloadStore,
        PropertyValue, ResolvedMessage,
    };
}
