use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use claimcheck_store::{BlobPointer, PayloadStore};

use crate::broker::{
    BrokerProcessor, BrokerReceiver, BrokerSender, DeliveryCallback, MessageSettler,
};
use crate::config::{
    ExtendedConfig, BLOB_POINTER_MARKER, EXTENDED_CLIENT_USER_AGENT,
    LEGACY_RESERVED_ATTRIBUTE_NAME, RESERVED_ATTRIBUTE_NAME, RESERVED_PROPERTY_NAMES, USER_AGENT,
};
use crate::error::{ClientError, ClientResult};
use crate::message::{OutgoingMessage, PropertyValue, ReceivedMessage, ResolvedMessage};
use crate::validate;

/// Handler invoked for every resolved message on the push surface
pub type MessageHandler = Arc<
    dyn Fn(ResolvedMessage) -> BoxFuture<'static, Result<(), Box<dyn std::error::Error + Send + Sync>>>
        + Send
        + Sync,
>;

/// Handler invoked when resolution, the message handler, or settlement fails
pub type ErrorHandler = Arc<dyn Fn(ClientError) + Send + Sync>;

/// Outcome tally of a batch payload cleanup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Outcome tally of a batch lock renewal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenewReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Queue client that offloads over-threshold payloads to blob storage.
///
/// Bodies longer than the configured threshold (or all bodies, when
/// `always_through_blob` is set) are written to the payload store and
/// replaced on the wire by an encoded [`BlobPointer`]; marker properties let
/// the receive side detect and resolve them transparently. Blobs are
/// reclaimed through [`delete_payload`](Self::delete_payload) after the
/// application acknowledges a message.
#[derive(Clone)]
pub struct ExtendedClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    sender: Arc<dyn BrokerSender>,
    receiver: Arc<dyn BrokerReceiver>,
    store: PayloadStore,
    config: ExtendedConfig,
    processor: Mutex<Option<Arc<dyn BrokerProcessor>>>,
}

impl ExtendedClient {
    pub fn new(
        sender: Arc<dyn BrokerSender>,
        receiver: Arc<dyn BrokerReceiver>,
        store: PayloadStore,
        config: ExtendedConfig,
    ) -> Self {
        info!(container = store.container(), "extended client initialized");
        Self {
            inner: Arc::new(ClientInner {
                sender,
                receiver,
                store,
                config,
                processor: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ExtendedConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &PayloadStore {
        &self.inner.store
    }

    /// Send a message without user properties
    pub async fn send_message<S: Into<String>>(&self, body: S) -> ClientResult<()> {
        self.send_message_with_properties(body, HashMap::new()).await
    }

    /// Send a message with user-supplied application properties.
    ///
    /// Property validation happens before any blob or broker I/O and
    /// surfaces as [`ClientError::Property`]; blob and broker failures are
    /// wrapped in [`ClientError::SendFailed`].
    #[instrument(skip_all)]
    pub async fn send_message_with_properties<S: Into<String>>(
        &self,
        body: S,
        properties: HashMap<String, PropertyValue>,
    ) -> ClientResult<()> {
        let body = body.into();
        let message = self.inner.prepare_message(&body, &properties).await?;

        self.inner
            .sender
            .send(message)
            .await
            .map_err(ClientError::send_failed)?;

        debug!("message sent");
        Ok(())
    }

    /// Send a batch of bodies, re-evaluating the offload decision per body.
    ///
    /// Bodies are offered to the broker in the given order. When a batch's
    /// byte budget fills up it is flushed and a fresh one opened; a body the
    /// fresh batch still refuses is sent individually. A validation failure
    /// on any body aborts the operation before further flushes.
    #[instrument(skip_all, fields(count = bodies.len()))]
    pub async fn send_message_batch(
        &self,
        bodies: Vec<String>,
        common_properties: HashMap<String, PropertyValue>,
    ) -> ClientResult<()> {
        let inner = &self.inner;
        let mut batch = inner.sender.create_batch();

        for body in &bodies {
            let message = inner.prepare_message(body, &common_properties).await?;

            if !batch.try_add(&message) {
                if batch.count() > 0 {
                    debug!(count = batch.count(), "batch full, flushing");
                    inner
                        .sender
                        .send_batch(batch)
                        .await
                        .map_err(ClientError::send_failed)?;
                }

                batch = inner.sender.create_batch();
                if !batch.try_add(&message) {
                    warn!("message too large for an empty batch, sending individually");
                    inner
                        .sender
                        .send(message)
                        .await
                        .map_err(ClientError::send_failed)?;
                }
            }
        }

        if batch.count() > 0 {
            debug!(count = batch.count(), "flushing final batch");
            inner
                .sender
                .send_batch(batch)
                .await
                .map_err(ClientError::send_failed)?;
        }

        debug!("message batch sent");
        Ok(())
    }

    /// Pull up to `max_messages` from the broker and resolve each one
    /// independently.
    ///
    /// The outer error covers the broker fetch; each element carries its own
    /// resolve outcome, so one unreadable pointer cannot poison the rest of
    /// the fetch.
    #[instrument(skip_all)]
    pub async fn receive_messages(
        &self,
        max_messages: usize,
        wait_time: Duration,
    ) -> ClientResult<Vec<ClientResult<ResolvedMessage>>> {
        let received = self
            .inner
            .receiver
            .receive(max_messages, wait_time)
            .await
            .map_err(ClientError::receive_failed)?;

        debug!(count = received.len(), "received messages");

        let mut resolved = Vec::with_capacity(received.len());
        for message in received {
            let outcome = self.inner.resolve(message).await;
            if let Err(err) = &outcome {
                error!(error = %err, "failed to resolve received message");
            }
            resolved.push(outcome);
        }

        Ok(resolved)
    }

    /// Begin push delivery through `processor`.
    ///
    /// Each pushed message is resolved and handed to `handler`; the delivery
    /// is completed on handler success and abandoned on resolve or handler
    /// failure, with the error routed to `error_handler`. A client runs at
    /// most one processor; installing a new one stops its predecessor.
    pub async fn process_messages(
        &self,
        processor: Arc<dyn BrokerProcessor>,
        handler: MessageHandler,
        error_handler: ErrorHandler,
    ) -> ClientResult<()> {
        let mut guard = self.inner.processor.lock().await;
        if let Some(previous) = guard.take() {
            warn!("processor already running, stopping it");
            if let Err(err) = previous.stop().await {
                error!(error = %err, "failed to stop previous processor");
            }
        }

        let inner = self.inner.clone();
        let callback: DeliveryCallback = Arc::new(move |message, settler| {
            let inner = inner.clone();
            let handler = handler.clone();
            let error_handler = error_handler.clone();
            Box::pin(async move {
                inner
                    .handle_delivery(message, settler, handler, error_handler)
                    .await;
            })
        });

        processor.start(callback).await?;
        *guard = Some(processor);
        info!("message processor started");
        Ok(())
    }

    /// Delete the blob behind a resolved message.
    ///
    /// A no-op when cleanup is disabled, the message was not blob-backed, or
    /// no pointer was retained. Failures are logged and swallowed: once the
    /// broker ack has gone through, message processing must not depend on
    /// the blob backend.
    #[instrument(skip_all, fields(message_id = %message.message_id))]
    pub async fn delete_payload(&self, message: &ResolvedMessage) {
        if !self.inner.config.cleanup_blob_on_delete {
            debug!("blob cleanup disabled, skipping");
            return;
        }
        if !message.payload_from_blob {
            debug!("message was not blob-backed, skipping");
            return;
        }
        let Some(pointer) = &message.pointer else {
            warn!("message marked blob-backed but carries no pointer, skipping");
            return;
        };

        match self.inner.store.delete(pointer).await {
            Ok(()) => debug!(pointer = %pointer, "blob payload deleted"),
            Err(err) => error!(error = %err, pointer = %pointer, "failed to delete blob payload"),
        }
    }

    /// Delete the blobs behind a batch of resolved messages.
    ///
    /// One entry's failure never stops the rest; the tally accounts for
    /// every input. Disabled cleanup turns the whole call into a no-op.
    #[instrument(skip_all, fields(count = messages.len()))]
    pub async fn delete_payload_batch(&self, messages: &[ResolvedMessage]) -> CleanupReport {
        let mut report = CleanupReport::default();

        if !self.inner.config.cleanup_blob_on_delete {
            debug!("blob cleanup disabled, skipping batch");
            return report;
        }

        for message in messages {
            let pointer = message
                .pointer
                .as_ref()
                .filter(|_| message.payload_from_blob);

            let Some(pointer) = pointer else {
                report.skipped += 1;
                continue;
            };

            match self.inner.store.delete(pointer).await {
                Ok(()) => report.succeeded += 1,
                Err(err) => {
                    error!(
                        error = %err,
                        message_id = %message.message_id,
                        "failed to delete blob payload"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            succeeded = report.succeeded,
            skipped = report.skipped,
            failed = report.failed,
            "batch payload cleanup finished"
        );
        report
    }

    /// Extend the processing lock on a received message
    pub async fn renew_message_lock(&self, message: &ReceivedMessage) -> ClientResult<()> {
        debug!(message_id = %message.message_id, "renewing message lock");
        Ok(self.inner.receiver.renew_lock(message).await?)
    }

    /// Extend the processing locks of a batch of received messages,
    /// isolating per-message failures into the tally
    #[instrument(skip_all, fields(count = messages.len()))]
    pub async fn renew_message_lock_batch(&self, messages: &[ReceivedMessage]) -> RenewReport {
        let mut report = RenewReport::default();

        for message in messages {
            match self.inner.receiver.renew_lock(message).await {
                Ok(()) => report.succeeded += 1,
                Err(err) => {
                    error!(
                        error = %err,
                        message_id = %message.message_id,
                        "failed to renew message lock"
                    );
                    report.failed += 1;
                }
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            "batch lock renewal finished"
        );
        report
    }

    /// Close the client: processor first, then sender, then receiver.
    /// Behaviour of calls made after close is undefined.
    pub async fn close(&self) {
        let mut guard = self.inner.processor.lock().await;
        if let Some(processor) = guard.take() {
            if let Err(err) = processor.stop().await {
                error!(error = %err, "failed to stop processor during close");
            }
        }
        drop(guard);

        self.inner.sender.close().await;
        self.inner.receiver.close().await;
        info!("extended client closed");
    }
}

impl ClientInner {
    /// Build the outgoing message for one body: offload decision, property
    /// validation, pointer encoding, marker properties, user-agent stamp.
    async fn prepare_message(
        &self,
        body: &str,
        user_properties: &HashMap<String, PropertyValue>,
    ) -> ClientResult<OutgoingMessage> {
        let mut properties = user_properties.clone();

        if !self.config.payload_support_enabled {
            debug!("payload support disabled, sending body as-is");
            properties.insert(
                EXTENDED_CLIENT_USER_AGENT.to_string(),
                PropertyValue::from(USER_AGENT),
            );
            return Ok(OutgoingMessage {
                body: body.to_string(),
                application_properties: properties,
            });
        }

        let payload_size = body.len();
        let should_offload =
            self.config.always_through_blob || payload_size > self.config.message_size_threshold;

        validate::validate_application_properties(
            &properties,
            &RESERVED_PROPERTY_NAMES,
            self.config.max_allowed_properties,
            validate::DEFAULT_MAX_PROPERTIES_SIZE,
        )?;

        let body = if should_offload {
            debug!(size = payload_size, "offloading payload to blob storage");

            let blob_name = format!("{}{}", self.config.blob_key_prefix(), Uuid::new_v4());
            let pointer = self
                .store
                .store(&blob_name, body)
                .await
                .map_err(ClientError::send_failed)?;

            properties.insert(
                self.config.reserved_attribute_name().to_string(),
                PropertyValue::Int(payload_size as i64),
            );
            properties.insert(
                BLOB_POINTER_MARKER.to_string(),
                PropertyValue::from("true"),
            );

            debug!(pointer = %pointer, "payload offloaded");
            pointer.encode()
        } else {
            debug!(size = payload_size, "payload within threshold, sending directly");
            body.to_string()
        };

        properties.insert(
            EXTENDED_CLIENT_USER_AGENT.to_string(),
            PropertyValue::from(USER_AGENT),
        );

        Ok(OutgoingMessage {
            body,
            application_properties: properties,
        })
    }

    /// Turn one received message into its resolved form: marker detection,
    /// pointer decode, blob fetch, reserved-property stripping.
    async fn resolve(&self, message: ReceivedMessage) -> ClientResult<ResolvedMessage> {
        let ReceivedMessage {
            message_id,
            body,
            application_properties: mut properties,
        } = message;

        if !self.config.payload_support_enabled {
            return Ok(ResolvedMessage {
                message_id,
                body,
                properties,
                payload_from_blob: false,
                pointer: None,
            });
        }

        let payload_from_blob = properties
            .get(BLOB_POINTER_MARKER)
            .map(|value| value.to_string() == "true")
            .unwrap_or(false);

        let (body, pointer) = if payload_from_blob {
            debug!(message_id = %message_id, "message carries a blob pointer, resolving");

            let pointer = BlobPointer::decode(&body).map_err(ClientError::receive_failed)?;
            let body = match self
                .store
                .get(&pointer)
                .await
                .map_err(ClientError::receive_failed)?
            {
                Some(body) => body,
                None => {
                    warn!(message_id = %message_id, "payload blob missing, substituting empty body");
                    String::new()
                }
            };

            (body, Some(pointer))
        } else {
            (body, None)
        };

        // The protocol's property names never reach application code
        properties.remove(BLOB_POINTER_MARKER);
        properties.remove(RESERVED_ATTRIBUTE_NAME);
        properties.remove(LEGACY_RESERVED_ATTRIBUTE_NAME);
        properties.remove(EXTENDED_CLIENT_USER_AGENT);

        Ok(ResolvedMessage {
            message_id,
            body,
            properties,
            payload_from_blob,
            pointer,
        })
    }

    async fn handle_delivery(
        &self,
        message: ReceivedMessage,
        settler: Arc<dyn MessageSettler>,
        handler: MessageHandler,
        error_handler: ErrorHandler,
    ) {
        let resolved = match self.resolve(message).await {
            Ok(resolved) => resolved,
            Err(err) => {
                error_handler(err);
                if let Err(abandon_err) = settler.abandon().await {
                    error!(error = %abandon_err, "failed to abandon unresolvable message");
                }
                return;
            }
        };

        match handler(resolved).await {
            Ok(()) => {
                if let Err(err) = settler.complete().await {
                    error_handler(ClientError::Broker(err));
                }
            }
            Err(cause) => {
                error_handler(ClientError::Handler { source: cause });
                if let Err(err) = settler.abandon().await {
                    error!(error = %err, "failed to abandon message after handler failure");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::memory::MemoryBroker;
    use claimcheck_store::MemoryBlobBackend;

    async fn client_with(config: ExtendedConfig) -> (ExtendedClient, MemoryBroker) {
        let backend = Arc::new(MemoryBlobBackend::new());
        let broker = MemoryBroker::new();
        let store = PayloadStore::with_options(backend, "payloads", config.store_options())
            .await
            .unwrap();
        let client = ExtendedClient::new(
            Arc::new(broker.clone()),
            Arc::new(broker.clone()),
            store,
            config,
        );
        (client, broker)
    }

    #[tokio::test]
    async fn test_user_agent_stamped_on_direct_sends() {
        let (client, broker) = client_with(ExtendedConfig::default()).await;

        client.send_message("hello").await.unwrap();

        let queued = broker.queued_messages();
        assert_eq!(
            queued[0].application_properties.get(EXTENDED_CLIENT_USER_AGENT),
            Some(&PropertyValue::from(USER_AGENT))
        );
    }

    #[tokio::test]
    async fn test_user_agent_stamped_when_payload_support_disabled() {
        let config = ExtendedConfig::default().with_payload_support_enabled(false);
        let (client, broker) = client_with(config).await;

        client.send_message("hello").await.unwrap();

        let queued = broker.queued_messages();
        assert_eq!(queued[0].body, "hello");
        assert!(queued[0]
            .application_properties
            .contains_key(EXTENDED_CLIENT_USER_AGENT));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_without_processor() {
        let (client, _broker) = client_with(ExtendedConfig::default()).await;

        client.close().await;
        client.close().await;
    }
}
