//! Synchronous facade over the async client.
//!
//! Every operation drives its async counterpart to completion on an owned
//! single-thread runtime, so both surfaces share one implementation and one
//! set of semantics. Must not be used from inside an async runtime.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::broker::BrokerProcessor;
use crate::client::{CleanupReport, ErrorHandler, ExtendedClient, MessageHandler, RenewReport};
use crate::error::ClientResult;
use crate::message::{PropertyValue, ReceivedMessage, ResolvedMessage};

/// Blocking counterpart of [`ExtendedClient`]
pub struct BlockingClient {
    client: ExtendedClient,
    runtime: tokio::runtime::Runtime,
}

impl BlockingClient {
    /// Wrap an async client. Fails only if a runtime cannot be created.
    pub fn new(client: ExtendedClient) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { client, runtime })
    }

    /// Borrow the wrapped async client
    pub fn as_async(&self) -> &ExtendedClient {
        &self.client
    }

    /// See [`ExtendedClient::send_message`]
    pub fn send_message<S: Into<String>>(&self, body: S) -> ClientResult<()> {
        self.runtime.block_on(self.client.send_message(body))
    }

    /// See [`ExtendedClient::send_message_with_properties`]
    pub fn send_message_with_properties<S: Into<String>>(
        &self,
        body: S,
        properties: HashMap<String, PropertyValue>,
    ) -> ClientResult<()> {
        self.runtime
            .block_on(self.client.send_message_with_properties(body, properties))
    }

    /// See [`ExtendedClient::send_message_batch`]
    pub fn send_message_batch(
        &self,
        bodies: Vec<String>,
        common_properties: HashMap<String, PropertyValue>,
    ) -> ClientResult<()> {
        self.runtime
            .block_on(self.client.send_message_batch(bodies, common_properties))
    }

    /// See [`ExtendedClient::receive_messages`]
    pub fn receive_messages(
        &self,
        max_messages: usize,
        wait_time: Duration,
    ) -> ClientResult<Vec<ClientResult<ResolvedMessage>>> {
        self.runtime
            .block_on(self.client.receive_messages(max_messages, wait_time))
    }

    /// See [`ExtendedClient::process_messages`]
    pub fn process_messages(
        &self,
        processor: Arc<dyn BrokerProcessor>,
        handler: MessageHandler,
        error_handler: ErrorHandler,
    ) -> ClientResult<()> {
        self.runtime
            .block_on(self.client.process_messages(processor, handler, error_handler))
    }

    /// See [`ExtendedClient::delete_payload`]
    pub fn delete_payload(&self, message: &ResolvedMessage) {
        self.runtime.block_on(self.client.delete_payload(message));
    }

    /// See [`ExtendedClient::delete_payload_batch`]
    pub fn delete_payload_batch(&self, messages: &[ResolvedMessage]) -> CleanupReport {
        self.runtime
            .block_on(self.client.delete_payload_batch(messages))
    }

    /// See [`ExtendedClient::renew_message_lock`]
    pub fn renew_message_lock(&self, message: &ReceivedMessage) -> ClientResult<()> {
        self.runtime
            .block_on(self.client.renew_message_lock(message))
    }

    /// See [`ExtendedClient::renew_message_lock_batch`]
    pub fn renew_message_lock_batch(&self, messages: &[ReceivedMessage]) -> RenewReport {
        self.runtime
            .block_on(self.client.renew_message_lock_batch(messages))
    }

    /// See [`ExtendedClient::close`]
    pub fn close(&self) {
        self.runtime.block_on(self.client.close());
    }
}
