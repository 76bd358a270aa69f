//! Capability surface of the underlying queue/topic broker.
//!
//! The extension never talks to a concrete messaging SDK; it works against
//! these traits so tests (and alternative transports) can inject their own
//! implementations. `memory` provides the in-process fakes.

pub mod memory;

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

use crate::error::BrokerResult;
use crate::message::{OutgoingMessage, ReceivedMessage};

/// Byte-budgeted batch under assembly. Created by a sender, filled by the
/// send pipeline, handed back to the sender for transmission.
pub trait MessageBatch: Send {
    /// Try to add a message. Returns false when the batch's byte budget
    /// would be exceeded; an over-budget message is refused even by an
    /// empty batch.
    fn try_add(&mut self, message: &OutgoingMessage) -> bool;

    /// Number of messages currently in the batch
    fn count(&self) -> usize;

    /// Drain the batch for transmission
    fn take_messages(&mut self) -> Vec<OutgoingMessage>;
}

/// Queue/topic send surface
#[async_trait]
pub trait BrokerSender: Send + Sync {
    /// Open an empty batch with the broker's byte budget
    fn create_batch(&self) -> Box<dyn MessageBatch>;

    /// Enqueue a single message
    async fn send(&self, message: OutgoingMessage) -> BrokerResult<()>;

    /// Enqueue every message in a batch, preserving batch order
    async fn send_batch(&self, batch: Box<dyn MessageBatch>) -> BrokerResult<()>;

    async fn close(&self);
}

/// Queue/topic receive surface
#[async_trait]
pub trait BrokerReceiver: Send + Sync {
    /// Pull up to `max_messages`, waiting at most `wait_time`
    async fn receive(
        &self,
        max_messages: usize,
        wait_time: Duration,
    ) -> BrokerResult<Vec<ReceivedMessage>>;

    /// Extend the processing lock on a received message
    async fn renew_lock(&self, message: &ReceivedMessage) -> BrokerResult<()>;

    async fn close(&self);
}

/// Settlement hooks for one pushed message
#[async_trait]
pub trait MessageSettler: Send + Sync {
    /// Acknowledge the delivery
    async fn complete(&self) -> BrokerResult<()>;

    /// Return the message for redelivery
    async fn abandon(&self) -> BrokerResult<()>;
}

/// Callback installed on a push processor, invoked once per delivery
pub type DeliveryCallback =
    Arc<dyn Fn(ReceivedMessage, Arc<dyn MessageSettler>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Push-delivery surface supplied by the broker SDK
#[async_trait]
pub trait BrokerProcessor: Send + Sync {
    /// Install the callback and begin delivering messages
    async fn start(&self, callback: DeliveryCallback) -> BrokerResult<()>;

    /// Stop delivering; in-flight callbacks run to completion
    async fn stop(&self) -> BrokerResult<()>;
}
