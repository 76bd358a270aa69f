use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::broker::{
    BrokerProcessor, BrokerReceiver, BrokerSender, DeliveryCallback, MessageBatch, MessageSettler,
};
use crate::error::{BrokerError, BrokerResult};
use crate::message::{OutgoingMessage, ReceivedMessage};

/// Default batch byte budget, mirroring a 256 KiB broker frame
pub const DEFAULT_BATCH_BUDGET: usize = 262_144;

/// In-memory broker for testing and development.
///
/// Sender and receiver share one FIFO queue. Batch flushes, individual
/// sends, and lock renewals are recorded so tests can assert on broker
/// traffic.
#[derive(Clone)]
pub struct MemoryBroker {
    state: Arc<BrokerState>,
}

struct BrokerState {
    queue: RwLock<VecDeque<OutgoingMessage>>,
    max_batch_bytes: usize,
    batch_flushes: RwLock<Vec<usize>>,
    individual_sends: AtomicUsize,
    renewed_locks: RwLock<Vec<String>>,
    failing_renewals: RwLock<HashSet<String>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::with_batch_budget(DEFAULT_BATCH_BUDGET)
    }

    /// Create a broker whose batches hold at most `max_batch_bytes`
    pub fn with_batch_budget(max_batch_bytes: usize) -> Self {
        Self {
            state: Arc::new(BrokerState {
                queue: RwLock::new(VecDeque::new()),
                max_batch_bytes,
                batch_flushes: RwLock::new(Vec::new()),
                individual_sends: AtomicUsize::new(0),
                renewed_locks: RwLock::new(Vec::new()),
                failing_renewals: RwLock::new(HashSet::new()),
            }),
        }
    }

    /// Number of messages waiting in the queue
    pub fn queued(&self) -> usize {
        self.state.queue.read().len()
    }

    /// Snapshot of the queued messages, front first
    pub fn queued_messages(&self) -> Vec<OutgoingMessage> {
        self.state.queue.read().iter().cloned().collect()
    }

    /// Message counts of each `send_batch` call, in call order
    pub fn batch_flushes(&self) -> Vec<usize> {
        self.state.batch_flushes.read().clone()
    }

    /// Number of single-message `send` calls
    pub fn individual_sends(&self) -> usize {
        self.state.individual_sends.load(Ordering::SeqCst)
    }

    /// Message ids whose locks were renewed, in call order
    pub fn renewed_locks(&self) -> Vec<String> {
        self.state.renewed_locks.read().clone()
    }

    /// Make every lock renewal for `message_id` fail
    pub fn fail_renewals_for<S: Into<String>>(&self, message_id: S) {
        self.state.failing_renewals.write().insert(message_id.into());
    }
}

impl Default for MemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrokerSender for MemoryBroker {
    fn create_batch(&self) -> Box<dyn MessageBatch> {
        Box::new(MemoryBatch {
            budget: self.state.max_batch_bytes,
            bytes: 0,
            messages: Vec::new(),
        })
    }

    async fn send(&self, message: OutgoingMessage) -> BrokerResult<()> {
        self.state.individual_sends.fetch_add(1, Ordering::SeqCst);
        self.state.queue.write().push_back(message);
        Ok(())
    }

    async fn send_batch(&self, mut batch: Box<dyn MessageBatch>) -> BrokerResult<()> {
        let messages = batch.take_messages();
        self.state.batch_flushes.write().push(messages.len());
        self.state.queue.write().extend(messages);
        Ok(())
    }

    async fn close(&self) {}
}

#[async_trait]
impl BrokerReceiver for MemoryBroker {
    async fn receive(
        &self,
        max_messages: usize,
        _wait_time: Duration,
    ) -> BrokerResult<Vec<ReceivedMessage>> {
        // Wait time is immaterial for an in-process queue
        let mut queue = self.state.queue.write();
        let count = max_messages.min(queue.len());

        Ok(queue
            .drain(..count)
            .map(|message| ReceivedMessage {
                message_id: Uuid::new_v4().to_string(),
                body: message.body,
                application_properties: message.application_properties,
            })
            .collect())
    }

    async fn renew_lock(&self, message: &ReceivedMessage) -> BrokerResult<()> {
        if self
            .state
            .failing_renewals
            .read()
            .contains(&message.message_id)
        {
            return Err(BrokerError::transport(std::io::Error::other(
                "lock renewal rejected",
            )));
        }

        self.state
            .renewed_locks
            .write()
            .push(message.message_id.clone());
        Ok(())
    }

    async fn close(&self) {}
}

struct MemoryBatch {
    budget: usize,
    bytes: usize,
    messages: Vec<OutgoingMessage>,
}

impl MessageBatch for MemoryBatch {
    fn try_add(&mut self, message: &OutgoingMessage) -> bool {
        let size = message.encoded_size();
        if self.bytes + size > self.budget {
            return false;
        }

        self.bytes += size;
        self.messages.push(message.clone());
        true
    }

    fn count(&self) -> usize {
        self.messages.len()
    }

    fn take_messages(&mut self) -> Vec<OutgoingMessage> {
        self.bytes = 0;
        std::mem::take(&mut self.messages)
    }
}

/// How a pushed message was settled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Completed,
    Abandoned,
}

/// In-memory push processor: delivers a fixed set of messages to the
/// installed callback and records how each one was settled.
#[derive(Clone)]
pub struct MemoryProcessor {
    state: Arc<ProcessorState>,
}

struct ProcessorState {
    pending: RwLock<VecDeque<ReceivedMessage>>,
    settlements: RwLock<Vec<(String, Settlement)>>,
    stopped: AtomicBool,
}

impl MemoryProcessor {
    pub fn new(messages: Vec<ReceivedMessage>) -> Self {
        Self {
            state: Arc::new(ProcessorState {
                pending: RwLock::new(messages.into()),
                settlements: RwLock::new(Vec::new()),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Settlement of each delivered message, in delivery order
    pub fn settlements(&self) -> Vec<(String, Settlement)> {
        self.state.settlements.read().clone()
    }

    /// Check whether `stop` was called
    pub fn was_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerProcessor for MemoryProcessor {
    async fn start(&self, callback: DeliveryCallback) -> BrokerResult<()> {
        loop {
            let next = self.state.pending.write().pop_front();
            let Some(message) = next else { break };

            let settler = Arc::new(MemorySettler {
                message_id: message.message_id.clone(),
                state: self.state.clone(),
            });
            callback(message, settler).await;
        }
        Ok(())
    }

    async fn stop(&self) -> BrokerResult<()> {
        self.state.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct MemorySettler {
    message_id: String,
    state: Arc<ProcessorState>,
}

#[async_trait]
impl MessageSettler for MemorySettler {
    async fn complete(&self) -> BrokerResult<()> {
        self.state
            .settlements
            .write()
            .push((self.message_id.clone(), Settlement::Completed));
        Ok(())
    }

    async fn abandon(&self) -> BrokerResult<()> {
        self.state
            .settlements
            .write()
            .push((self.message_id.clone(), Settlement::Abandoned));
        Ok(())
    }
}
