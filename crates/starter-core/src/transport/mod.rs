//! Inbound message transport seam.
//!
//! The orchestrator only needs five operations from a queue client:
//! set up, subscribe, ack, reject, close. Anything that speaks AMQP-like
//! delivery semantics can sit behind [`Consumer`].

mod memory;
pub use memory::{AckOutcome, MemoryConsumer, MemoryPublisher};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::TransportError;

/// One inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Transport-assigned tag used to ack/reject this delivery.
    pub tag: u64,
    /// Routing metadata; carries `cmd.<build_id>` on the stop channel.
    pub routing_key: String,
    pub payload: Vec<u8>,
}

impl Delivery {
    pub fn new(tag: u64, routing_key: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            tag,
            routing_key: routing_key.into(),
            payload: payload.into(),
        }
    }
}

/// Subscription to one inbound channel.
#[async_trait]
pub trait Consumer: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Prepare the channel (connect, declare queues).
    async fn setup(&self) -> Result<(), TransportError>;

    /// Start consuming; may be called once per setup.
    async fn subscribe(&self) -> Result<mpsc::Receiver<Delivery>, TransportError>;

    async fn ack(&self, delivery: &Delivery) -> Result<(), TransportError>;

    async fn reject(&self, delivery: &Delivery, requeue: bool) -> Result<(), TransportError>;

    /// Tear the channel down; deliveries in flight are not settled.
    async fn close(&self) -> Result<(), TransportError>;
}
