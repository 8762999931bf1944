use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use super::{Consumer, Delivery};
use crate::error::TransportError;

/// Settlement recorded for a delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Acked,
    Rejected { requeue: bool },
}

/// Channel-backed [`Consumer`] for local runs and tests.
///
/// Messages are pushed with a [`MemoryPublisher`]; every ack/reject is recorded
/// by delivery tag and can be inspected with [`MemoryConsumer::outcome`].
pub struct MemoryConsumer {
    name: String,
    shared: Arc<Shared>,
    inner: Mutex<Inner>,
}

struct Shared {
    next_tag: AtomicU64,
    closed: AtomicBool,
}

struct Inner {
    tx: mpsc::Sender<Delivery>,
    rx: Option<mpsc::Receiver<Delivery>>,
    ready: bool,
    outcomes: HashMap<u64, AckOutcome>,
}

/// Cloneable publishing side of a [`MemoryConsumer`].
#[derive(Clone)]
pub struct MemoryPublisher {
    name: String,
    tx: mpsc::Sender<Delivery>,
    shared: Arc<Shared>,
}

impl MemoryConsumer {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        Self {
            name: name.into(),
            shared: Arc::new(Shared {
                next_tag: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
            inner: Mutex::new(Inner {
                tx,
                rx: Some(rx),
                ready: false,
                outcomes: HashMap::new(),
            }),
        }
    }

    pub fn publisher(&self) -> MemoryPublisher {
        MemoryPublisher {
            name: self.name.clone(),
            tx: self.lock().tx.clone(),
            shared: Arc::clone(&self.shared),
        }
    }

    /// How a delivery was settled; `None` while unsettled.
    pub fn outcome(&self, tag: u64) -> Option<AckOutcome> {
        self.lock().outcomes.get(&tag).copied()
    }

    /// All settlements, sorted by tag.
    pub fn outcomes(&self) -> Vec<(u64, AckOutcome)> {
        let mut all: Vec<_> = self
            .lock()
            .outcomes
            .iter()
            .map(|(tag, o)| (*tag, *o))
            .collect();
        all.sort_by_key(|(tag, _)| *tag);
        all
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    fn settle(&self, delivery: &Delivery, outcome: AckOutcome) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed(self.name.clone()));
        }
        if delivery.tag == 0 || delivery.tag >= self.shared.next_tag.load(Ordering::Acquire) {
            return Err(TransportError::UnknownDelivery(delivery.tag));
        }
        let mut inner = self.lock();
        if inner.outcomes.contains_key(&delivery.tag) {
            return Err(TransportError::AlreadySettled(delivery.tag));
        }
        inner.outcomes.insert(delivery.tag, outcome);
        trace!(consumer = %self.name, tag = delivery.tag, ?outcome, "delivery settled");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Consumer for MemoryConsumer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn setup(&self) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed(self.name.clone()));
        }
        self.lock().ready = true;
        debug!(consumer = %self.name, "consumer ready");
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<Delivery>, TransportError> {
        let mut inner = self.lock();
        if !inner.ready {
            return Err(TransportError::NotReady(self.name.clone()));
        }
        inner
            .rx
            .take()
            .ok_or_else(|| TransportError::AlreadySubscribed(self.name.clone()))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), TransportError> {
        self.settle(delivery, AckOutcome::Acked)
    }

    async fn reject(&self, delivery: &Delivery, requeue: bool) -> Result<(), TransportError> {
        self.settle(delivery, AckOutcome::Rejected { requeue })
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.shared.closed.store(true, Ordering::Release);
        self.lock().ready = false;
        debug!(consumer = %self.name, "consumer closed");
        Ok(())
    }
}

impl MemoryPublisher {
    /// Enqueue a message; returns its delivery tag.
    pub async fn publish(
        &self,
        routing_key: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Result<u64, TransportError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed(self.name.clone()));
        }
        let tag = self.shared.next_tag.fetch_add(1, Ordering::AcqRel);
        self.tx
            .send(Delivery::new(tag, routing_key, payload))
            .await
            .map_err(|_| TransportError::Closed(self.name.clone()))?;
        Ok(tag)
    }
}
