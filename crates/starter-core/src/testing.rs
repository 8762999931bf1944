//! Hand-written doubles for the collaborator traits.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use starter_model::{BuildId, ExitOutcome, LaunchRequest, TerminationRequest};
use tokio::sync::{mpsc, watch};

use crate::{
    BuildRegistry, Consumer, Delivery, LifecycleError, NodeLauncher, NodeProcess, NodeRef,
    Reporter, TransportError,
};

/// Shared, ordered event log.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Yield to the runtime until `cond` holds.
pub async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..1_000 {
        if cond() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

pub struct MockNode {
    build_id: BuildId,
    alive: AtomicBool,
    exited: watch::Sender<bool>,
    terminations: Mutex<Vec<Option<String>>>,
    forced: AtomicUsize,
    exit_on_terminate: bool,
    fail_terminate: bool,
    fail_force: bool,
}

pub struct MockNodeBuilder {
    build_id: String,
    exit_on_terminate: bool,
    fail_terminate: bool,
    fail_force: bool,
}

impl MockNodeBuilder {
    pub fn exit_on_terminate(mut self) -> Self {
        self.exit_on_terminate = true;
        self
    }

    pub fn failing_terminate(mut self) -> Self {
        self.fail_terminate = true;
        self
    }

    pub fn failing_force(mut self) -> Self {
        self.fail_force = true;
        self
    }

    pub fn build(self) -> Arc<MockNode> {
        let (exited, _) = watch::channel(false);
        Arc::new(MockNode {
            build_id: BuildId::new(self.build_id).unwrap(),
            alive: AtomicBool::new(true),
            exited,
            terminations: Mutex::new(Vec::new()),
            forced: AtomicUsize::new(0),
            exit_on_terminate: self.exit_on_terminate,
            fail_terminate: self.fail_terminate,
            fail_force: self.fail_force,
        })
    }
}

impl MockNode {
    pub fn builder(id: &str) -> MockNodeBuilder {
        MockNodeBuilder {
            build_id: id.to_string(),
            exit_on_terminate: false,
            fail_terminate: false,
            fail_force: false,
        }
    }

    /// A node that ignores graceful stops.
    pub fn arc(id: &str) -> Arc<MockNode> {
        Self::builder(id).build()
    }

    /// Make the process exit.
    pub fn exit(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.exited.send_replace(true);
    }

    /// Actors of every graceful termination received.
    pub fn terminations(&self) -> Vec<Option<String>> {
        self.terminations.lock().unwrap().clone()
    }

    /// Number of force-kill attempts.
    pub fn force_count(&self) -> usize {
        self.forced.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NodeProcess for MockNode {
    fn build_id(&self) -> &BuildId {
        &self.build_id
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn wait(&self) -> ExitOutcome {
        let mut rx = self.exited.subscribe();
        let _ = rx.wait_for(|exited| *exited).await;
        ExitOutcome::Success
    }

    async fn terminate(&self, request: &TerminationRequest) -> Result<(), LifecycleError> {
        if self.fail_terminate {
            return Err(LifecycleError::termination(&self.build_id, "signal refused"));
        }
        self.terminations
            .lock()
            .unwrap()
            .push(request.stopped_by.clone());
        if self.exit_on_terminate {
            self.exit();
        }
        Ok(())
    }

    async fn force_terminate(&self) -> Result<(), LifecycleError> {
        self.forced.fetch_add(1, Ordering::SeqCst);
        if self.fail_force {
            return Err(LifecycleError::termination(&self.build_id, "kill refused"));
        }
        self.exit();
        Ok(())
    }
}

#[derive(Default)]
pub struct MockLauncher {
    journal: Journal,
    nodes: Mutex<Vec<Arc<MockNode>>>,
    launches: AtomicUsize,
    fail: bool,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Most recently launched node for `id`.
    pub fn node(&self, id: &str) -> Option<Arc<MockNode>> {
        self.nodes
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|n| n.build_id.as_str() == id)
            .cloned()
    }
}

#[async_trait]
impl NodeLauncher for MockLauncher {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn launch(&self, request: &LaunchRequest) -> Result<NodeRef, LifecycleError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.journal.push(format!("launch:{}", request.build_id));
        if self.fail {
            return Err(LifecycleError::spawn(&request.build_id, "boom"));
        }
        let node = MockNode::arc(request.build_id.as_str());
        self.nodes.lock().unwrap().push(Arc::clone(&node));
        Ok(node)
    }
}

/// Reporter that journals calls and checks the registry on `started`.
pub struct RecordingReporter {
    journal: Journal,
    registry: BuildRegistry,
    events: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingReporter {
    pub fn new(journal: Journal, registry: BuildRegistry) -> Self {
        Self {
            journal,
            registry,
            events: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, entry: String) -> Result<(), LifecycleError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(LifecycleError::Reporting("sink down".into()));
        }
        self.events.lock().unwrap().push(entry.clone());
        self.journal.push(entry);
        Ok(())
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    async fn received(&self, build_id: &BuildId) -> Result<(), LifecycleError> {
        self.record(format!("received:{build_id}"))
    }

    async fn started(&self, build_id: &BuildId) -> Result<(), LifecycleError> {
        let registered = self.registry.contains(build_id);
        self.record(format!("started:{build_id}:registered={registered}"))
    }
}

/// Consumer that only journals settlements; checks the registry on ack.
pub struct JournalConsumer {
    journal: Journal,
    registry: BuildRegistry,
    fail_ack: bool,
}

impl JournalConsumer {
    pub fn new(journal: Journal, registry: BuildRegistry) -> Self {
        Self {
            journal,
            registry,
            fail_ack: false,
        }
    }

    pub fn failing_ack(mut self) -> Self {
        self.fail_ack = true;
        self
    }
}

#[async_trait]
impl Consumer for JournalConsumer {
    fn name(&self) -> &str {
        "journal"
    }

    async fn setup(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn subscribe(&self) -> Result<mpsc::Receiver<Delivery>, TransportError> {
        Err(TransportError::Other("journal consumer has no stream".into()))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), TransportError> {
        if self.fail_ack {
            self.journal.push(format!("ack-failed:{}", delivery.tag));
            return Err(TransportError::Other("channel dropped".into()));
        }
        let registered = !self.registry.is_empty();
        self.journal
            .push(format!("ack:{}:registered={registered}", delivery.tag));
        Ok(())
    }

    async fn reject(&self, delivery: &Delivery, requeue: bool) -> Result<(), TransportError> {
        self.journal
            .push(format!("reject:{}:requeue={requeue}", delivery.tag));
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        Ok(())
    }
}
