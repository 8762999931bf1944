use std::sync::Arc;

use starter_model::ExitOutcome;

/// Sink for lifecycle counters. Every method defaults to a no-op.
pub trait MetricsBackend: Send + Sync + 'static {
    /// A valid start command was accepted.
    fn record_received(&self) {}
    /// A node was launched and registered.
    fn record_started(&self) {}
    /// A delivery was rejected; `reason` is [`crate::LifecycleError::kind`].
    fn record_rejected(&self, _channel: &'static str, _reason: &'static str) {}
    /// The exit watcher observed a node exit.
    fn record_exited(&self, _outcome: ExitOutcome) {}
    /// A stop command was parsed.
    fn record_stop_requested(&self) {}
    /// The watchdog had to force-kill a node.
    fn record_watchdog_kill(&self) {}
}

pub type MetricsHandle = Arc<dyn MetricsBackend>;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsBackend for NoopMetrics {}

pub fn noop_metrics() -> MetricsHandle {
    Arc::new(NoopMetrics)
}
