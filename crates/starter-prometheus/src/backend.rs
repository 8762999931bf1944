use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder, proto::MetricFamily,
};
use starter_core::MetricsBackend;
use starter_model::ExitOutcome;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("metrics text is not utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Prometheus-backed [`MetricsBackend`]. Clones share the same collectors.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,
    received: IntCounter,
    started: IntCounter,
    exited: IntCounterVec,
    running: IntGauge,
    rejected: IntCounterVec,
    stop_requests: IntCounter,
    watchdog_kills: IntCounter,
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, MetricsError> {
        Self::with_registry(Registry::new())
    }

    /// Register every collector in `registry`.
    pub fn with_registry(registry: Registry) -> Result<Self, MetricsError> {
        let received = IntCounter::new(
            "starter_builds_received_total",
            "Start commands accepted for launch",
        )?;
        let started = IntCounter::new(
            "starter_builds_started_total",
            "Nodes launched and registered",
        )?;
        let exited = IntCounterVec::new(
            Opts::new("starter_builds_exited_total", "Node exits observed"),
            &["outcome"],
        )?;
        let running = IntGauge::new("starter_builds_running", "Nodes currently registered")?;
        let rejected = IntCounterVec::new(
            Opts::new(
                "starter_messages_rejected_total",
                "Deliveries rejected without requeue",
            ),
            &["channel", "reason"],
        )?;
        let stop_requests = IntCounter::new(
            "starter_stop_requests_total",
            "Valid stop commands processed",
        )?;
        let watchdog_kills = IntCounter::new(
            "starter_watchdog_kills_total",
            "Nodes force-killed after the shutdown wait",
        )?;

        registry.register(Box::new(received.clone()))?;
        registry.register(Box::new(started.clone()))?;
        registry.register(Box::new(exited.clone()))?;
        registry.register(Box::new(running.clone()))?;
        registry.register(Box::new(rejected.clone()))?;
        registry.register(Box::new(stop_requests.clone()))?;
        registry.register(Box::new(watchdog_kills.clone()))?;

        Ok(Self {
            registry,
            received,
            started,
            exited,
            running,
            rejected,
            stop_requests,
            watchdog_kills,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn gather(&self) -> Vec<MetricFamily> {
        self.registry.gather()
    }

    /// Text exposition format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.gather(), &mut buf)?;
        Ok(String::from_utf8(buf)?)
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn record_received(&self) {
        self.received.inc();
    }

    fn record_started(&self) {
        self.started.inc();
        self.running.inc();
    }

    fn record_rejected(&self, channel: &'static str, reason: &'static str) {
        self.rejected.with_label_values(&[channel, reason]).inc();
    }

    fn record_exited(&self, outcome: ExitOutcome) {
        self.exited.with_label_values(&[outcome.label()]).inc();
        self.running.dec();
    }

    fn record_stop_requested(&self) {
        self.stop_requests.inc();
    }

    fn record_watchdog_kill(&self) {
        self.watchdog_kills.inc();
    }
}
