use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{Span, info_span};

use super::Orchestrator;
use crate::{
    config::StarterConfig,
    error::ConfigError,
    handler::{StartHandler, StopHandler, Watchdog},
    metrics::{MetricsHandle, noop_metrics},
    node::NodeLauncher,
    registry::BuildRegistry,
    report::{LogReporter, Reporter},
    transport::Consumer,
};

/// Wires collaborators into an [`Orchestrator`].
///
/// Consumers and launcher are required; reporter defaults to [`LogReporter`],
/// metrics to a no-op backend, span to `node_starter`.
pub struct OrchestratorBuilder {
    config: StarterConfig,
    consumer: Option<Arc<dyn Consumer>>,
    shutdown_consumer: Option<Arc<dyn Consumer>>,
    launcher: Option<Arc<dyn NodeLauncher>>,
    reporter: Option<Arc<dyn Reporter>>,
    metrics: Option<MetricsHandle>,
    span: Option<Span>,
}

impl OrchestratorBuilder {
    pub fn new(config: StarterConfig) -> Self {
        Self {
            config,
            consumer: None,
            shutdown_consumer: None,
            launcher: None,
            reporter: None,
            metrics: None,
            span: None,
        }
    }

    /// Start-channel and stop-channel consumers.
    pub fn with_consumers(
        mut self,
        consumer: Arc<dyn Consumer>,
        shutdown_consumer: Arc<dyn Consumer>,
    ) -> Self {
        self.consumer = Some(consumer);
        self.shutdown_consumer = Some(shutdown_consumer);
        self
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn NodeLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Parent span of every component span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn build(self) -> Result<Orchestrator, ConfigError> {
        self.config.validate()?;

        let consumer = self
            .consumer
            .ok_or(ConfigError::MissingComponent("consumer"))?;
        let shutdown_consumer = self
            .shutdown_consumer
            .ok_or(ConfigError::MissingComponent("shutdown consumer"))?;
        let launcher = self
            .launcher
            .ok_or(ConfigError::MissingComponent("launcher"))?;
        let reporter = self.reporter.unwrap_or_else(|| Arc::new(LogReporter));
        let metrics = self.metrics.unwrap_or_else(noop_metrics);
        let span = self.span.unwrap_or_else(|| info_span!("node_starter"));

        let registry = BuildRegistry::new();
        let start = StartHandler::new(
            registry.clone(),
            launcher,
            Arc::clone(&reporter),
            Arc::clone(&metrics),
            &span,
        );
        let watchdog = Watchdog::new(
            registry.clone(),
            self.config.shutdown_node_wait(),
            self.config.watchdog_limit,
            Arc::clone(&metrics),
            &span,
        );
        let stop = StopHandler::new(registry.clone(), watchdog, metrics, &span);

        Ok(Orchestrator {
            consumer,
            shutdown_consumer,
            reporter,
            registry,
            start: Arc::new(start),
            stop: Arc::new(stop),
            span,
            listening: Mutex::new(None),
        })
    }
}
