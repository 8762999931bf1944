use std::sync::Arc;

use async_trait::async_trait;
use starter_model::{BuildId, StartCommand, channel};
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use super::{DeliveryHandler, refuse};
use crate::{
    error::LifecycleError,
    metrics::MetricsHandle,
    node::{NodeLauncher, NodeRef},
    registry::BuildRegistry,
    report::Reporter,
    transport::{Consumer, Delivery},
};

/// Handles the start channel: launch, ack, register, watch for exit.
///
/// The ack strictly follows a successful launch. Nothing after the ack can
/// cause a reject, so a started node is never redelivered.
pub struct StartHandler {
    registry: BuildRegistry,
    launcher: Arc<dyn NodeLauncher>,
    reporter: Arc<dyn Reporter>,
    metrics: MetricsHandle,
    span: Span,
}

impl StartHandler {
    pub fn new(
        registry: BuildRegistry,
        launcher: Arc<dyn NodeLauncher>,
        reporter: Arc<dyn Reporter>,
        metrics: MetricsHandle,
        parent: &Span,
    ) -> Self {
        Self {
            registry,
            launcher,
            reporter,
            metrics,
            span: info_span!(parent: parent, "start_handler"),
        }
    }

    /// Everything up to and including the launch. Any error here rejects the delivery.
    async fn launch(&self, delivery: &Delivery) -> Result<(BuildId, NodeRef), LifecycleError> {
        let cmd = StartCommand::from_slice(&delivery.payload)?;
        let build_id = cmd.build_id.clone();
        info!(%build_id, tag = delivery.tag, "received START");

        if self.registry.contains(&build_id) {
            return Err(LifecycleError::AlreadyRegistered(build_id));
        }
        self.metrics.record_received();

        let request = cmd.to_launch_request();
        if let Err(e) = self.reporter.received(&build_id).await {
            warn!(%build_id, error = %e, "reporting `received` failed");
        }

        let node = self.launcher.launch(&request).await?;
        debug!(%build_id, launcher = self.launcher.name(), "node launched");
        Ok((build_id, node))
    }

    /// Post-launch bookkeeping; infallible from the message's point of view.
    async fn adopt(
        &self,
        consumer: &dyn Consumer,
        delivery: &Delivery,
        build_id: BuildId,
        node: NodeRef,
    ) {
        if let Err(e) = consumer.ack(delivery).await {
            warn!(%build_id, tag = delivery.tag, error = %e, "ack failed after launch; build stays owned");
        }

        if let Err(e) = self.registry.register(build_id.clone(), Arc::clone(&node)) {
            error!(%build_id, error = %e, "duplicate build launched concurrently; killing the newcomer");
            self.discard(node);
            return;
        }
        self.metrics.record_started();

        if let Err(e) = self.reporter.started(&build_id).await {
            warn!(%build_id, error = %e, "reporting `started` failed");
        }

        self.watch_exit(build_id, node);
    }

    /// Background exit watcher: its only obligation is to unregister the build.
    fn watch_exit(&self, build_id: BuildId, node: NodeRef) {
        let registry = self.registry.clone();
        let metrics = Arc::clone(&self.metrics);
        let span = info_span!(parent: &self.span, "exit_watcher", %build_id);

        tokio::spawn(
            async move {
                let outcome = node.wait().await;
                registry.unregister(&build_id);
                metrics.record_exited(outcome);
                if outcome.is_success() {
                    info!(outcome = outcome.label(), "node exited; build unregistered");
                } else {
                    warn!(outcome = outcome.label(), "node exited abnormally; build unregistered");
                }
            }
            .instrument(span),
        );
    }

    fn discard(&self, node: NodeRef) {
        let span = info_span!(parent: &self.span, "discard", build_id = %node.build_id());
        tokio::spawn(
            async move {
                if let Err(e) = node.force_terminate().await {
                    error!(error = %e, "failed to kill duplicate node");
                }
                node.wait().await;
            }
            .instrument(span),
        );
    }
}

#[async_trait]
impl DeliveryHandler for StartHandler {
    fn channel(&self) -> &'static str {
        channel::START
    }

    async fn handle(
        &self,
        consumer: &dyn Consumer,
        delivery: Delivery,
    ) -> Result<(), LifecycleError> {
        let span = self.span.clone();
        async {
            match self.launch(&delivery).await {
                Ok((build_id, node)) => {
                    self.adopt(consumer, &delivery, build_id, node).await;
                    Ok(())
                }
                Err(e) => {
                    refuse(consumer, &delivery, channel::START, &e, &self.metrics).await;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }
}
