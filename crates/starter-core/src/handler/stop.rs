use async_trait::async_trait;
use starter_model::{StopCommand, TerminationRequest, channel};
use tracing::{Instrument, Span, debug, info, info_span, warn};

use super::{DeliveryHandler, Watchdog, refuse};
use crate::{
    error::LifecycleError,
    metrics::MetricsHandle,
    node::NodeRef,
    registry::BuildRegistry,
    transport::{Consumer, Delivery},
};

/// Handles the stop channel: graceful stop now, forced stop later.
///
/// The watchdog is armed only after a valid build id was parsed and the
/// immediate termination went through; malformed or failed stops leave
/// nothing scheduled.
pub struct StopHandler {
    registry: BuildRegistry,
    watchdog: Watchdog,
    metrics: MetricsHandle,
    span: Span,
}

impl StopHandler {
    pub fn new(
        registry: BuildRegistry,
        watchdog: Watchdog,
        metrics: MetricsHandle,
        parent: &Span,
    ) -> Self {
        Self {
            registry,
            watchdog,
            metrics,
            span: info_span!(parent: parent, "stop_handler"),
        }
    }

    /// Graceful stop; returns the request and the instance it was sent to, if any.
    async fn terminate(
        &self,
        delivery: &Delivery,
    ) -> Result<(TerminationRequest, Option<NodeRef>), LifecycleError> {
        let cmd = StopCommand::parse(&delivery.routing_key, &delivery.payload)?;
        let request = cmd.to_termination_request();
        self.metrics.record_stop_requested();

        let node = self.registry.get(&request.build_id);
        match &node {
            Some(node) => {
                node.terminate(&request).await?;
                info!(build_id = %request.build_id, stopped_by = request.actor(), "termination requested");
            }
            None => {
                info!(build_id = %request.build_id, stopped_by = request.actor(), "build is not running; nothing to terminate");
            }
        }
        Ok((request, node))
    }
}

#[async_trait]
impl DeliveryHandler for StopHandler {
    fn channel(&self) -> &'static str {
        channel::STOP
    }

    async fn handle(
        &self,
        consumer: &dyn Consumer,
        delivery: Delivery,
    ) -> Result<(), LifecycleError> {
        let span = self.span.clone();
        async {
            info!(routing_key = %delivery.routing_key, tag = delivery.tag, "received kill command");

            let (request, node) = match self.terminate(&delivery).await {
                Ok(stopped) => stopped,
                Err(e) => {
                    refuse(consumer, &delivery, channel::STOP, &e, &self.metrics).await;
                    return Err(e);
                }
            };

            if let Err(e) = consumer.ack(&delivery).await {
                warn!(build_id = %request.build_id, error = %e, "ack of stop command failed");
            }

            debug!(
                build_id = %request.build_id,
                wait_secs = self.watchdog.delay().as_secs(),
                "force-kill check scheduled"
            );
            self.watchdog.arm(request.build_id, node);
            Ok(())
        }
        .instrument(span)
        .await
    }
}
