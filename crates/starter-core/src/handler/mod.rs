mod start;
pub use start::StartHandler;

mod stop;
pub use stop::StopHandler;

mod watchdog;
pub use watchdog::{Watchdog, WatchdogVerdict};

use async_trait::async_trait;
use tracing::error;

use crate::{
    error::LifecycleError,
    metrics::MetricsHandle,
    transport::{Consumer, Delivery},
};

/// Processes one delivery of a channel, settling it on `consumer`.
///
/// Errors are already logged and the delivery rejected when this returns `Err`;
/// the result only tells the caller what happened.
#[async_trait]
pub trait DeliveryHandler: Send + Sync + 'static {
    fn channel(&self) -> &'static str;

    async fn handle(&self, consumer: &dyn Consumer, delivery: Delivery)
    -> Result<(), LifecycleError>;
}

/// Terminal failure path shared by both channels: log, count, reject without requeue.
async fn refuse(
    consumer: &dyn Consumer,
    delivery: &Delivery,
    channel: &'static str,
    err: &LifecycleError,
    metrics: &MetricsHandle,
) {
    error!(
        channel,
        tag = delivery.tag,
        routing_key = %delivery.routing_key,
        kind = err.kind(),
        error = %err,
        "command failed; rejecting without requeue"
    );
    metrics.record_rejected(channel, err.kind());

    if let Err(e) = consumer.reject(delivery, false).await {
        error!(channel, tag = delivery.tag, error = %e, "reject failed");
    }
}
