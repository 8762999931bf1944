use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, info_span, trace};

use crate::{
    handler::DeliveryHandler,
    transport::{Consumer, Delivery},
};

/// Route every delivery of one channel to its handler until cancelled or the channel closes.
///
/// Handlers return promptly: waiting for exits and watchdog sleeps run on their own tasks.
pub(super) fn spawn(
    mut rx: mpsc::Receiver<Delivery>,
    consumer: Arc<dyn Consumer>,
    handler: Arc<dyn DeliveryHandler>,
    cancel: CancellationToken,
    parent: &Span,
) -> JoinHandle<()> {
    let channel = handler.channel();
    let span = info_span!(parent: parent, "dispatch", channel);

    tokio::spawn(
        async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        debug!("dispatch cancelled");
                        break;
                    }
                    next = rx.recv() => match next {
                        Some(delivery) => {
                            trace!(tag = delivery.tag, "dispatching delivery");
                            // Failures are logged and settled by the handler itself.
                            let _ = handler.handle(consumer.as_ref(), delivery).await;
                        }
                        None => {
                            debug!("channel closed");
                            break;
                        }
                    }
                }
            }
        }
        .instrument(span),
    )
}
