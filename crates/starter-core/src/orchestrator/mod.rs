mod builder;
pub use builder::OrchestratorBuilder;

mod dispatch;

use std::sync::Arc;

use tokio::{sync::Mutex, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{Span, debug, error, info, instrument};

use crate::{
    config::StarterConfig,
    error::{LifecycleError, TransportError},
    handler::{DeliveryHandler, StartHandler, StopHandler},
    registry::BuildRegistry,
    report::Reporter,
    transport::Consumer,
};

/// Top-level node lifecycle orchestrator.
///
/// Owns the registry, both handlers and both inbound subscriptions. Routes
/// start-channel deliveries to [`StartHandler`] and stop-channel deliveries
/// to [`StopHandler`]; holds no business logic of its own.
pub struct Orchestrator {
    consumer: Arc<dyn Consumer>,
    shutdown_consumer: Arc<dyn Consumer>,
    reporter: Arc<dyn Reporter>,
    registry: BuildRegistry,
    start: Arc<StartHandler>,
    stop: Arc<StopHandler>,
    span: Span,
    listening: Mutex<Option<Listening>>,
}

struct Listening {
    cancel: CancellationToken,
    loops: Vec<JoinHandle<()>>,
}

impl Orchestrator {
    pub fn builder(config: StarterConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    /// Registry of running builds (read-only use intended).
    pub fn registry(&self) -> &BuildRegistry {
        &self.registry
    }

    pub async fn is_listening(&self) -> bool {
        self.listening.lock().await.is_some()
    }

    /// Set up transports and reporting, then subscribe to both channels.
    ///
    /// Order: start consumer, shutdown consumer, reporter, start subscription,
    /// stop subscription. If the stop subscription fails both consumers are
    /// closed; transports that cannot reopen need a fresh orchestrator.
    #[instrument(level = "info", skip(self), parent = &self.span)]
    pub async fn start_listening(&self) -> Result<(), LifecycleError> {
        let mut listening = self.listening.lock().await;
        if listening.is_some() {
            return Err(LifecycleError::AlreadyListening);
        }

        self.consumer.setup().await?;
        self.shutdown_consumer.setup().await?;
        self.reporter.setup().await?;

        let cancel = CancellationToken::new();
        let start_rx = self.consumer.subscribe().await?;
        let start_loop = dispatch::spawn(
            start_rx,
            Arc::clone(&self.consumer),
            Arc::clone(&self.start) as Arc<dyn DeliveryHandler>,
            cancel.child_token(),
            &self.span,
        );

        let stop_rx = match self.shutdown_consumer.subscribe().await {
            Ok(rx) => rx,
            Err(e) => {
                error!(error = %e, "stop channel subscription failed; tearing down");
                cancel.cancel();
                let _ = start_loop.await;
                let _ = close(self.consumer.as_ref()).await;
                let _ = close(self.shutdown_consumer.as_ref()).await;
                return Err(e.into());
            }
        };
        let stop_loop = dispatch::spawn(
            stop_rx,
            Arc::clone(&self.shutdown_consumer),
            Arc::clone(&self.stop) as Arc<dyn DeliveryHandler>,
            cancel.child_token(),
            &self.span,
        );

        *listening = Some(Listening {
            cancel,
            loops: vec![start_loop, stop_loop],
        });
        info!("listening for start and stop commands");
        Ok(())
    }

    /// Stop dispatching and close both consumers.
    ///
    /// Exit watchers and armed watchdogs keep running; they are neither joined nor killed.
    #[instrument(level = "info", skip(self), parent = &self.span)]
    pub async fn stop_listening(&self) -> Result<(), LifecycleError> {
        info!("stopping listening. Bye, bye.");
        let Some(listening) = self.listening.lock().await.take() else {
            debug!("not listening; nothing to stop");
            return Ok(());
        };

        listening.cancel.cancel();
        for handle in listening.loops {
            if let Err(e) = handle.await {
                error!(error = %e, "dispatch loop ended abnormally");
            }
        }

        let closed = close(self.consumer.as_ref()).await;
        let shutdown_closed = close(self.shutdown_consumer.as_ref()).await;
        closed.and(shutdown_closed).map_err(LifecycleError::from)
    }
}

async fn close(consumer: &dyn Consumer) -> Result<(), TransportError> {
    consumer.close().await.inspect_err(|e| {
        error!(consumer = consumer.name(), error = %e, "failed to close consumer");
    })
}
