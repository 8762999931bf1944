use async_trait::async_trait;
use starter_model::BuildId;
use tracing::info;

use crate::error::LifecycleError;

/// Status-reporting sink.
///
/// Notifications are fire-and-forget from the lifecycle's point of view:
/// an error is logged by the caller and never aborts a start.
#[async_trait]
pub trait Reporter: Send + Sync + 'static {
    async fn setup(&self) -> Result<(), LifecycleError> {
        Ok(())
    }

    /// The start command was accepted; the node is about to be spawned.
    async fn received(&self, build_id: &BuildId) -> Result<(), LifecycleError>;

    /// The node process is running and registered.
    async fn started(&self, build_id: &BuildId) -> Result<(), LifecycleError>;
}

/// Reporter that only emits structured log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

#[async_trait]
impl Reporter for LogReporter {
    async fn received(&self, build_id: &BuildId) -> Result<(), LifecycleError> {
        info!(target: "starter.report", %build_id, status = "received", "build status");
        Ok(())
    }

    async fn started(&self, build_id: &BuildId) -> Result<(), LifecycleError> {
        info!(target: "starter.report", %build_id, status = "started", "build status");
        Ok(())
    }
}
