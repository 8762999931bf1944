use std::sync::Arc;

use async_trait::async_trait;
use starter_model::{BuildId, ExitOutcome, LaunchRequest, TerminationRequest};

use crate::error::LifecycleError;

/// Handle to one launched node process.
///
/// `wait` may run concurrently with `terminate`/`force_terminate`.
/// Signalling a process that already exited must succeed as a no-op.
#[async_trait]
pub trait NodeProcess: Send + Sync + 'static {
    fn build_id(&self) -> &BuildId;

    /// `false` once the exit has been observed.
    fn is_alive(&self) -> bool;

    /// Block until the process exits.
    async fn wait(&self) -> ExitOutcome;

    /// Graceful stop request.
    async fn terminate(&self, request: &TerminationRequest) -> Result<(), LifecycleError>;

    /// Unconditional kill.
    async fn force_terminate(&self) -> Result<(), LifecycleError>;
}

pub type NodeRef = Arc<dyn NodeProcess>;

/// Launches node processes.
#[async_trait]
pub trait NodeLauncher: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Spawn the node; failures are [`LifecycleError::SpawnFailure`].
    async fn launch(&self, request: &LaunchRequest) -> Result<NodeRef, LifecycleError>;
}
