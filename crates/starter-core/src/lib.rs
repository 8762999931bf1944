mod error;
pub use error::{ConfigError, LifecycleError, TransportError};

mod config;
pub use config::StarterConfig;

mod node;
pub use node::{NodeLauncher, NodeProcess, NodeRef};

pub mod registry;
pub use registry::BuildRegistry;

pub mod transport;
pub use transport::{AckOutcome, Consumer, Delivery, MemoryConsumer, MemoryPublisher};

mod report;
pub use report::{LogReporter, Reporter};

mod metrics;
pub use metrics::{MetricsBackend, MetricsHandle, NoopMetrics, noop_metrics};

pub mod handler;
pub use handler::{DeliveryHandler, StartHandler, StopHandler, Watchdog, WatchdogVerdict};

mod orchestrator;
pub use orchestrator::{Orchestrator, OrchestratorBuilder};

#[cfg(test)]
mod testing;

pub mod prelude {
    pub use crate::{
        BuildRegistry, Consumer, Delivery, LifecycleError, NodeLauncher, NodeProcess, NodeRef,
        Orchestrator, Reporter, StarterConfig,
    };
    pub use starter_model::{BuildId, ExitOutcome, LaunchRequest, TerminationRequest};
}
