use starter_model::{BuildId, ModelError};
use thiserror::Error;

/// Errors raised while driving a build through its lifecycle.
///
/// Every variant that reaches a message handler is terminal for that message:
/// it is logged and the delivery is rejected without requeue.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("malformed command: {0}")]
    MalformedCommand(#[from] ModelError),

    #[error("build {0} is already registered")]
    AlreadyRegistered(BuildId),

    #[error("spawn failed for build {build_id}: {reason}")]
    SpawnFailure { build_id: BuildId, reason: String },

    #[error("termination failed for build {build_id}: {reason}")]
    TerminationFailure { build_id: BuildId, reason: String },

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("reporting error: {0}")]
    Reporting(String),

    #[error("orchestrator is already listening")]
    AlreadyListening,
}

impl LifecycleError {
    pub fn spawn(build_id: &BuildId, reason: impl Into<String>) -> Self {
        LifecycleError::SpawnFailure {
            build_id: build_id.clone(),
            reason: reason.into(),
        }
    }

    pub fn termination(build_id: &BuildId, reason: impl Into<String>) -> Self {
        LifecycleError::TerminationFailure {
            build_id: build_id.clone(),
            reason: reason.into(),
        }
    }

    /// Short label used in logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::MalformedCommand(_) | LifecycleError::AlreadyRegistered(_) => {
                "malformed"
            }
            LifecycleError::SpawnFailure { .. } => "spawn",
            LifecycleError::TerminationFailure { .. } => "termination",
            LifecycleError::Transport(_) => "transport",
            LifecycleError::Reporting(_) => "reporting",
            LifecycleError::AlreadyListening => "state",
        }
    }
}

/// Errors reported by a message transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("consumer `{0}` is closed")]
    Closed(String),
    #[error("consumer `{0}` is already subscribed")]
    AlreadySubscribed(String),
    #[error("consumer `{0}` was not set up")]
    NotReady(String),
    #[error("delivery {0} was already acknowledged or rejected")]
    AlreadySettled(u64),
    #[error("unknown delivery tag {0}")]
    UnknownDelivery(u64),
    #[error("transport failure: {0}")]
    Other(String),
}

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: &'static str, reason: String },
    #[error("missing component: {0}")]
    MissingComponent(&'static str),
}
