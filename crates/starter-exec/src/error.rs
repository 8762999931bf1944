use starter_core::LifecycleError;
use starter_model::BuildId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("missing program")]
    MissingProgram,
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("encode {field}: {reason}")]
    Encode { field: &'static str, reason: String },
    #[error("signal {signal} failed: {reason}")]
    Signal { signal: &'static str, reason: String },
    #[error("process signals are not supported on this platform")]
    Unsupported,
}

pub type ExecResult<T> = Result<T, ExecError>;

impl ExecError {
    /// Launch-time failure of `build_id`.
    pub fn into_spawn(self, build_id: &BuildId) -> LifecycleError {
        LifecycleError::spawn(build_id, self.to_string())
    }

    /// Signal-delivery failure of `build_id`.
    pub fn into_termination(self, build_id: &BuildId) -> LifecycleError {
        LifecycleError::termination(build_id, self.to_string())
    }
}
