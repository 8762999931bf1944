use serde::{Deserialize, Serialize};

/// How a managed node process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExitOutcome {
    /// Exited with status code zero.
    Success,
    /// Exited with a non-zero status code.
    Failed { code: i32 },
    /// Terminated by a signal.
    Signaled { signal: i32 },
    /// Exit could not be observed (wait itself failed).
    Unknown,
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Success)
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ExitOutcome::Success => "success",
            ExitOutcome::Failed { .. } => "failed",
            ExitOutcome::Signaled { .. } => "signaled",
            ExitOutcome::Unknown => "unknown",
        }
    }
}
