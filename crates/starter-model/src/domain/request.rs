use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Actor, BuildId};

/// Everything the process layer needs to launch one node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub build_id: BuildId,
    /// Node configuration, passed through untouched.
    pub config: Value,
    /// Data the node enqueues on startup, passed through untouched.
    pub enqueue_data: Value,
    /// URI the node reports back to.
    pub callback_uri: String,
}

/// Request to stop a running node, carrying who asked for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationRequest {
    pub build_id: BuildId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_by: Option<Actor>,
}

impl TerminationRequest {
    pub fn new(build_id: BuildId, stopped_by: Option<Actor>) -> Self {
        Self {
            build_id,
            stopped_by,
        }
    }

    /// Actor name for logs; `"unknown"` when the sender did not say.
    #[inline]
    pub fn actor(&self) -> &str {
        self.stopped_by.as_deref().unwrap_or("unknown")
    }
}
