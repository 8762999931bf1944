use serde::Deserialize;

use crate::{Actor, BuildId, ModelError, TerminationRequest};

/// Validated "stop a node" command.
///
/// The build id comes from the routing key, the actor from the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StopCommand {
    pub build_id: BuildId,
    pub stopped_by: Option<Actor>,
}

#[derive(Deserialize)]
struct RawStopPayload {
    #[serde(default)]
    stopped_by: Option<String>,
}

impl StopCommand {
    /// Parse a stop-channel delivery: `routing_key` is `cmd.<build_id>`, `payload` a JSON object.
    pub fn parse(routing_key: &str, payload: &[u8]) -> Result<Self, ModelError> {
        let build_id = BuildId::from_routing_key(routing_key)?;
        let raw: RawStopPayload = serde_json::from_slice(payload)?;

        Ok(Self {
            build_id,
            stopped_by: raw.stopped_by.filter(|s| !s.trim().is_empty()),
        })
    }

    pub fn to_termination_request(&self) -> TerminationRequest {
        TerminationRequest::new(self.build_id.clone(), self.stopped_by.clone())
    }
}
