use serde::Deserialize;
use serde_json::Value;

use crate::{BuildId, LaunchRequest, ModelError};

/// Validated "start a node" command.
#[derive(Clone, Debug, PartialEq)]
pub struct StartCommand {
    pub build_id: BuildId,
    pub config: Value,
    pub enqueue_data: Value,
    pub node_api_uri: String,
}

/// Wire shape; every field optional so that absence maps onto [`ModelError::MissingField`]
/// instead of an opaque serde message. JSON `null` counts as absent.
#[derive(Deserialize)]
struct RawStartCommand {
    build_id: Option<String>,
    config: Option<Value>,
    enqueue_data: Option<Value>,
    node_api_uri: Option<String>,
}

impl StartCommand {
    /// Parse and validate a start-channel payload.
    pub fn from_slice(payload: &[u8]) -> Result<Self, ModelError> {
        let raw: RawStartCommand = serde_json::from_slice(payload)?;

        let build_id = raw.build_id.ok_or(ModelError::MissingField("build_id"))?;
        let config = raw.config.ok_or(ModelError::MissingField("config"))?;
        let enqueue_data = raw
            .enqueue_data
            .ok_or(ModelError::MissingField("enqueue_data"))?;
        let node_api_uri = raw
            .node_api_uri
            .ok_or(ModelError::MissingField("node_api_uri"))?;

        if node_api_uri.trim().is_empty() {
            return Err(ModelError::InvalidField {
                field: "node_api_uri",
                reason: "must not be empty".into(),
            });
        }

        Ok(Self {
            build_id: BuildId::new(build_id)?,
            config,
            enqueue_data,
            node_api_uri,
        })
    }

    /// Build the process launch request; the node API URI becomes the callback URI.
    pub fn to_launch_request(&self) -> LaunchRequest {
        LaunchRequest {
            build_id: self.build_id.clone(),
            config: self.config.clone(),
            enqueue_data: self.enqueue_data.clone(),
            callback_uri: self.node_api_uri.clone(),
        }
    }
}
