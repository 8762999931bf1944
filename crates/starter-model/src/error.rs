use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("build id is empty")]
    EmptyBuildId,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("invalid field `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("routing key `{0}` does not carry the `cmd.` prefix")]
    InvalidRoutingKey(String),
    #[error("payload is not valid json: {0}")]
    InvalidJson(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(e: serde_json::Error) -> Self {
        ModelError::InvalidJson(e.to_string())
    }
}
