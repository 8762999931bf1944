use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

use crate::{ModelError, STOP_ROUTING_PREFIX};

/// Opaque identifier of one managed node process.
///
/// The only correlation key between the start and the stop flows.
/// Always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BuildId(String);

impl BuildId {
    pub fn new(id: impl Into<String>) -> Result<Self, ModelError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ModelError::EmptyBuildId);
        }
        Ok(Self(id))
    }

    /// Derive the build id from a stop-channel routing key (`cmd.<id>`).
    pub fn from_routing_key(key: &str) -> Result<Self, ModelError> {
        let id = key
            .strip_prefix(STOP_ROUTING_PREFIX)
            .ok_or_else(|| ModelError::InvalidRoutingKey(key.to_string()))?;
        Self::new(id)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BuildId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for BuildId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BuildId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for BuildId {
    type Error = ModelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BuildId> for String {
    fn from(id: BuildId) -> Self {
        id.0
    }
}
