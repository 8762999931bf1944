/// Prefix of stop-channel routing keys; the remainder is the build id.
pub const STOP_ROUTING_PREFIX: &str = "cmd.";

/// Channel names used in logs and metric labels.
pub mod channel {
    pub const START: &str = "start";
    pub const STOP: &str = "stop";
}
