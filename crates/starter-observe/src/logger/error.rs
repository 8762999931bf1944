use thiserror::Error;

/// Failures of [`logger_init`](crate::logger_init) and config validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoggerError {
    #[error("unknown log format {0:?}; use text, json or journald")]
    InvalidFormat(String),
    /// The `journald` feature is off or the target is not Linux.
    #[error("journald output unavailable in this build")]
    JournaldNotSupported,
    #[error("journald socket: {0}")]
    JournaldUnreachable(String),
    #[error("a global subscriber is already installed")]
    AlreadyInitialized,
    #[error("subscriber install failed: {0}")]
    InitializationFailed(String),
    #[error("invalid log level {level:?}: {reason}")]
    InvalidLogLevel { level: String, reason: String },
}
