//! Wire and domain types shared by the node starter crates.
//!
//! Inbound commands arrive as raw bytes on two channels:
//! - the start channel carries a JSON [`StartCommand`];
//! - the stop channel carries a routing key `cmd.<build_id>` plus a JSON payload parsed into a [`StopCommand`].
//!
//! Parsing never panics; every malformed input surfaces as a [`ModelError`].

mod domain;
pub use domain::*;

mod command;
pub use command::{StartCommand, StopCommand};

mod error;
pub use error::ModelError;
