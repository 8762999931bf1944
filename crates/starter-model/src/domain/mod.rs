mod build_id;
pub use build_id::BuildId;

mod constants;
pub use constants::{STOP_ROUTING_PREFIX, channel};

mod request;
pub use request::{LaunchRequest, TerminationRequest};

mod outcome;
pub use outcome::ExitOutcome;

/// Identifier of the actor that requested a stop (user name, service name).
pub type Actor = String;
