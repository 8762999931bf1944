mod start;
pub use start::StartCommand;

mod stop;
pub use stop::StopCommand;
