mod error;
pub use error::{ExecError, ExecResult};

pub mod proc;
pub use proc::{ExecConfig, ProcessLauncher, ProcessNode};

mod util;

pub mod prelude {
    pub use crate::error::{ExecError, ExecResult};
    pub use crate::{ExecConfig, ProcessLauncher};
}
