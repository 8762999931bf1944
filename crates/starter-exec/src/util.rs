use std::process::ExitStatus;

use starter_model::ExitOutcome;
use tokio::process::Command;

use crate::error::{ExecError, ExecResult};

pub fn cmd_program(program: &str, args: &[String]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args.iter().map(|s| s.as_str()));
    cmd
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Term,
    Kill,
}

impl Signal {
    pub fn name(self) -> &'static str {
        match self {
            Signal::Term => "SIGTERM",
            Signal::Kill => "SIGKILL",
        }
    }
}

/// Deliver `signal` to `pid`. A process that is already gone counts as success.
#[cfg(unix)]
pub fn send_signal(pid: u32, signal: Signal) -> ExecResult<()> {
    let raw = match signal {
        Signal::Term => libc::SIGTERM,
        Signal::Kill => libc::SIGKILL,
    };
    let pid = libc::pid_t::try_from(pid).map_err(|_| ExecError::Signal {
        signal: signal.name(),
        reason: format!("pid {pid} out of range"),
    })?;

    // SAFETY: kill(2) takes plain integers and touches no memory of ours.
    if unsafe { libc::kill(pid, raw) } == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        return Ok(());
    }
    Err(ExecError::Signal {
        signal: signal.name(),
        reason: err.to_string(),
    })
}

#[cfg(not(unix))]
pub fn send_signal(_pid: u32, _signal: Signal) -> ExecResult<()> {
    Err(ExecError::Unsupported)
}

pub fn exit_outcome(status: ExitStatus) -> ExitOutcome {
    if status.success() {
        return ExitOutcome::Success;
    }
    if let Some(code) = status.code() {
        return ExitOutcome::Failed { code };
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExitOutcome::Signaled { signal };
        }
    }
    ExitOutcome::Unknown
}
