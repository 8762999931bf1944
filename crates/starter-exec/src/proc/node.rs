use std::sync::{
    OnceLock,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use starter_core::{LifecycleError, NodeProcess};
use starter_model::{BuildId, ExitOutcome, TerminationRequest};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Child,
    sync::{Mutex, Notify},
};
use tracing::{debug, info, warn};

use crate::util::{Signal, exit_outcome, send_signal};

/// A spawned node child process.
///
/// The child is only reaped while its lock is held, and `exited` is set under
/// that same lock. Signals take the lock too, so a signal can never reach a
/// pid that was already reaped and possibly reused. A pending
/// [`NodeProcess::wait`] hands the lock over whenever a signal asks for it.
pub struct ProcessNode {
    build_id: BuildId,
    pid: Option<u32>,
    child: Mutex<Child>,
    handover: Notify,
    signals_pending: AtomicUsize,
    exited: AtomicBool,
    outcome: OnceLock<ExitOutcome>,
}

impl ProcessNode {
    pub(crate) fn adopt(build_id: BuildId, mut child: Child) -> Self {
        if let Some(stdout) = child.stdout.take() {
            pipe_lines(build_id.clone(), "stdout", stdout);
        }
        if let Some(stderr) = child.stderr.take() {
            pipe_lines(build_id.clone(), "stderr", stderr);
        }

        Self {
            build_id,
            pid: child.id(),
            child: Mutex::new(child),
            handover: Notify::new(),
            signals_pending: AtomicUsize::new(0),
            exited: AtomicBool::new(false),
            outcome: OnceLock::new(),
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    async fn signal(&self, signal: Signal) -> Result<(), LifecycleError> {
        let pending = PendingSignal::enter(&self.signals_pending);
        self.handover.notify_one();
        let _child = self.child.lock().await;
        drop(pending);

        let Some(pid) = self.pid.filter(|_| self.is_alive()) else {
            debug!(target: "starter.exec.node", build_id = %self.build_id, signal = signal.name(), "process already exited; signal skipped");
            return Ok(());
        };
        send_signal(pid, signal).map_err(|e| e.into_termination(&self.build_id))
    }
}

#[async_trait]
impl NodeProcess for ProcessNode {
    fn build_id(&self) -> &BuildId {
        &self.build_id
    }

    fn is_alive(&self) -> bool {
        !self.exited.load(Ordering::Acquire)
    }

    async fn wait(&self) -> ExitOutcome {
        loop {
            let mut child = self.child.lock().await;
            if let Some(outcome) = self.outcome.get() {
                return *outcome;
            }
            if self.signals_pending.load(Ordering::Acquire) > 0 {
                // A signaller has not queued on the lock yet.
                drop(child);
                tokio::task::yield_now().await;
                continue;
            }

            tokio::select! {
                status = child.wait() => {
                    let outcome = match status {
                        Ok(status) => exit_outcome(status),
                        Err(e) => {
                            warn!(target: "starter.exec.node", build_id = %self.build_id, error = %e, "wait on node process failed");
                            ExitOutcome::Unknown
                        }
                    };
                    self.exited.store(true, Ordering::Release);
                    let _ = self.outcome.set(outcome);
                    return outcome;
                }
                // Release the lock for a signal, then resume waiting.
                _ = self.handover.notified() => {}
            }
        }
    }

    async fn terminate(&self, request: &TerminationRequest) -> Result<(), LifecycleError> {
        info!(target: "starter.exec.node", build_id = %self.build_id, stopped_by = request.actor(), pid = ?self.pid, "sending SIGTERM");
        self.signal(Signal::Term).await
    }

    async fn force_terminate(&self) -> Result<(), LifecycleError> {
        info!(target: "starter.exec.node", build_id = %self.build_id, pid = ?self.pid, "sending SIGKILL");
        self.signal(Signal::Kill).await
    }
}

/// Counts a signaller from before it queues on the child lock until it holds it.
struct PendingSignal<'a>(&'a AtomicUsize);

impl<'a> PendingSignal<'a> {
    fn enter(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::AcqRel);
        Self(count)
    }
}

impl Drop for PendingSignal<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

fn pipe_lines<R>(build_id: BuildId, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(target: "starter.exec.node", %build_id, stream, %line);
        }
    });
}
