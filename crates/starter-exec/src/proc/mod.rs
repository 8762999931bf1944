mod node;
pub use node::ProcessNode;

use std::{path::PathBuf, process::Stdio, sync::Arc};

use async_trait::async_trait;
use starter_core::{LifecycleError, NodeLauncher, NodeRef};
use starter_model::LaunchRequest;
use tracing::{debug, trace};

use crate::{
    error::{ExecError, ExecResult},
    util::cmd_program,
};

pub const ENV_BUILD_ID: &str = "NODE_BUILD_ID";
pub const ENV_API_URI: &str = "NODE_API_URI";
pub const ENV_CONFIG: &str = "NODE_CONFIG";
pub const ENV_ENQUEUE_DATA: &str = "NODE_ENQUEUE_DATA";

/// Node program configuration, shared by every launch.
#[derive(Clone, Debug, Default)]
pub struct ExecConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Extra environment; the per-build `NODE_*` variables win on conflict.
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl ExecConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn validate(&self) -> ExecResult<()> {
        if self.program.trim().is_empty() {
            return Err(ExecError::MissingProgram);
        }
        Ok(())
    }
}

/// [`NodeLauncher`] that runs every build as a local child process.
///
/// The build is handed over through environment variables; `config` and
/// `enqueue_data` are JSON-encoded.
pub struct ProcessLauncher {
    name: &'static str,
    cfg: ExecConfig,
}

impl ProcessLauncher {
    pub fn new(cfg: ExecConfig) -> Self {
        Self { name: "proc", cfg }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    fn spawn(&self, request: &LaunchRequest) -> ExecResult<ProcessNode> {
        self.cfg.validate()?;

        let config = encode("config", &request.config)?;
        let enqueue_data = encode("enqueue_data", &request.enqueue_data)?;

        trace!(target: "starter.exec.proc", program = %self.cfg.program, args = ?self.cfg.args, "spawn");

        let mut cmd = cmd_program(&self.cfg.program, &self.cfg.args);
        if let Some(cwd) = &self.cfg.cwd {
            cmd.current_dir(cwd);
        }
        for (k, v) in &self.cfg.env {
            cmd.env(k, v);
        }
        cmd.env(ENV_BUILD_ID, request.build_id.as_str())
            .env(ENV_API_URI, &request.callback_uri)
            .env(ENV_CONFIG, config)
            .env(ENV_ENQUEUE_DATA, enqueue_data);

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| ExecError::Spawn(e.to_string()))?;
        Ok(ProcessNode::adopt(request.build_id.clone(), child))
    }
}

fn encode(field: &'static str, value: &serde_json::Value) -> ExecResult<String> {
    serde_json::to_string(value).map_err(|e| ExecError::Encode {
        field,
        reason: e.to_string(),
    })
}

#[async_trait]
impl NodeLauncher for ProcessLauncher {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn launch(&self, request: &LaunchRequest) -> Result<NodeRef, LifecycleError> {
        let node = self
            .spawn(request)
            .map_err(|e| e.into_spawn(&request.build_id))?;
        debug!(target: "starter.exec.proc", build_id = %request.build_id, pid = ?node.pid(), "node spawned");
        Ok(Arc::new(node))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use starter_core::NodeProcess;
    use starter_model::{BuildId, ExitOutcome, TerminationRequest};

    use super::*;

    fn request(id: &str) -> LaunchRequest {
        LaunchRequest {
            build_id: BuildId::new(id).unwrap(),
            config: json!({"a": 1}),
            enqueue_data: json!(["x"]),
            callback_uri: "http://api.local".into(),
        }
    }

    fn sh(script: &str) -> ProcessLauncher {
        ProcessLauncher::new(ExecConfig::new("sh").with_args(["-c", script]))
    }

    #[tokio::test]
    async fn passes_build_through_environment() {
        let script = r#"test "$NODE_BUILD_ID" = b1 \
            && test "$NODE_API_URI" = http://api.local \
            && test "$NODE_CONFIG" = '{"a":1}' \
            && test "$NODE_ENQUEUE_DATA" = '["x"]' \
            && test "$EXTRA" = yes"#;
        let launcher = ProcessLauncher::new(
            ExecConfig::new("sh")
                .with_args(["-c", script])
                .with_env("EXTRA", "yes"),
        );

        let node = launcher.launch(&request("b1")).await.unwrap();
        assert_eq!(node.build_id().as_str(), "b1");
        assert_eq!(node.wait().await, ExitOutcome::Success);
        assert!(!node.is_alive());
    }

    #[tokio::test]
    async fn reports_exit_code() {
        let node = sh("exit 3").launch(&request("b1")).await.unwrap();
        assert_eq!(node.wait().await, ExitOutcome::Failed { code: 3 });
    }

    #[tokio::test]
    async fn terminate_sends_sigterm() {
        let launcher = ProcessLauncher::new(ExecConfig::new("sleep").with_args(["30"]));
        let node = launcher.launch(&request("b1")).await.unwrap();
        assert!(node.is_alive());

        let stop = TerminationRequest::new(BuildId::new("b1").unwrap(), Some("alice".into()));
        node.terminate(&stop).await.unwrap();

        assert_eq!(
            node.wait().await,
            ExitOutcome::Signaled {
                signal: libc::SIGTERM
            }
        );
    }

    #[tokio::test]
    async fn terminate_reaches_a_node_being_waited_on() {
        let launcher = ProcessLauncher::new(ExecConfig::new("sleep").with_args(["30"]));
        let node = launcher.launch(&request("b1")).await.unwrap();

        let waiter = tokio::spawn({
            let node = node.clone();
            async move { node.wait().await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        let stop = TerminationRequest::new(BuildId::new("b1").unwrap(), None);
        tokio::time::timeout(Duration::from_secs(5), node.terminate(&stop))
            .await
            .expect("terminate blocked behind wait")
            .unwrap();

        assert_eq!(
            waiter.await.unwrap(),
            ExitOutcome::Signaled {
                signal: libc::SIGTERM
            }
        );
        assert!(!node.is_alive());
        node.force_terminate().await.unwrap();
    }

    #[tokio::test]
    async fn force_terminate_sends_sigkill() {
        // SIGTERM is ignored; only SIGKILL ends it.
        let node = sh("trap '' TERM; while :; do sleep 1; done")
            .launch(&request("b1"))
            .await
            .unwrap();
        node.force_terminate().await.unwrap();

        assert_eq!(
            node.wait().await,
            ExitOutcome::Signaled {
                signal: libc::SIGKILL
            }
        );
    }

    #[tokio::test]
    async fn signals_after_exit_are_noops() {
        let node = sh("exit 0").launch(&request("b1")).await.unwrap();
        node.wait().await;

        let stop = TerminationRequest::new(BuildId::new("b1").unwrap(), None);
        node.terminate(&stop).await.unwrap();
        node.force_terminate().await.unwrap();
        assert_eq!(node.wait().await, ExitOutcome::Success);
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_failure() {
        let launcher = ProcessLauncher::new(ExecConfig::new("/nonexistent/node-binary"));
        let err = launcher.launch(&request("b1")).await.err().unwrap();
        assert!(matches!(err, LifecycleError::SpawnFailure { .. }));
    }

    #[tokio::test]
    async fn empty_program_is_rejected() {
        let launcher = ProcessLauncher::new(ExecConfig::default());
        let err = launcher.launch(&request("b1")).await.err().unwrap();
        match err {
            LifecycleError::SpawnFailure { reason, .. } => assert_eq!(reason, "missing program"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
