use anyhow::{Context, bail};
use starter_core::StarterConfig;
use starter_exec::ExecConfig;
use starter_observe::{LoggerConfig, LoggerFormat};

pub const SHUTDOWN_NODE_WAIT_MINUTES: &str = "STARTER_SHUTDOWN_NODE_WAIT_MINUTES";
pub const WATCHDOG_LIMIT: &str = "STARTER_WATCHDOG_LIMIT";
pub const NODE_PROGRAM: &str = "STARTER_NODE_PROGRAM";
pub const NODE_ARGS: &str = "STARTER_NODE_ARGS";
pub const NODE_CWD: &str = "STARTER_NODE_CWD";
pub const CHANNEL_CAPACITY: &str = "STARTER_CHANNEL_CAPACITY";
pub const LOG_LEVEL: &str = "STARTER_LOG_LEVEL";
pub const LOG_FORMAT: &str = "STARTER_LOG_FORMAT";

const DEFAULT_CAPACITY: usize = 64;

/// Everything the agent reads from its environment, read once at start.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub starter: StarterConfig,
    pub exec: ExecConfig,
    pub logger: LoggerConfig,
    pub channel_capacity: usize,
}

impl AgentConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let mut starter = StarterConfig::default();
        if let Some(v) = get(SHUTDOWN_NODE_WAIT_MINUTES) {
            starter = starter.with_shutdown_wait_minutes(parse(SHUTDOWN_NODE_WAIT_MINUTES, &v)?);
        }
        if let Some(v) = get(WATCHDOG_LIMIT) {
            starter = starter.with_watchdog_limit(parse(WATCHDOG_LIMIT, &v)?);
        }
        starter.validate()?;

        let Some(program) = get(NODE_PROGRAM) else {
            bail!("{NODE_PROGRAM} must be set");
        };
        let mut exec = ExecConfig::new(program);
        if let Some(args) = get(NODE_ARGS) {
            exec = exec.with_args(args.split_whitespace());
        }
        if let Some(cwd) = get(NODE_CWD) {
            exec = exec.with_cwd(cwd);
        }

        let mut logger = LoggerConfig::default();
        if let Some(level) = get(LOG_LEVEL) {
            logger = logger.with_level(level);
        }
        if let Some(format) = get(LOG_FORMAT) {
            logger = logger.with_format(format.parse()?);
        }
        if logger.format == LoggerFormat::Json {
            logger.use_color = false;
        }
        logger.validate()?;

        let channel_capacity = match get(CHANNEL_CAPACITY) {
            Some(v) => parse(CHANNEL_CAPACITY, &v)?,
            None => DEFAULT_CAPACITY,
        };
        if channel_capacity == 0 {
            bail!("{CHANNEL_CAPACITY} must be greater than zero");
        }

        Ok(Self {
            starter,
            exec,
            logger,
            channel_capacity,
        })
    }
}

fn parse<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid {key}: {value:?}"))
}
