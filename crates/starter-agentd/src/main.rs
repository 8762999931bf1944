mod env;
mod feed;

use std::sync::Arc;

use starter_core::{MemoryConsumer, Orchestrator};
use starter_exec::ProcessLauncher;
use starter_model::channel;
use starter_observe::logger_init;
use starter_prometheus::PrometheusMetrics;
use tokio::io::BufReader;
use tracing::{debug, error, info, info_span};

use crate::env::AgentConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Config
    let cfg = AgentConfig::from_env()?;

    // 2) Logger
    logger_init(&cfg.logger)?;
    info!(
        format = %cfg.logger.format,
        shutdown_node_wait_minutes = cfg.starter.shutdown_node_wait_minutes,
        watchdog_limit = ?cfg.starter.watchdog_limit,
        program = %cfg.exec.program,
        "logger initialized"
    );

    // 3) Collaborators
    let metrics = Arc::new(PrometheusMetrics::new()?);
    let start = Arc::new(MemoryConsumer::new(channel::START, cfg.channel_capacity));
    let stop = Arc::new(MemoryConsumer::new(channel::STOP, cfg.channel_capacity));
    let launcher = Arc::new(ProcessLauncher::new(cfg.exec.clone()));

    // 4) Orchestrator
    let orchestrator = Orchestrator::builder(cfg.starter.clone())
        .with_consumers(start.clone(), stop.clone())
        .with_launcher(launcher)
        .with_metrics(metrics.clone())
        .with_span(info_span!("node_starter", pid = std::process::id()))
        .build()?;
    orchestrator.start_listening().await?;

    // 5) Input
    let input = tokio::spawn(feed::pump(
        BufReader::new(tokio::io::stdin()),
        start.publisher(),
        stop.publisher(),
    ));

    info!("press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;

    input.abort();
    orchestrator.stop_listening().await?;

    let running = orchestrator.registry().build_ids();
    if !running.is_empty() {
        info!(?running, "builds still running after shutdown");
    }
    match metrics.encode() {
        Ok(text) => debug!(metrics = %text, "final metrics"),
        Err(e) => error!(error = %e, "failed to encode metrics"),
    }

    Ok(())
}
