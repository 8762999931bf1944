use std::{sync::Arc, time::Duration};

use starter_model::BuildId;
use tokio::{sync::Semaphore, task::JoinHandle};
use tracing::{Instrument, Span, debug, error, info_span, warn};

use crate::{metrics::MetricsHandle, node::NodeRef, registry::BuildRegistry};

/// What a fired watchdog found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogVerdict {
    /// The build was gone (or dead) by the deadline; nothing to do.
    Exited,
    /// The stopped instance is gone and the id now belongs to a newer launch.
    Superseded,
    /// The build was still alive and got force-killed.
    ForceTerminated,
    /// The build was still alive and the kill failed.
    KillFailed,
}

/// Delayed forced-termination check armed by every processed stop command.
///
/// Fires exactly once per arm, never before `delay` has elapsed. Not persisted.
#[derive(Clone)]
pub struct Watchdog {
    registry: BuildRegistry,
    delay: Duration,
    limit: Option<Arc<Semaphore>>,
    metrics: MetricsHandle,
    span: Span,
}

impl Watchdog {
    pub fn new(
        registry: BuildRegistry,
        delay: Duration,
        limit: Option<usize>,
        metrics: MetricsHandle,
        parent: &Span,
    ) -> Self {
        Self {
            registry,
            delay,
            limit: limit.map(|n| Arc::new(Semaphore::new(n))),
            metrics,
            span: info_span!(parent: parent, "watchdog"),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule the check for `build_id` on a background task.
    ///
    /// With a `target`, only that exact instance may be killed; a later launch
    /// reusing the id is left alone. Without one, whatever runs under the id
    /// at the deadline is checked.
    pub fn arm(
        &self,
        build_id: BuildId,
        target: Option<NodeRef>,
    ) -> JoinHandle<WatchdogVerdict> {
        let this = self.clone();
        let span = info_span!(parent: &self.span, "armed", %build_id);
        tokio::spawn(async move { this.fire(build_id, target).await }.instrument(span))
    }

    async fn fire(self, build_id: BuildId, target: Option<NodeRef>) -> WatchdogVerdict {
        // Held until the check completes; bounds concurrently armed watchdogs.
        let _permit = match &self.limit {
            Some(sem) => Arc::clone(sem).acquire_owned().await.ok(),
            None => None,
        };

        debug!(
            wait_secs = self.delay.as_secs(),
            "waiting before checking whether the node is still alive"
        );
        tokio::time::sleep(self.delay).await;

        let node = match (self.registry.get(&build_id), target) {
            (Some(current), Some(target)) if !Arc::ptr_eq(&current, &target) => {
                debug!("stopped instance already exited; id reused by a newer launch");
                return WatchdogVerdict::Superseded;
            }
            (Some(node), _) if node.is_alive() => node,
            _ => {
                debug!("node already exited");
                return WatchdogVerdict::Exited;
            }
        };

        match node.force_terminate().await {
            Ok(()) => {
                warn!("node outlived its stop grace period; force-killed");
                self.metrics.record_watchdog_kill();
                WatchdogVerdict::ForceTerminated
            }
            Err(e) => {
                error!(error = %e, "force kill failed");
                WatchdogVerdict::KillFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metrics::noop_metrics, testing::MockNode};

    const DELAY: Duration = Duration::from_secs(60);

    fn id(s: &str) -> BuildId {
        BuildId::new(s).unwrap()
    }

    fn watchdog(registry: &BuildRegistry, limit: Option<usize>) -> Watchdog {
        Watchdog::new(registry.clone(), DELAY, limit, noop_metrics(), &Span::none())
    }

    #[tokio::test(start_paused = true)]
    async fn kills_node_still_alive_after_delay() {
        let registry = BuildRegistry::new();
        let node = MockNode::arc("b1");
        registry.register(id("b1"), node.clone()).unwrap();

        let verdict = watchdog(&registry, None).arm(id("b1"), None).await.unwrap();

        assert_eq!(verdict, WatchdogVerdict::ForceTerminated);
        assert_eq!(node.force_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_fire_early() {
        let registry = BuildRegistry::new();
        let node = MockNode::arc("b1");
        registry.register(id("b1"), node.clone()).unwrap();

        let handle = watchdog(&registry, None).arm(id("b1"), None);

        tokio::time::sleep(DELAY - Duration::from_secs(1)).await;
        assert_eq!(node.force_count(), 0);
        assert!(!handle.is_finished());

        assert_eq!(handle.await.unwrap(), WatchdogVerdict::ForceTerminated);
        assert_eq!(node.force_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn skips_unregistered_build() {
        let registry = BuildRegistry::new();
        let verdict = watchdog(&registry, None).arm(id("ghost"), None).await.unwrap();
        assert_eq!(verdict, WatchdogVerdict::Exited);
    }

    #[tokio::test(start_paused = true)]
    async fn skips_build_that_exited_before_deadline() {
        let registry = BuildRegistry::new();
        let node = MockNode::arc("b1");
        registry.register(id("b1"), node.clone()).unwrap();

        let handle = watchdog(&registry, None).arm(id("b1"), None);
        node.exit();
        registry.unregister(&id("b1"));

        assert_eq!(handle.await.unwrap(), WatchdogVerdict::Exited);
        assert_eq!(node.force_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dead_but_still_registered_is_not_killed() {
        let registry = BuildRegistry::new();
        let node = MockNode::arc("b1");
        registry.register(id("b1"), node.clone()).unwrap();
        node.exit();

        let verdict = watchdog(&registry, None).arm(id("b1"), None).await.unwrap();
        assert_eq!(verdict, WatchdogVerdict::Exited);
        assert_eq!(node.force_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn kill_failure_is_reported() {
        let registry = BuildRegistry::new();
        let node = MockNode::builder("b1").failing_force().build();
        registry.register(id("b1"), node.clone()).unwrap();

        let verdict = watchdog(&registry, None).arm(id("b1"), None).await.unwrap();
        assert_eq!(verdict, WatchdogVerdict::KillFailed);
    }

    #[tokio::test(start_paused = true)]
    async fn limit_delays_but_never_drops_watchdogs() {
        let registry = BuildRegistry::new();
        let a = MockNode::arc("a");
        let b = MockNode::arc("b");
        registry.register(id("a"), a.clone()).unwrap();
        registry.register(id("b"), b.clone()).unwrap();

        let wd = watchdog(&registry, Some(1));
        let start = tokio::time::Instant::now();
        let ha = wd.arm(id("a"), None);
        let hb = wd.arm(id("b"), None);

        assert_eq!(ha.await.unwrap(), WatchdogVerdict::ForceTerminated);
        assert_eq!(hb.await.unwrap(), WatchdogVerdict::ForceTerminated);
        assert!(start.elapsed() >= DELAY * 2);
        assert_eq!(a.force_count() + b.force_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn targeted_watchdog_kills_its_instance() {
        let registry = BuildRegistry::new();
        let node = MockNode::arc("b1");
        registry.register(id("b1"), node.clone()).unwrap();

        let verdict = watchdog(&registry, None)
            .arm(id("b1"), Some(node.clone() as NodeRef))
            .await
            .unwrap();
        assert_eq!(verdict, WatchdogVerdict::ForceTerminated);
        assert_eq!(node.force_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn targeted_watchdog_spares_a_relaunch_under_the_same_id() {
        let registry = BuildRegistry::new();
        let first = MockNode::arc("b1");
        registry.register(id("b1"), first.clone()).unwrap();

        let handle = watchdog(&registry, None).arm(id("b1"), Some(first.clone() as NodeRef));
        first.exit();
        registry.unregister(&id("b1"));
        let second = MockNode::arc("b1");
        registry.register(id("b1"), second.clone()).unwrap();

        assert_eq!(handle.await.unwrap(), WatchdogVerdict::Superseded);
        assert_eq!(first.force_count(), 0);
        assert_eq!(second.force_count(), 0);
    }
}
