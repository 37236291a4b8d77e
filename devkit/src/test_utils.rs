/*!
Test harness for the dashboard core

Sets up a `Dashboard` over a `MockFetcher` preloaded with healthy
payloads, and offers waiting helpers on the composed snapshot.
*/

use crate::fixtures::PayloadBuilder;
use crate::mock_fetcher::MockFetcher;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use swasthya_core::{Dashboard, DashboardSnapshot, Endpoint, SyncConfig};
use tokio::time::timeout;

pub const DEFAULT_WAIT: Duration = Duration::from_secs(60);

/// Installs a test-writer tracing subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("swasthya=debug")),
        )
        .with_test_writer()
        .try_init();
}

pub struct TestHarness {
    pub fetcher: MockFetcher,
    pub config: SyncConfig,
}

impl TestHarness {
    /// Mock answers: active agents and the service's default hospital list.
    pub fn new() -> Self {
        init_tracing();

        let fetcher = MockFetcher::new();
        fetcher
            .respond(Endpoint::AgentStatus, PayloadBuilder::agent_status("ACTIVE"))
            .respond(Endpoint::Hospitals, PayloadBuilder::hospitals());

        Self { fetcher, config: SyncConfig::default() }
    }

    /// Mock with no scripted replies at all.
    pub fn empty() -> Self {
        init_tracing();
        Self { fetcher: MockFetcher::new(), config: SyncConfig::default() }
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the dashboard without starting its timers.
    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new(self.config.clone(), Arc::new(self.fetcher.clone()))
    }

    pub fn mount(&self) -> Dashboard {
        Dashboard::mount(self.config.clone(), Arc::new(self.fetcher.clone()))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits until `predicate` holds for the dashboard's snapshot.
pub async fn wait_for<F>(dashboard: &Dashboard, predicate: F) -> Result<Arc<DashboardSnapshot>>
where
    F: Fn(&DashboardSnapshot) -> bool,
{
    wait_for_within(dashboard, DEFAULT_WAIT, predicate).await
}

pub async fn wait_for_within<F>(
    dashboard: &Dashboard,
    limit: Duration,
    predicate: F,
) -> Result<Arc<DashboardSnapshot>>
where
    F: Fn(&DashboardSnapshot) -> bool,
{
    let mut rx = dashboard.store().subscribe();
    let waited = timeout(limit, async {
        loop {
            let current = rx.borrow_and_update().clone();
            if predicate(&current) {
                return Ok(current);
            }
            if rx.changed().await.is_err() {
                anyhow::bail!("store closed while waiting");
            }
        }
    })
    .await;

    match waited {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!("timeout waiting for snapshot after {limit:?}");
            anyhow::bail!("snapshot condition not met within {limit:?}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_harness_mounts_and_syncs() {
        let harness = TestHarness::new();
        let dashboard = harness.mount();

        let snap = wait_for(&dashboard, |s| s.agent.in_sync() && s.hospitals.in_sync())
            .await
            .unwrap();
        assert_eq!(snap.hospitals.last_snapshot.as_ref().unwrap().len(), 3);
        assert_eq!(harness.fetcher.calls(Endpoint::AgentStatus), 1);
        assert_eq!(harness.fetcher.calls(Endpoint::Hospitals), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_times_out() {
        let harness = TestHarness::empty();
        let dashboard = harness.dashboard();
        let res = wait_for_within(&dashboard, Duration::from_secs(1), |s| s.agent.in_sync()).await;
        assert!(res.is_err());
    }
}
