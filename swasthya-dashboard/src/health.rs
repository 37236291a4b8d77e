use serde::Serialize;
use std::time::{Duration, Instant};
use swasthya_core::{DashboardSnapshot, DashboardStateStore};
use tokio::task::{self, JoinHandle};
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct DashboardHealth {
    pub uptime_seconds: u64,
    pub snapshot_version: u64,
    pub agent_in_sync: bool,
    pub agent_polling: bool,
    pub hospitals_in_sync: bool,
    pub hospitals_polling: bool,
    pub hospitals_tracked: u32,
    pub predict_busy: bool,
    pub simulate_busy: bool,
}

#[derive(Clone)]
pub struct HealthTracker {
    start_time: Instant,
}

impl HealthTracker {
    pub fn new() -> Self {
        Self { start_time: Instant::now() }
    }

    pub fn get_health(&self, snap: &DashboardSnapshot) -> DashboardHealth {
        DashboardHealth {
            uptime_seconds: self.start_time.elapsed().as_secs(),
            snapshot_version: snap.version,
            agent_in_sync: snap.agent.in_sync(),
            agent_polling: snap.agent.is_running,
            hospitals_in_sync: snap.hospitals.in_sync(),
            hospitals_polling: snap.hospitals.is_running,
            hospitals_tracked: snap.hospitals.last_snapshot.as_ref().map_or(0, |list| list.len() as u32),
            predict_busy: snap.prediction.busy,
            simulate_busy: snap.crisis.busy,
        }
    }

    /// Logs a sync summary every `every`; out-of-sync domains are reported at warn.
    pub fn spawn_sync_reporter(&self, store: DashboardStateStore, every: Duration) -> JoinHandle<()> {
        let tracker = self.clone();
        task::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                let health = tracker.get_health(&store.snapshot());
                if health.agent_in_sync && health.hospitals_in_sync {
                    info!(
                        uptime = health.uptime_seconds,
                        hospitals = health.hospitals_tracked,
                        version = health.snapshot_version,
                        "dashboard in sync"
                    );
                } else {
                    warn!(
                        agent = health.agent_in_sync,
                        hospitals = health.hospitals_in_sync,
                        version = health.snapshot_version,
                        "dashboard out of sync"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use swasthya_core::{HospitalView, HospitalStatus, PollTaskState, SyncError};

    fn hospitals_state(names: &[&str]) -> PollTaskState<Vec<HospitalView>> {
        let mut state = PollTaskState::new(Duration::from_secs(10));
        state.is_running = true;
        state.last_snapshot = Some(Arc::new(
            names
                .iter()
                .map(|n| HospitalView {
                    name: n.to_string(),
                    status: HospitalStatus::parse("NORMAL"),
                    total_beds: 10,
                    available_beds: 5,
                    occupancy_percent: Some(50),
                    severity_rank: Some(0),
                })
                .collect(),
        ));
        state
    }

    #[test]
    fn test_fresh_snapshot_is_not_in_sync() {
        let health = HealthTracker::new().get_health(&DashboardSnapshot::default());
        assert!(!health.agent_in_sync);
        assert!(!health.hospitals_in_sync);
        assert_eq!(health.hospitals_tracked, 0);
        assert!(!health.predict_busy);
    }

    #[test]
    fn test_counts_hospitals_and_reports_errors() {
        let mut snap = DashboardSnapshot::default();
        snap.hospitals = hospitals_state(&["AIIMS Delhi", "Apollo"]);
        snap.agent.last_error = Some(SyncError::Transport(swasthya_core::TransportError::new("refused")));
        snap.crisis.busy = true;

        let health = HealthTracker::new().get_health(&snap);
        assert!(health.hospitals_in_sync);
        assert!(health.hospitals_polling);
        assert_eq!(health.hospitals_tracked, 2);
        assert!(!health.agent_in_sync);
        assert!(health.simulate_busy);
    }
}
