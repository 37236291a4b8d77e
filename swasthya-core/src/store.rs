/**
 * DASHBOARD STATE STORE - Composed snapshot for presentation
 *
 * ROLE: holds the latest state of every domain (two polled, two one-shot)
 * and notifies subscribers on each change. No I/O, no derivation.
 *
 * ARCHITECTURE: the snapshot lives behind `Arc` in a tokio `watch` channel;
 * every update clones-on-write and bumps `version`, so readers only ever
 * hold a complete snapshot. Slow subscribers see the latest value only.
 */

use crate::actions::{ActionPublisher, ActionState};
use crate::models::{AgentView, CrisisView, HospitalsView, PredictionView};
use crate::polling::{PollTaskState, Publisher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct DashboardSnapshot {
    pub version: u64,
    pub agent: PollTaskState<AgentView>,
    pub hospitals: PollTaskState<HospitalsView>,
    pub prediction: ActionState<PredictionView>,
    pub crisis: ActionState<CrisisView>,
}

impl Default for DashboardSnapshot {
    fn default() -> Self {
        Self {
            version: 0,
            agent: PollTaskState::new(Duration::ZERO),
            hospitals: PollTaskState::new(Duration::ZERO),
            prediction: ActionState::default(),
            crisis: ActionState::default(),
        }
    }
}

#[derive(Clone)]
pub struct DashboardStateStore {
    tx: Arc<watch::Sender<Arc<DashboardSnapshot>>>,
}

impl DashboardStateStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(DashboardSnapshot::default()));
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> Arc<DashboardSnapshot> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardSnapshot>> {
        self.tx.subscribe()
    }

    /// Calls `callback` after changes until the returned handle is dropped.
    /// Bursts of updates may be coalesced into one call with the newest snapshot.
    pub fn on_snapshot_changed<F>(&self, mut callback: F) -> Subscription
    where
        F: FnMut(&DashboardSnapshot) + Send + 'static,
    {
        let mut rx = self.subscribe();
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let snapshot = rx.borrow_and_update().clone();
                callback(&snapshot);
            }
        });
        Subscription { task }
    }

    pub fn update_agent(&self, state: &PollTaskState<AgentView>) {
        self.apply(|snap| snap.agent = state.clone());
    }

    pub fn update_hospitals(&self, state: &PollTaskState<HospitalsView>) {
        self.apply(|snap| snap.hospitals = state.clone());
    }

    pub fn update_prediction(&self, state: &ActionState<PredictionView>) {
        self.apply(|snap| snap.prediction = state.clone());
    }

    pub fn update_crisis(&self, state: &ActionState<CrisisView>) {
        self.apply(|snap| snap.crisis = state.clone());
    }

    pub fn agent_publisher(&self) -> Publisher<AgentView> {
        let store = self.clone();
        Arc::new(move |state: &PollTaskState<AgentView>| store.update_agent(state))
    }

    pub fn hospitals_publisher(&self) -> Publisher<HospitalsView> {
        let store = self.clone();
        Arc::new(move |state: &PollTaskState<HospitalsView>| store.update_hospitals(state))
    }

    pub fn prediction_publisher(&self) -> ActionPublisher<PredictionView> {
        let store = self.clone();
        Arc::new(move |state: &ActionState<PredictionView>| store.update_prediction(state))
    }

    pub fn crisis_publisher(&self) -> ActionPublisher<CrisisView> {
        let store = self.clone();
        Arc::new(move |state: &ActionState<CrisisView>| store.update_crisis(state))
    }

    fn apply(&self, update: impl FnOnce(&mut DashboardSnapshot)) {
        self.tx.send_modify(|current| {
            let snap = Arc::make_mut(current);
            update(snap);
            snap.version += 1;
        });
    }
}

impl Default for DashboardStateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Change subscription; dropping it stops the callbacks.
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn cancel(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AgentActivity;
    use parking_lot::Mutex;

    fn agent_state(label: &str) -> PollTaskState<AgentView> {
        let mut state = PollTaskState::new(Duration::from_secs(5));
        state.is_running = true;
        state.last_snapshot = Some(Arc::new(AgentView {
            status: AgentActivity::Active,
            predictive_agent: label.to_string(),
            operations_agent: String::new(),
            coordination_agent: String::new(),
        }));
        state
    }

    #[test]
    fn test_updates_bump_version_and_keep_old_snapshots_intact() {
        let store = DashboardStateStore::new();
        let before = store.snapshot();
        assert_eq!(before.version, 0);

        store.update_agent(&agent_state("first"));
        let after = store.snapshot();
        assert_eq!(after.version, 1);
        assert!(after.agent.in_sync());
        assert!(before.agent.last_snapshot.is_none());

        store.update_agent(&agent_state("second"));
        assert_eq!(after.agent.last_snapshot.as_ref().unwrap().predictive_agent, "first");
        assert_eq!(store.snapshot().version, 2);
    }

    #[tokio::test]
    async fn test_on_snapshot_changed_until_dropped() {
        let store = DashboardStateStore::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = store.on_snapshot_changed(move |snap| sink.lock().push(snap.version));

        store.update_agent(&agent_state("a"));
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(*seen.lock(), vec![1]);

        drop(sub);
        tokio::task::yield_now().await;
        store.update_agent(&agent_state("b"));
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(*seen.lock(), vec![1]);
    }
}
