//! Mount/unmount lifecycle of the whole synchronization core.
//!
//! `Dashboard::mount` wires both polling tasks and the action dispatcher
//! into one store and starts polling; `stop`, `unmount` or drop cancels
//! every timer and discards results that arrive afterwards.

use crate::actions::{ActionDispatcher, Dispatch, PredictParams, SimulateParams};
use crate::config::SyncConfig;
use crate::fetcher::DataFetcher;
use crate::models::{AgentView, HospitalsView};
use crate::polling::PollingTask;
use crate::store::{DashboardSnapshot, DashboardStateStore, Subscription};
use std::sync::Arc;
use tracing::info;

pub struct Dashboard {
    config: SyncConfig,
    store: DashboardStateStore,
    agent: PollingTask<AgentView>,
    hospitals: PollingTask<HospitalsView>,
    actions: ActionDispatcher,
}

impl Dashboard {
    /// Builds the core without starting any timer.
    pub fn new(config: SyncConfig, fetcher: Arc<dyn DataFetcher>) -> Self {
        let store = DashboardStateStore::new();
        let agent = PollingTask::agent(fetcher.clone(), store.agent_publisher());
        let hospitals = PollingTask::hospitals(fetcher.clone(), store.hospitals_publisher());
        let actions = ActionDispatcher::new(fetcher, store.prediction_publisher(), store.crisis_publisher());

        Self { config, store, agent, hospitals, actions }
    }

    /// Builds and starts polling. Must be called from within a Tokio runtime.
    pub fn mount(config: SyncConfig, fetcher: Arc<dyn DataFetcher>) -> Self {
        let dashboard = Self::new(config, fetcher);
        dashboard.start();
        dashboard
    }

    /// Starts both polling tasks and reopens the action dispatcher.
    pub fn start(&self) {
        self.actions.reopen();
        self.agent.start(self.config.agent_period());
        self.hospitals.start(self.config.hospital_period());
        info!(api_base = %self.config.api_base, "dashboard mounted");
    }

    /// Stops both polling tasks and closes the action dispatcher.
    pub fn stop(&self) {
        let agent = self.agent.stop();
        let hospitals = self.hospitals.stop();
        self.actions.close();
        if agent || hospitals {
            info!("dashboard stopped");
        }
    }

    pub fn unmount(self) {
        self.stop();
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &DashboardStateStore {
        &self.store
    }

    pub fn snapshot(&self) -> Arc<DashboardSnapshot> {
        self.store.snapshot()
    }

    pub fn on_snapshot_changed<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&DashboardSnapshot) + Send + 'static,
    {
        self.store.on_snapshot_changed(callback)
    }

    pub fn agent_task(&self) -> &PollingTask<AgentView> {
        &self.agent
    }

    pub fn hospitals_task(&self) -> &PollingTask<HospitalsView> {
        &self.hospitals
    }

    pub fn actions(&self) -> &ActionDispatcher {
        &self.actions
    }

    pub fn predict(&self, params: PredictParams) -> Dispatch {
        self.actions.predict(params)
    }

    pub fn simulate(&self, params: SimulateParams) -> Dispatch {
        self.actions.simulate(params)
    }

    /// Clears prediction and simulation outcomes.
    pub fn reset_results(&self) {
        self.actions.reset();
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.stop();
    }
}
