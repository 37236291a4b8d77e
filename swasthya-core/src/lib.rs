//! Swasthya core - live-data synchronization for the hospital dashboard
//!
//! - `fetcher`: one request/response exchange with the remote service
//! - `derive`: raw payload -> render-ready view models
//! - `polling`: per-domain refresh cadence with clean start/stop
//! - `actions`: user-triggered one-shot fetches with busy flags
//! - `store`: composed snapshot + change notification
//! - `dashboard`: mount/unmount of all of the above

pub mod actions;
pub mod config;
pub mod dashboard;
pub mod derive;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod polling;
pub mod store;

pub use actions::{ActionDispatcher, ActionKind, ActionRequest, ActionState, Dispatch, PredictParams, SimulateParams};
pub use config::SyncConfig;
pub use dashboard::Dashboard;
pub use error::{Domain, SyncError, TransportError};
pub use fetcher::{DataFetcher, Endpoint, HttpFetcher, Params};
pub use models::{
    AgentActivity, AgentView, CrisisView, GaugePair, HospitalStatus, HospitalView, HospitalsView, PredictionView,
    RiskLevel,
};
pub use polling::{PollTaskState, PollingTask};
pub use store::{DashboardSnapshot, DashboardStateStore, Subscription};
