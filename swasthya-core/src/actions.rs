//! One-shot, user-triggered actions (surge prediction, crisis simulation).
//!
//! Each action kind owns a busy flag; a second invocation of a kind that is
//! still in flight is rejected without fetching. Kinds never block each
//! other. The previous result stays visible while a new one is pending.

use crate::derive::{derive_crisis, derive_prediction};
use crate::error::{Result, SyncError};
use crate::fetcher::{DataFetcher, Endpoint, Params};
use crate::models::{CrisisView, PredictionView};
use crate::polling::DeriveFn;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const KNOWN_EVENTS: [&str; 3] = ["Diwali", "Holi", "Normal"];
pub const KNOWN_CRISIS_TYPES: [&str; 3] = ["Smog Alert", "Heatwave", "Epidemic Outbreak"];
pub const MAX_POLLUTION_LEVEL: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Predict,
    Simulate,
}

impl ActionKind {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            ActionKind::Predict => Endpoint::PredictSurge,
            ActionKind::Simulate => Endpoint::SimulateCrisis,
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Predict => f.write_str("predict"),
            ActionKind::Simulate => f.write_str("simulate"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictParams {
    pub event: String,
    pub pollution_level: u32,
}

impl PredictParams {
    /// Pollution level is clamped to the slider range `0..=500`.
    pub fn new(event: impl Into<String>, pollution_level: i64) -> Self {
        Self {
            event: event.into(),
            pollution_level: pollution_level.clamp(0, MAX_POLLUTION_LEVEL as i64) as u32,
        }
    }

    pub fn to_query(&self) -> Params {
        vec![
            ("event".to_string(), self.event.clone()),
            ("pollutionLevel".to_string(), self.pollution_level.to_string()),
        ]
    }
}

impl Default for PredictParams {
    fn default() -> Self {
        Self::new("Normal", 100)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulateParams {
    pub crisis_type: String,
}

impl SimulateParams {
    pub fn new(crisis_type: impl Into<String>) -> Self {
        Self { crisis_type: crisis_type.into() }
    }

    pub fn to_query(&self) -> Params {
        vec![("type".to_string(), self.crisis_type.clone())]
    }
}

impl Default for SimulateParams {
    fn default() -> Self {
        Self::new("Smog Alert")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    Predict(PredictParams),
    Simulate(SimulateParams),
}

impl ActionRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::Predict(_) => ActionKind::Predict,
            ActionRequest::Simulate(_) => ActionKind::Simulate,
        }
    }
}

/// Busy flag plus latest outcome of one action kind.
#[derive(Debug, Clone)]
pub struct ActionState<T> {
    pub busy: bool,
    pub result: Option<Arc<T>>,
    pub error: Option<SyncError>,
    pub resolved_at: Option<OffsetDateTime>,
}

impl<T> Default for ActionState<T> {
    fn default() -> Self {
        Self { busy: false, result: None, error: None, resolved_at: None }
    }
}

pub type ActionPublisher<T> = Arc<dyn Fn(&ActionState<T>) + Send + Sync>;

/// Outcome of `invoke`.
#[derive(Debug)]
pub enum Dispatch {
    Started(JoinHandle<()>),
    Busy,
    /// The dispatcher was closed (dashboard stopped or unmounted).
    Closed,
}

impl Dispatch {
    pub fn is_started(&self) -> bool {
        matches!(self, Dispatch::Started(_))
    }

    /// Waits for a started action to resolve; no-op otherwise.
    pub async fn finished(self) {
        if let Dispatch::Started(handle) = self {
            if let Err(e) = handle.await {
                warn!(error = %e, "action task aborted");
            }
        }
    }
}

/// Open/closed flag shared by both slots. `generation` moves on every
/// close so results of actions started before it are dropped after a reopen.
#[derive(Default)]
struct Gate {
    closed: AtomicBool,
    generation: AtomicU64,
}

impl Gate {
    /// Current generation, or `None` when closed.
    fn admit(&self) -> Option<u64> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }
        Some(self.generation.load(Ordering::SeqCst))
    }

    fn accepts(&self, generation: u64) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }
}

struct ActionSlot<T> {
    kind: ActionKind,
    derive: DeriveFn<T>,
    publish: ActionPublisher<T>,
    state: Arc<Mutex<ActionState<T>>>,
    gate: Arc<Gate>,
}

impl<T> Clone for ActionSlot<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            derive: self.derive,
            publish: self.publish.clone(),
            state: self.state.clone(),
            gate: self.gate.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> ActionSlot<T> {
    fn new(kind: ActionKind, derive: DeriveFn<T>, publish: ActionPublisher<T>, gate: Arc<Gate>) -> Self {
        Self {
            kind,
            derive,
            publish,
            state: Arc::new(Mutex::new(ActionState::default())),
            gate,
        }
    }

    fn try_begin(&self) -> bool {
        let mut state = self.state.lock();
        if state.busy {
            return false;
        }
        state.busy = true;
        (self.publish)(&state);
        true
    }

    fn finish(&self, generation: u64, outcome: Result<T>) {
        let mut state = self.state.lock();
        state.busy = false;
        if !self.gate.accepts(generation) {
            // busy still clears; the late outcome is dropped
            debug!(action = %self.kind, "dispatcher closed since dispatch, dropping action result");
            (self.publish)(&state);
            return;
        }

        match outcome {
            Ok(view) => {
                state.result = Some(Arc::new(view));
                state.error = None;
                info!(action = %self.kind, "action resolved");
            }
            Err(err) => {
                warn!(action = %self.kind, error = %err, "action failed");
                state.error = Some(err);
            }
        }
        state.resolved_at = Some(OffsetDateTime::now_utc());
        (self.publish)(&state);
    }

    fn dispatch(&self, fetcher: &Arc<dyn DataFetcher>, params: Params) -> Dispatch {
        let Some(generation) = self.gate.admit() else {
            debug!(action = %self.kind, "invocation rejected, dispatcher closed");
            return Dispatch::Closed;
        };
        if !self.try_begin() {
            debug!(action = %self.kind, "invocation rejected, already in flight");
            return Dispatch::Busy;
        }

        let slot = self.clone();
        let fetcher = fetcher.clone();
        Dispatch::Started(tokio::spawn(async move {
            let outcome = match fetcher.fetch(slot.kind.endpoint(), &params).await {
                Ok(raw) => (slot.derive)(&raw),
                Err(e) => Err(e.into()),
            };
            slot.finish(generation, outcome);
        }))
    }

    fn snapshot(&self) -> ActionState<T> {
        let state = self.state.lock();
        ActionState {
            busy: state.busy,
            result: state.result.clone(),
            error: state.error.clone(),
            resolved_at: state.resolved_at,
        }
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        let busy = state.busy;
        *state = ActionState { busy, ..ActionState::default() };
        (self.publish)(&state);
    }
}

pub struct ActionDispatcher {
    fetcher: Arc<dyn DataFetcher>,
    predict: ActionSlot<PredictionView>,
    simulate: ActionSlot<CrisisView>,
    gate: Arc<Gate>,
}

impl ActionDispatcher {
    pub fn new(
        fetcher: Arc<dyn DataFetcher>,
        on_predict: ActionPublisher<PredictionView>,
        on_simulate: ActionPublisher<CrisisView>,
    ) -> Self {
        let gate = Arc::new(Gate::default());
        Self {
            fetcher,
            predict: ActionSlot::new(ActionKind::Predict, derive_prediction, on_predict, gate.clone()),
            simulate: ActionSlot::new(ActionKind::Simulate, derive_crisis, on_simulate, gate.clone()),
            gate,
        }
    }

    /// Starts the action in the background unless the same kind is in flight
    /// or the dispatcher is closed.
    /// Must be called from within a Tokio runtime.
    pub fn invoke(&self, request: ActionRequest) -> Dispatch {
        match request {
            ActionRequest::Predict(params) => self.predict.dispatch(&self.fetcher, params.to_query()),
            ActionRequest::Simulate(params) => self.simulate.dispatch(&self.fetcher, params.to_query()),
        }
    }

    pub fn predict(&self, params: PredictParams) -> Dispatch {
        self.invoke(ActionRequest::Predict(params))
    }

    pub fn simulate(&self, params: SimulateParams) -> Dispatch {
        self.invoke(ActionRequest::Simulate(params))
    }

    pub fn is_busy(&self, kind: ActionKind) -> bool {
        match kind {
            ActionKind::Predict => self.predict.state.lock().busy,
            ActionKind::Simulate => self.simulate.state.lock().busy,
        }
    }

    pub fn prediction(&self) -> ActionState<PredictionView> {
        self.predict.snapshot()
    }

    pub fn crisis(&self) -> ActionState<CrisisView> {
        self.simulate.snapshot()
    }

    /// Forgets stored results and errors; in-flight actions keep running.
    pub fn reset(&self) {
        self.predict.clear();
        self.simulate.clear();
    }

    /// Rejects new invocations and drops the results of in-flight ones.
    /// Their busy flags still clear when they resolve.
    pub fn close(&self) {
        self.gate.generation.fetch_add(1, Ordering::SeqCst);
        self.gate.closed.store(true, Ordering::SeqCst);
    }

    /// Accepts invocations again after `close`. Actions started before the
    /// close stay dropped.
    pub fn reopen(&self) {
        self.gate.closed.store(false, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.gate.closed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_params_query() {
        let params = PredictParams::new("Diwali", 450);
        assert_eq!(
            params.to_query(),
            vec![
                ("event".to_string(), "Diwali".to_string()),
                ("pollutionLevel".to_string(), "450".to_string()),
            ]
        );
        assert_eq!(PredictParams::new("Holi", 9000).pollution_level, 500);
        assert_eq!(PredictParams::new("Holi", -3).pollution_level, 0);
    }

    #[test]
    fn test_defaults_match_control_panel() {
        assert_eq!(PredictParams::default(), PredictParams::new("Normal", 100));
        assert_eq!(SimulateParams::default().crisis_type, "Smog Alert");
        assert!(KNOWN_EVENTS.contains(&PredictParams::default().event.as_str()));
        assert!(KNOWN_CRISIS_TYPES.contains(&SimulateParams::default().crisis_type.as_str()));
        assert_eq!(
            ActionRequest::Simulate(SimulateParams::default()).kind().endpoint(),
            Endpoint::SimulateCrisis
        );
    }
}
