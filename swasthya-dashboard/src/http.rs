/**
 * DASHBOARD HTTP - Presentation surface of the synchronization core
 *
 * ROLE: exposes the composed snapshot to a browser or CLI and lets it
 * trigger the two one-shot actions. Reads only from the store; never
 * fetches on its own.
 *
 * ROUTES:
 * - GET  /health                 liveness
 * - GET  /system/health          uptime, per-domain sync, busy flags
 * - GET  /snapshot               full snapshot as JSON
 * - GET  /events                 SSE, one `snapshot` event per change
 * - POST /actions/predict        ?event=&pollutionLevel=  -> 202 / 409 / 503
 * - POST /actions/simulate       ?type=                   -> 202 / 409 / 503
 */

use crate::health::{DashboardHealth, HealthTracker};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{routing::{get, post}, Json, Router};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;
use swasthya_core::{
    ActionKind, ActionState, Dashboard, DashboardSnapshot, Dispatch, PollTaskState, PredictParams, SimulateParams,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    pub health_tracker: HealthTracker,
    pub shutdown: watch::Receiver<bool>,
}

#[derive(Serialize)]
struct DomainView<'a, T> {
    running: bool,
    in_sync: bool,
    loading: bool,
    interval_ms: u64,
    last_updated: Option<String>,      // RFC3339
    stale_for_seconds: Option<i64>,
    last_error: Option<String>,
    data: Option<&'a T>,
}

fn poll_view<'a, T>(state: &'a PollTaskState<T>, now: OffsetDateTime) -> DomainView<'a, T> {
    DomainView {
        running: state.is_running,
        in_sync: state.in_sync(),
        loading: state.is_loading(),
        interval_ms: state.interval.as_millis() as u64,
        last_updated: state.last_updated.map(|t| t.format(&Rfc3339).unwrap_or_default()),
        stale_for_seconds: state.last_updated.map(|t| (now - t).whole_seconds().max(0)),
        last_error: state.last_error.as_ref().map(|e| e.to_string()),
        data: state.last_snapshot.as_deref(),
    }
}

#[derive(Serialize)]
struct ActionView<'a, T> {
    busy: bool,
    resolved_at: Option<String>,
    error: Option<String>,
    result: Option<&'a T>,
}

fn action_view<T>(state: &ActionState<T>) -> ActionView<'_, T> {
    ActionView {
        busy: state.busy,
        resolved_at: state.resolved_at.map(|t| t.format(&Rfc3339).unwrap_or_default()),
        error: state.error.as_ref().map(|e| e.to_string()),
        result: state.result.as_deref(),
    }
}

fn snapshot_json(snap: &DashboardSnapshot, now: OffsetDateTime) -> Value {
    json!({
        "version": snap.version,
        "agent": poll_view(&snap.agent, now),
        "hospitals": poll_view(&snap.hospitals, now),
        "prediction": action_view(&snap.prediction),
        "crisis": action_view(&snap.crisis),
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictQuery {
    event: Option<String>,
    pollution_level: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SimulateQuery {
    #[serde(rename = "type")]
    crisis_type: Option<String>,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/snapshot", get(get_snapshot))
        .route("/events", get(stream_events))
        .route("/actions/predict", post(predict))
        .route("/actions/simulate", post(simulate))
        .with_state(app_state)
}

async fn get_system_health(State(app): State<AppState>) -> Json<DashboardHealth> {
    Json(app.health_tracker.get_health(&app.dashboard.snapshot()))
}

async fn get_snapshot(State(app): State<AppState>) -> Json<Value> {
    Json(snapshot_json(&app.dashboard.snapshot(), OffsetDateTime::now_utc()))
}

fn snapshot_event(snap: &DashboardSnapshot) -> Event {
    let body = snapshot_json(snap, OffsetDateTime::now_utc());
    Event::default()
        .event("snapshot")
        .id(snap.version.to_string())
        .json_data(&body)
        .unwrap_or_else(|e| {
            warn!("failed to encode snapshot event: {e}");
            Event::default().event("error").data("encode failed")
        })
}

// Current snapshot first, then one event per change until shutdown.
fn snapshot_stream(
    rx: watch::Receiver<Arc<DashboardSnapshot>>,
    mut shutdown: watch::Receiver<bool>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    let updates = stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let snap = rx.borrow_and_update().clone();
        Some((Ok(snapshot_event(&snap)), (rx, false)))
    });
    updates.take_until(async move {
        let _ = shutdown.wait_for(|stopping| *stopping).await;
    })
}

async fn stream_events(State(app): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("sse client connected");
    let rx = app.dashboard.store().subscribe();
    Sse::new(snapshot_stream(rx, app.shutdown.clone())).keep_alive(KeepAlive::default())
}

fn dispatch_response(kind: ActionKind, dispatch: Dispatch) -> (StatusCode, Json<Value>) {
    match dispatch {
        Dispatch::Started(_) => (
            StatusCode::ACCEPTED,
            Json(json!({ "ok": true, "action": kind.to_string() })),
        ),
        Dispatch::Busy => (
            StatusCode::CONFLICT,
            Json(json!({ "ok": false, "action": kind.to_string(), "msg": "already in flight" })),
        ),
        Dispatch::Closed => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "ok": false, "action": kind.to_string(), "msg": "dashboard stopped" })),
        ),
    }
}

async fn predict(
    State(app): State<AppState>,
    Query(q): Query<PredictQuery>,
) -> (StatusCode, Json<Value>) {
    let defaults = PredictParams::default();
    let params = PredictParams::new(
        q.event.filter(|e| !e.is_empty()).unwrap_or(defaults.event),
        q.pollution_level.unwrap_or(defaults.pollution_level as i64),
    );
    dispatch_response(ActionKind::Predict, app.dashboard.predict(params))
}

async fn simulate(
    State(app): State<AppState>,
    Query(q): Query<SimulateQuery>,
) -> (StatusCode, Json<Value>) {
    let params = match q.crisis_type.filter(|t| !t.is_empty()) {
        Some(t) => SimulateParams::new(t),
        None => SimulateParams::default(),
    };
    dispatch_response(ActionKind::Simulate, app.dashboard.simulate(params))
}
