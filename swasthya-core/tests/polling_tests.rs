use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use swasthya_core::{DashboardStateStore, Endpoint, PollingTask, SyncError};
use swasthya_devkit::{test_utils::init_tracing, MockFetcher, PayloadBuilder};
use tokio::time::sleep;

const PERIOD: Duration = Duration::from_secs(5);

fn agent_task(fetcher: &MockFetcher, store: &DashboardStateStore) -> PollingTask<swasthya_core::AgentView> {
    init_tracing();
    PollingTask::agent(Arc::new(fetcher.clone()), store.agent_publisher())
}

fn agent_payload(label: &str) -> serde_json::Value {
    PayloadBuilder::agent_status_with("ACTIVE", label, "ops", "coord")
}

#[tokio::test(start_paused = true)]
async fn test_double_start_issues_one_fetch() {
    let fetcher = MockFetcher::new();
    fetcher.respond(Endpoint::AgentStatus, agent_payload("tick"));
    let store = DashboardStateStore::new();
    let task = agent_task(&fetcher, &store);

    assert!(task.start(PERIOD));
    assert!(!task.start(PERIOD));
    sleep(Duration::from_millis(10)).await;

    assert_eq!(fetcher.calls(Endpoint::AgentStatus), 1);
    assert!(store.snapshot().agent.in_sync());
}

#[tokio::test(start_paused = true)]
async fn test_stopped_task_ignores_late_result() {
    let fetcher = MockFetcher::new();
    let gate = fetcher.hold(Endpoint::AgentStatus);
    let store = DashboardStateStore::new();
    let task = agent_task(&fetcher, &store);

    task.start(PERIOD);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(fetcher.in_flight(Endpoint::AgentStatus), 1);

    assert!(task.stop());
    let version_after_stop = store.snapshot().version;

    gate.release_ok(agent_payload("too late"));
    sleep(Duration::from_secs(60)).await;

    let snap = store.snapshot();
    assert_eq!(snap.version, version_after_stop);
    assert!(snap.agent.last_snapshot.is_none());
    assert!(!snap.agent.is_running);
    assert!(task.state().last_snapshot.is_none());
    // no further ticks after stop
    assert_eq!(fetcher.calls(Endpoint::AgentStatus), 1);
    assert_eq!(fetcher.in_flight(Endpoint::AgentStatus), 0);
}

#[tokio::test(start_paused = true)]
async fn test_busy_cycle_drops_missed_ticks() {
    let fetcher = MockFetcher::new();
    let gate = fetcher.hold(Endpoint::AgentStatus);
    fetcher.respond(Endpoint::AgentStatus, agent_payload("next"));
    let store = DashboardStateStore::new();
    let task = agent_task(&fetcher, &store);

    task.start(PERIOD);
    // three periods elapse while the first fetch hangs
    sleep(Duration::from_secs(16)).await;
    assert_eq!(fetcher.calls(Endpoint::AgentStatus), 1);

    gate.release_ok(agent_payload("slow"));
    sleep(Duration::from_secs(1)).await;
    assert_eq!(fetcher.calls(Endpoint::AgentStatus), 1);
    assert_eq!(task.state().last_snapshot.unwrap().predictive_agent, "slow");

    sleep(Duration::from_secs(5)).await;
    assert_eq!(fetcher.calls(Endpoint::AgentStatus), 2);
    assert_eq!(fetcher.max_in_flight(Endpoint::AgentStatus), 1);
    assert_eq!(task.state().last_snapshot.unwrap().predictive_agent, "next");
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_keeps_stale_snapshot() {
    let fetcher = MockFetcher::new();
    fetcher
        .enqueue_ok(Endpoint::AgentStatus, agent_payload("tick 1"))
        .enqueue_ok(Endpoint::AgentStatus, agent_payload("tick 2"))
        .enqueue_err(Endpoint::AgentStatus, "connection reset")
        .enqueue_ok(Endpoint::AgentStatus, agent_payload("tick 4"));
    let store = DashboardStateStore::new();
    let task = agent_task(&fetcher, &store);

    task.start(PERIOD);
    sleep(Duration::from_millis(10)).await;
    sleep(PERIOD).await;
    assert_eq!(task.state().last_snapshot.unwrap().predictive_agent, "tick 2");

    sleep(PERIOD).await;
    let state = store.snapshot().agent.clone();
    assert_eq!(fetcher.calls(Endpoint::AgentStatus), 3);
    assert_eq!(state.last_snapshot.as_ref().unwrap().predictive_agent, "tick 2");
    assert!(matches!(state.last_error, Some(SyncError::Transport(_))));
    assert!(!state.in_sync());

    sleep(PERIOD).await;
    let state = store.snapshot().agent.clone();
    assert_eq!(state.last_snapshot.as_ref().unwrap().predictive_agent, "tick 4");
    assert!(state.last_error.is_none());
    assert!(state.in_sync());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_payload_recorded_like_transport_error() {
    let fetcher = MockFetcher::new();
    fetcher
        .enqueue_ok(Endpoint::Hospitals, PayloadBuilder::hospitals())
        .enqueue_ok(Endpoint::Hospitals, json!([{ "name": "No beds field", "status": "NORMAL" }]));
    init_tracing();
    let store = DashboardStateStore::new();
    let task = PollingTask::hospitals(Arc::new(fetcher.clone()), store.hospitals_publisher());

    task.start(Duration::from_secs(10));
    sleep(Duration::from_millis(10)).await;
    assert_eq!(task.state().last_snapshot.unwrap().len(), 3);

    sleep(Duration::from_secs(10)).await;
    let state = store.snapshot().hospitals.clone();
    assert_eq!(state.last_snapshot.as_ref().unwrap().len(), 3);
    assert_eq!(
        state.last_error,
        Some(SyncError::malformed(swasthya_core::Domain::Hospitals, "[0].totalBeds"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_restart_discards_previous_epoch() {
    let fetcher = MockFetcher::new();
    let old_gate = fetcher.hold(Endpoint::AgentStatus);
    fetcher.respond(Endpoint::AgentStatus, agent_payload("fresh"));
    let store = DashboardStateStore::new();
    let task = agent_task(&fetcher, &store);

    task.start(PERIOD);
    sleep(Duration::from_millis(10)).await;
    task.stop();
    task.start(PERIOD);
    sleep(Duration::from_millis(10)).await;
    assert_eq!(task.state().last_snapshot.unwrap().predictive_agent, "fresh");

    old_gate.release_ok(agent_payload("stale epoch"));
    sleep(Duration::from_millis(10)).await;
    assert_eq!(task.state().last_snapshot.unwrap().predictive_agent, "fresh");
    assert!(task.is_running());
}
