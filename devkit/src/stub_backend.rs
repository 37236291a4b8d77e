/*!
In-process stub of the remote prediction service

Serves the four endpoints the dashboard consumes on a loopback port,
with the service's canned data and risk formula:
`score = weight(event) * (pollution / 20)`, weights diwali 8, holi 6,
normal 2, anything else 3; `HIGH` above 70, `MEDIUM` above 40.
Prefixing the base URL with `/broken` (non-JSON bodies) or `/unavailable`
(503 on every endpoint) exercises the fetcher's error paths.
*/

use crate::fixtures::PayloadBuilder;
use anyhow::{Context, Result};
use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictQuery {
    #[serde(default = "default_event")]
    event: String,
    #[serde(default = "default_pollution")]
    pollution_level: i64,
}

fn default_event() -> String {
    "diwali".into()
}

fn default_pollution() -> i64 {
    150
}

#[derive(Debug, Deserialize)]
struct SimulateQuery {
    #[serde(rename = "type")]
    crisis_type: String,
}

pub fn risk_score(event: &str, pollution_level: i64) -> i64 {
    let weight = match event.to_lowercase().as_str() {
        "diwali" => 8,
        "holi" => 6,
        "normal" => 2,
        _ => 3,
    };
    weight * (pollution_level / 20)
}

pub fn risk_level(score: i64) -> &'static str {
    if score > 70 {
        "HIGH"
    } else if score > 40 {
        "MEDIUM"
    } else {
        "LOW"
    }
}

fn recommended_action(level: &str) -> &'static str {
    match level {
        "HIGH" => "Increase staff by 40%, pre-order supplies, alert emergency teams",
        "MEDIUM" => "Increase staff by 20%, check inventory levels",
        "LOW" => "Normal operations, monitor situation",
        _ => "No action required",
    }
}

async fn predict_surge(Query(q): Query<PredictQuery>) -> Json<Value> {
    let score = risk_score(&q.event, q.pollution_level);
    let level = risk_level(score);
    Json(PayloadBuilder::prediction(level, score, score as f64, recommended_action(level)))
}

async fn simulate_crisis(Query(q): Query<SimulateQuery>) -> Json<Value> {
    Json(PayloadBuilder::crisis(&q.crisis_type))
}

async fn agent_coordination() -> Json<Value> {
    Json(PayloadBuilder::agent_status("ACTIVE"))
}

async fn hospitals() -> Json<Value> {
    Json(PayloadBuilder::hospitals())
}

pub fn router() -> Router {
    Router::new()
        .route("/api/predict-surge", get(predict_surge))
        .route("/api/simulate-crisis", get(simulate_crisis))
        .route("/api/agent-coordination", get(agent_coordination))
        .route("/api/hospitals", get(hospitals))
        .route("/broken/{*path}", get(|| async { "not json" }))
        .route(
            "/unavailable/{*path}",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": "maintenance" }))) }),
        )
        .fallback(|| async { (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))) })
}

/// Stub server bound to an ephemeral loopback port; stops on drop.
pub struct StubBackend {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl StubBackend {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(router()).await
    }

    pub async fn spawn_with(app: Router) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind stub backend")?;
        let addr = listener.local_addr()?;

        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("stub backend stopped: {e}");
            }
        });
        tracing::debug!("stub backend listening on {addr}");

        Ok(Self { addr, task })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Base URL under which every endpoint answers 503.
    pub fn unavailable_url(&self) -> String {
        format!("{}/unavailable", self.base_url())
    }

    /// Base URL under which every endpoint answers 200 with a non-JSON body.
    pub fn broken_url(&self) -> String {
        format!("{}/broken", self.base_url())
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_formula() {
        assert_eq!(risk_score("Diwali", 450), 176);
        assert_eq!(risk_score("holi", 150), 42);
        assert_eq!(risk_score("Normal", 100), 10);
        assert_eq!(risk_score("Eid", 100), 15);
        assert_eq!(risk_level(176), "HIGH");
        assert_eq!(risk_level(42), "MEDIUM");
        assert_eq!(risk_level(40), "LOW");
    }
}
