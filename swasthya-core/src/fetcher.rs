/**
 * DATA FETCHER - Single request/response exchange with the remote service
 *
 * ROLE: one call of `fetch` = at most one network request. No retry, no
 * timeout, no dedup; concurrency control belongs to the callers
 * (polling tasks and the action dispatcher).
 *
 * ARCHITECTURE: object-safe trait so tests swap in a scripted fetcher,
 * `HttpFetcher` is the reqwest implementation used in production.
 */

use crate::error::TransportError;
use futures::future::BoxFuture;
use serde_json::Value;
use tracing::debug;

/// Named endpoints of the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    AgentStatus,
    Hospitals,
    PredictSurge,
    SimulateCrisis,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::AgentStatus => "/api/agent-coordination",
            Endpoint::Hospitals => "/api/hospitals",
            Endpoint::PredictSurge => "/api/predict-surge",
            Endpoint::SimulateCrisis => "/api/simulate-crisis",
        }
    }
}

/// Query parameters, in the order they are sent.
pub type Params = Vec<(String, String)>;

pub trait DataFetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        endpoint: Endpoint,
        params: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<Value, TransportError>>;
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url_for(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    async fn get_json(&self, endpoint: Endpoint, params: &[(String, String)]) -> Result<Value, TransportError> {
        let url = self.url_for(endpoint);
        debug!(%url, ?params, "fetching");

        let response = self.client.get(&url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::new(format!("{url} answered {status}")));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| TransportError::new(format!("invalid JSON from {url}: {e}")))
    }
}

impl DataFetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        endpoint: Endpoint,
        params: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<Value, TransportError>> {
        Box::pin(self.get_json(endpoint, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_trims_trailing_slash() {
        let fetcher = HttpFetcher::new("http://localhost:8080/");
        assert_eq!(fetcher.base_url(), "http://localhost:8080");
        assert_eq!(fetcher.url_for(Endpoint::Hospitals), "http://localhost:8080/api/hospitals");
        assert_eq!(
            fetcher.url_for(Endpoint::AgentStatus),
            "http://localhost:8080/api/agent-coordination"
        );
    }

    #[tokio::test]
    async fn test_refused_connection_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = HttpFetcher::new(format!("http://{addr}"));
        let err = fetcher.fetch(Endpoint::Hospitals, &[]).await.unwrap_err();
        assert!(!err.cause.is_empty());
    }
}
