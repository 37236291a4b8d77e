/*!
Mock fetcher for development without the remote service

Records every call and answers from a per-endpoint script:
queued one-shot replies first, then a sticky fallback. A held reply
stays pending until its `FetchGate` is released, which is how tests
model a request that is still in flight.
*/

use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use swasthya_core::{DataFetcher, Endpoint, Params, TransportError};
use tokio::sync::oneshot;

type Reply = Result<Value, TransportError>;

enum Scripted {
    Ready(Reply),
    Held(oneshot::Receiver<Reply>),
}

#[derive(Default)]
struct Script {
    queued: VecDeque<Scripted>,
    fallback: Option<Reply>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchCall {
    pub endpoint: Endpoint,
    pub params: Params,
}

#[derive(Default)]
struct MockState {
    scripts: HashMap<Endpoint, Script>,
    calls: Vec<FetchCall>,
    in_flight: HashMap<Endpoint, usize>,
    max_in_flight: HashMap<Endpoint, usize>,
}

/// Scripted `DataFetcher`; clones share the same script and call log.
#[derive(Clone, Default)]
pub struct MockFetcher {
    state: Arc<Mutex<MockState>>,
}

/// Releases one held reply.
pub struct FetchGate {
    tx: oneshot::Sender<Reply>,
}

impl FetchGate {
    pub fn release(self, reply: Reply) {
        let _ = self.tx.send(reply);
    }

    pub fn release_ok(self, value: Value) {
        self.release(Ok(value));
    }

    pub fn release_err(self, cause: &str) {
        self.release(Err(TransportError::new(cause)));
    }
}

struct InFlight {
    endpoint: Endpoint,
    state: Arc<Mutex<MockState>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if let Some(n) = self.state.lock().in_flight.get_mut(&self.endpoint) {
            *n = n.saturating_sub(1);
        }
    }
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every call (after the queue is drained) with `value`.
    pub fn respond(&self, endpoint: Endpoint, value: Value) -> &Self {
        self.script(endpoint, |s| s.fallback = Some(Ok(value)));
        self
    }

    /// Fails every call (after the queue is drained) with a transport error.
    pub fn fail(&self, endpoint: Endpoint, cause: &str) -> &Self {
        let err = TransportError::new(cause);
        self.script(endpoint, |s| s.fallback = Some(Err(err)));
        self
    }

    pub fn enqueue(&self, endpoint: Endpoint, reply: Reply) -> &Self {
        self.script(endpoint, |s| s.queued.push_back(Scripted::Ready(reply)));
        self
    }

    pub fn enqueue_ok(&self, endpoint: Endpoint, value: Value) -> &Self {
        self.enqueue(endpoint, Ok(value))
    }

    pub fn enqueue_err(&self, endpoint: Endpoint, cause: &str) -> &Self {
        self.enqueue(endpoint, Err(TransportError::new(cause)))
    }

    /// Queues a reply that stays pending until the returned gate is released.
    pub fn hold(&self, endpoint: Endpoint) -> FetchGate {
        let (tx, rx) = oneshot::channel();
        self.script(endpoint, |s| s.queued.push_back(Scripted::Held(rx)));
        FetchGate { tx }
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.state.lock().calls.iter().filter(|c| c.endpoint == endpoint).count()
    }

    pub fn all_calls(&self) -> Vec<FetchCall> {
        self.state.lock().calls.clone()
    }

    pub fn last_params(&self, endpoint: Endpoint) -> Option<Params> {
        self.state
            .lock()
            .calls
            .iter()
            .rev()
            .find(|c| c.endpoint == endpoint)
            .map(|c| c.params.clone())
    }

    pub fn in_flight(&self, endpoint: Endpoint) -> usize {
        self.state.lock().in_flight.get(&endpoint).copied().unwrap_or(0)
    }

    /// Highest number of simultaneous pending calls seen for `endpoint`.
    pub fn max_in_flight(&self, endpoint: Endpoint) -> usize {
        self.state.lock().max_in_flight.get(&endpoint).copied().unwrap_or(0)
    }

    pub fn clear(&self) {
        *self.state.lock() = MockState::default();
    }

    fn script(&self, endpoint: Endpoint, edit: impl FnOnce(&mut Script)) {
        edit(self.state.lock().scripts.entry(endpoint).or_default());
    }

    fn next_reply(&self, endpoint: Endpoint, params: &[(String, String)]) -> Scripted {
        let mut state = self.state.lock();
        state.calls.push(FetchCall { endpoint, params: params.to_vec() });

        let in_flight = {
            let n = state.in_flight.entry(endpoint).or_insert(0);
            *n += 1;
            *n
        };
        let max = state.max_in_flight.entry(endpoint).or_insert(0);
        *max = (*max).max(in_flight);

        let script = state.scripts.entry(endpoint).or_default();
        if let Some(next) = script.queued.pop_front() {
            return next;
        }
        match &script.fallback {
            Some(reply) => Scripted::Ready(reply.clone()),
            None => Scripted::Ready(Err(TransportError::new(format!(
                "no scripted reply for {endpoint:?}"
            )))),
        }
    }
}

impl DataFetcher for MockFetcher {
    fn fetch<'a>(
        &'a self,
        endpoint: Endpoint,
        params: &'a [(String, String)],
    ) -> BoxFuture<'a, Result<Value, TransportError>> {
        let reply = self.next_reply(endpoint, params);
        let guard = InFlight { endpoint, state: self.state.clone() };

        Box::pin(async move {
            let _guard = guard;
            match reply {
                Scripted::Ready(reply) => reply,
                Scripted::Held(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(TransportError::new("gate dropped without reply"))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_queue_then_fallback() {
        let mock = MockFetcher::new();
        mock.respond(Endpoint::Hospitals, json!([]))
            .enqueue_err(Endpoint::Hospitals, "boom");

        let first = mock.fetch(Endpoint::Hospitals, &[]).await;
        assert_eq!(first.unwrap_err().cause, "boom");
        assert_eq!(mock.fetch(Endpoint::Hospitals, &[]).await.unwrap(), json!([]));
        assert_eq!(mock.calls(Endpoint::Hospitals), 2);

        let missing = mock.fetch(Endpoint::AgentStatus, &[]).await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_hold_tracks_in_flight() {
        let mock = MockFetcher::new();
        let gate = mock.hold(Endpoint::PredictSurge);
        let params = vec![("event".to_string(), "Holi".to_string())];

        let pending = mock.fetch(Endpoint::PredictSurge, &params);
        assert_eq!(mock.in_flight(Endpoint::PredictSurge), 1);
        assert_eq!(mock.last_params(Endpoint::PredictSurge), Some(params.clone()));

        gate.release_ok(json!({ "ok": true }));
        assert_eq!(pending.await.unwrap(), json!({ "ok": true }));
        assert_eq!(mock.in_flight(Endpoint::PredictSurge), 0);
        assert_eq!(mock.max_in_flight(Endpoint::PredictSurge), 1);
    }
}
