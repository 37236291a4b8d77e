/**
 * POLLING TASK - Refresh cadence of one data domain
 *
 * ROLE: owns the timer of a single domain (agent status, hospital list),
 * runs fetch -> derive on every tick and keeps the latest snapshot.
 *
 * LIFECYCLE: STOPPED -> RUNNING -> STOPPED. `start` is idempotent, `stop`
 * cancels the timer; a fetch already issued may finish but its result is
 * dropped (epoch check) so a stopped task never mutates state again.
 *
 * SCHEDULING: the tick loop awaits each cycle before polling the timer
 * again, so at most one cycle is in flight. Ticks that fall due while a
 * cycle is pending are dropped, not replayed.
 */

use crate::derive::{derive_agent, derive_hospitals};
use crate::error::{Result, SyncError};
use crate::fetcher::{DataFetcher, Endpoint};
use crate::models::{AgentView, HospitalsView};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Zero periods are raised to this (tokio intervals cannot be zero).
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

pub type DeriveFn<T> = fn(&Value) -> Result<T>;

/// Receives every state transition of a task (store hook).
pub type Publisher<T> = Arc<dyn Fn(&PollTaskState<T>) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct PollTaskState<T> {
    pub interval: Duration,
    pub last_snapshot: Option<Arc<T>>,
    pub last_error: Option<SyncError>,
    pub is_running: bool,
    pub last_updated: Option<OffsetDateTime>,
}

impl<T> PollTaskState<T> {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_snapshot: None,
            last_error: None,
            is_running: false,
            last_updated: None,
        }
    }

    pub fn in_sync(&self) -> bool {
        self.is_running && self.last_snapshot.is_some() && self.last_error.is_none()
    }

    /// Running but nothing resolved yet.
    pub fn is_loading(&self) -> bool {
        self.is_running && self.last_snapshot.is_none() && self.last_error.is_none()
    }
}

struct Inner<T> {
    state: PollTaskState<T>,
    epoch: u64,
    stop_tx: Option<watch::Sender<bool>>,
}

struct Worker<T> {
    domain: &'static str,
    endpoint: Endpoint,
    fetcher: Arc<dyn DataFetcher>,
    derive: DeriveFn<T>,
    publish: Publisher<T>,
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for Worker<T> {
    fn clone(&self) -> Self {
        Self {
            domain: self.domain,
            endpoint: self.endpoint,
            fetcher: self.fetcher.clone(),
            derive: self.derive,
            publish: self.publish.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> Worker<T> {
    async fn run(self, epoch: u64, period: Duration, mut stop_rx: watch::Receiver<bool>) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let due = tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                due = ticker.tick() => due,
            };

            let outcome = match self.fetcher.fetch(self.endpoint, &[]).await {
                Ok(raw) => (self.derive)(&raw),
                Err(e) => Err(e.into()),
            };

            if !self.commit(epoch, outcome) {
                break;
            }

            // ticks that fell due while the cycle was pending are dropped
            if due.elapsed() >= period {
                debug!(domain = self.domain, "cycle overran its period, skipping missed ticks");
                ticker.reset();
            }
        }

        debug!(domain = self.domain, epoch, "poll loop exited");
    }

    /// Applies a cycle outcome; `false` once the task was stopped or restarted.
    fn commit(&self, epoch: u64, outcome: Result<T>) -> bool {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch || !inner.state.is_running {
            debug!(domain = self.domain, epoch, "discarding late poll result");
            return false;
        }

        match outcome {
            Ok(view) => {
                inner.state.last_snapshot = Some(Arc::new(view));
                inner.state.last_error = None;
                inner.state.last_updated = Some(OffsetDateTime::now_utc());
                debug!(domain = self.domain, "snapshot refreshed");
            }
            Err(err) => {
                // previous snapshot stays visible
                warn!(domain = self.domain, error = %err, "poll cycle failed");
                inner.state.last_error = Some(err);
            }
        }

        (self.publish)(&inner.state);
        true
    }
}

pub struct PollingTask<T> {
    worker: Worker<T>,
}

impl<T: Send + Sync + 'static> PollingTask<T> {
    pub fn new(
        domain: &'static str,
        endpoint: Endpoint,
        fetcher: Arc<dyn DataFetcher>,
        derive: DeriveFn<T>,
        publish: Publisher<T>,
    ) -> Self {
        let inner = Inner {
            state: PollTaskState::new(Duration::ZERO),
            epoch: 0,
            stop_tx: None,
        };
        Self {
            worker: Worker {
                domain,
                endpoint,
                fetcher,
                derive,
                publish,
                inner: Arc::new(Mutex::new(inner)),
            },
        }
    }

    /// Starts polling: one cycle right away, then one per `period`.
    /// Returns `false` (and does nothing) if already running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, period: Duration) -> bool {
        let mut inner = self.worker.inner.lock();
        if inner.state.is_running {
            debug!(domain = self.worker.domain, "start ignored, already running");
            return false;
        }

        let period = period.max(MIN_PERIOD);
        inner.epoch += 1;
        let epoch = inner.epoch;
        let (stop_tx, stop_rx) = watch::channel(false);
        inner.stop_tx = Some(stop_tx);
        inner.state.is_running = true;
        inner.state.interval = period;
        (self.worker.publish)(&inner.state);

        tokio::spawn(self.worker.clone().run(epoch, period, stop_rx));
        info!(domain = self.worker.domain, period_ms = period.as_millis() as u64, "polling started");
        true
    }

    /// Stops polling. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let mut inner = self.worker.inner.lock();
        if !inner.state.is_running {
            return false;
        }

        inner.state.is_running = false;
        inner.epoch += 1;
        if let Some(stop_tx) = inner.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        (self.worker.publish)(&inner.state);
        info!(domain = self.worker.domain, "polling stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.worker.inner.lock().state.is_running
    }

    pub fn state(&self) -> PollTaskState<T> {
        let inner = self.worker.inner.lock();
        PollTaskState {
            interval: inner.state.interval,
            last_snapshot: inner.state.last_snapshot.clone(),
            last_error: inner.state.last_error.clone(),
            is_running: inner.state.is_running,
            last_updated: inner.state.last_updated,
        }
    }

    pub fn domain(&self) -> &'static str {
        self.worker.domain
    }
}

impl PollingTask<AgentView> {
    pub fn agent(fetcher: Arc<dyn DataFetcher>, publish: Publisher<AgentView>) -> Self {
        Self::new("agent", Endpoint::AgentStatus, fetcher, derive_agent, publish)
    }
}

impl PollingTask<HospitalsView> {
    pub fn hospitals(fetcher: Arc<dyn DataFetcher>, publish: Publisher<HospitalsView>) -> Self {
        Self::new("hospitals", Endpoint::Hospitals, fetcher, derive_hospitals, publish)
    }
}

impl<T> Drop for PollingTask<T> {
    fn drop(&mut self) {
        let mut inner = self.worker.inner.lock();
        if inner.state.is_running {
            inner.state.is_running = false;
            inner.epoch += 1;
            inner.stop_tx.take();
            (self.worker.publish)(&inner.state);
        }
    }
}
