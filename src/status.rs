//! System status model and periodic refresh
//!
//! [`StatusPoller`] is a background task that re-fetches `GET /status` on a
//! fixed interval and publishes the latest good result. It is tied to its
//! owner: [`StatusPoller::stop`] or dropping the poller cancels the task, so
//! no timer outlives the chat session.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;

/// Health of one dependency as reported by the chat service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    /// `healthy`, `unhealthy` or `unreachable`
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Body of `GET /status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemStatus {
    /// `healthy` when every service is healthy, `degraded` otherwise
    pub status: String,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceHealth>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl SystemStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }

    /// Names of services that are not healthy, alphabetically.
    pub fn unhealthy_services(&self) -> Vec<&str> {
        self.services
            .iter()
            .filter(|(_, health)| !health.is_healthy())
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Shortest refresh period the poller will use.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Cancellable periodic `/status` refresher.
#[derive(Debug)]
pub struct StatusPoller {
    latest: watch::Receiver<Option<SystemStatus>>,
    cancellation: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl StatusPoller {
    /// Spawn the refresh task. The first fetch happens immediately.
    ///
    /// Intervals shorter than [`MIN_POLL_INTERVAL`] are raised to it.
    /// Must be called from within a Tokio runtime.
    pub fn spawn(api: ApiClient, interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(?interval, "Status poll interval too short; using minimum");
        }
        let interval = interval.max(MIN_POLL_INTERVAL);
        let (tx, latest) = watch::channel(None);
        let cancellation = CancellationToken::new();
        let task = tokio::spawn(poll_loop(api, interval, tx, cancellation.clone()));

        Self {
            latest,
            cancellation,
            task: Some(task),
        }
    }

    /// The most recent successful status, if any fetch has succeeded yet.
    pub fn latest(&self) -> Option<SystemStatus> {
        self.latest.borrow().clone()
    }

    /// Receiver that changes after each successful refresh.
    pub fn subscribe(&self) -> watch::Receiver<Option<SystemStatus>> {
        self.latest.clone()
    }

    /// Whether the refresh task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the refresh task and wait for it to exit.
    pub async fn stop(mut self) {
        self.cancellation.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Status poller task failed");
            }
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

async fn poll_loop(
    api: ApiClient,
    interval: Duration,
    tx: watch::Sender<Option<SystemStatus>>,
    cancellation: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = cancellation.cancelled() => break,

            _ = ticker.tick() => {
                let fetched = tokio::select! {
                    _ = cancellation.cancelled() => break,
                    result = api.status() => result,
                };
                match fetched {
                    Ok(status) => {
                        tracing::debug!(status = %status.status, "Refreshed system status");
                        tx.send_replace(Some(status));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Status refresh failed; keeping previous status");
                    }
                }
            }
        }
    }

    tracing::debug!("Status poller stopped");
}
