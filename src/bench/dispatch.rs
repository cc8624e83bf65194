use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use super::store::{StoreError, Timed};
use crate::metrics::{CoreMetrics, HttpClientMetric};
use crate::monitoring::{CallMonitor, CallToken};

/// Routes store calls through every monitor's lifecycle hooks and retries
/// transient failures up to `max_attempts` total attempts.
pub struct CallDispatcher {
    service: String,
    monitors: Vec<Arc<dyn CallMonitor>>,
    max_attempts: u32,
}

impl CallDispatcher {
    pub fn new(service: impl Into<String>, monitors: Vec<Arc<dyn CallMonitor>>) -> Self {
        Self {
            service: service.into(),
            monitors,
            max_attempts: 3,
        }
    }

    /// At least one attempt is always made.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run `call` until it succeeds, fails terminally, or attempts run out.
    ///
    /// Hooks fire as: started → retried (per extra attempt) →
    /// succeeded | failed → finished. Only the final attempt's latency is
    /// reported.
    pub async fn dispatch<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Timed<T>>,
    {
        let service = self.service.as_str();
        let tokens: Vec<CallToken> = self
            .monitors
            .iter()
            .map(|m| m.on_call_started(service, operation))
            .collect();

        let mut attempt = 1;
        let outcome = loop {
            let Timed { result, latency_ms } = call().await;
            match result {
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    debug!(service, operation, attempt, "retrying after {e}");
                    for (m, token) in self.monitors.iter().zip(&tokens) {
                        m.on_call_retried(service, operation, token);
                    }
                    attempt += 1;
                }
                result => {
                    let metrics =
                        CoreMetrics::new().with(HttpClientMetric::RequestLatency, latency_ms);
                    for (m, token) in self.monitors.iter().zip(&tokens) {
                        if result.is_ok() {
                            m.on_call_succeeded(service, operation, &metrics, token);
                        } else {
                            m.on_call_failed(service, operation, &metrics, token);
                        }
                    }
                    break result;
                }
            }
        };

        for (m, token) in self.monitors.iter().zip(&tokens) {
            m.on_call_finished(service, operation, token);
        }
        outcome
    }
}
