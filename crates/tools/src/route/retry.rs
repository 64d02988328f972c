use super::backend::{RouteBackend, RouteRequest, StationQuery};
use async_trait::async_trait;
use fleetcare_common::{FleetError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Retries upstream failures that look transient (429 and 5xx).
pub struct RetryingBackend<T: RouteBackend> {
    inner: T,
    config: RetryConfig,
}

impl<T: RouteBackend> RetryingBackend<T> {
    pub fn new(inner: T, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    fn is_retryable(error: &FleetError) -> bool {
        match error {
            FleetError::UpstreamStatus { status, .. } => matches!(*status, 429 | 500 | 502 | 503 | 504),
            // Connection, timeout and truncated-body failures
            FleetError::Upstream(_) => true,
            _ => false,
        }
    }

    fn retry_after_ms(error: &FleetError) -> Option<u64> {
        match error {
            FleetError::UpstreamStatus {
                retry_after_secs: Some(secs),
                ..
            } => Some(secs.saturating_mul(1000)),
            _ => None,
        }
    }

    fn compute_delay(&self, attempt: u32) -> u64 {
        let base = self.config.initial_delay_ms as f64
            * self.config.backoff_multiplier.powi(attempt as i32);
        (base as u64).min(self.config.max_delay_ms)
    }

    async fn with_retry<F, Fut>(&self, operation: &str, call: F) -> Result<Value>
    where
        F: Fn() -> Fut + Send + Sync,
        Fut: Future<Output = Result<Value>> + Send,
    {
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.config.max_retries && Self::is_retryable(&e) => {
                    let delay = Self::retry_after_ms(&e)
                        .unwrap_or_else(|| self.compute_delay(attempt))
                        .min(self.config.max_delay_ms);
                    attempt += 1;

                    warn!(
                        operation,
                        attempt,
                        max_retries = self.config.max_retries,
                        delay_ms = delay,
                        error = %e,
                        "Retrying route request"
                    );
                    tokio::time::sleep(tokio::time::Duration::from_millis(delay)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl<T: RouteBackend> RouteBackend for RetryingBackend<T> {
    async fn optimize_route(&self, request: &RouteRequest) -> Result<Value> {
        self.with_retry("optimize_route", move || self.inner.optimize_route(request))
            .await
    }

    async fn find_charging_stations(&self, query: &StationQuery) -> Result<Value> {
        self.with_retry("find_charging_stations", move || {
            self.inner.find_charging_stations(query)
        })
        .await
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails with the given error a fixed number of times, then succeeds.
    struct FlakyBackend {
        failures: u32,
        error: fn() -> FleetError,
        calls: AtomicU32,
    }

    #[async_trait]
    impl RouteBackend for FlakyBackend {
        async fn optimize_route(&self, _request: &RouteRequest) -> Result<Value> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Err((self.error)())
            } else {
                Ok(serde_json::json!({"route_optimized": true}))
            }
        }

        async fn find_charging_stations(&self, _query: &StationQuery) -> Result<Value> {
            Ok(Value::Null)
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn fast() -> RetryConfig {
        RetryConfig {
            initial_delay_ms: 1,
            max_delay_ms: 5,
            ..RetryConfig::default()
        }
    }

    fn request() -> RouteRequest {
        serde_json::from_value(serde_json::json!({"start_location": "A", "end_location": "B"})).unwrap()
    }

    fn status(status: u16, body: &str) -> FleetError {
        FleetError::UpstreamStatus {
            status,
            retry_after_secs: None,
            body: body.to_string(),
        }
    }

    fn unavailable() -> FleetError {
        status(503, "down")
    }

    fn bad_request() -> FleetError {
        status(400, "nope")
    }

    #[test]
    fn test_default_retry_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.initial_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 30_000);
        assert!((config.backoff_multiplier - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_retryable_errors() {
        type R = RetryingBackend<FlakyBackend>;
        assert!(R::is_retryable(&unavailable()));
        assert!(R::is_retryable(&status(429, "slow down")));
        assert!(R::is_retryable(&FleetError::Upstream(
            "Route request failed: connection refused".to_string()
        )));
        assert!(!R::is_retryable(&bad_request()));
        assert!(!R::is_retryable(&status(501, "not implemented")));
        assert!(!R::is_retryable(&FleetError::invalid("500 is just a number here")));
    }

    #[test]
    fn test_status_is_classified_not_body_text() {
        type R = RetryingBackend<FlakyBackend>;
        assert!(!R::is_retryable(&status(422, "stop 2 failed: upstream 500 from 503 gateway")));
    }

    #[test]
    fn test_retry_after_from_status() {
        type R = RetryingBackend<FlakyBackend>;
        let throttled = FleetError::UpstreamStatus {
            status: 429,
            retry_after_secs: Some(2),
            body: String::new(),
        };
        assert_eq!(R::retry_after_ms(&throttled), Some(2000));
        assert_eq!(R::retry_after_ms(&unavailable()), None);
    }

    #[test]
    fn test_backoff_is_capped() {
        let backend = RetryingBackend::new(
            FlakyBackend {
                failures: 0,
                error: unavailable,
                calls: AtomicU32::new(0),
            },
            RetryConfig::default(),
        );
        assert_eq!(backend.compute_delay(0), 500);
        assert_eq!(backend.compute_delay(2), 2000);
        assert_eq!(backend.compute_delay(10), 30_000);
    }

    #[tokio::test]
    async fn test_recovers_from_transient_failures() {
        let backend = RetryingBackend::new(
            FlakyBackend {
                failures: 2,
                error: unavailable,
                calls: AtomicU32::new(0),
            },
            fast(),
        );
        let value = backend.optimize_route(&request()).await.unwrap();
        assert_eq!(value["route_optimized"], true);
        assert_eq!(backend.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let backend = RetryingBackend::new(
            FlakyBackend {
                failures: 10,
                error: unavailable,
                calls: AtomicU32::new(0),
            },
            fast(),
        );
        assert!(backend.optimize_route(&request()).await.is_err());
        assert_eq!(backend.inner.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let backend = RetryingBackend::new(
            FlakyBackend {
                failures: 10,
                error: bad_request,
                calls: AtomicU32::new(0),
            },
            fast(),
        );
        assert!(backend.optimize_route(&request()).await.is_err());
        assert_eq!(backend.inner.calls.load(Ordering::SeqCst), 1);
    }
}
