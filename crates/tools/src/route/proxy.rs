use super::backend::{RouteBackend, RouteRequest, StationQuery};
use super::retry::RetryConfig;
use async_trait::async_trait;
use fleetcare_common::{FleetError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Upstream route service settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteProxyConfig {
    /// Base URL; `<base>/optimize_route` and `<base>/find_charging_stations` are called
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// Forwards route requests to an HTTP service and returns its JSON untouched.
pub struct HttpRouteBackend {
    base_url: String,
    api_key: Option<String>,
    http_client: reqwest::Client,
}

impl HttpRouteBackend {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            http_client: reqwest::Client::new(),
        }
    }

    async fn post<B: Serialize + Sync>(&self, operation: &str, body: &B) -> Result<Value> {
        let url = format!("{}/{}", self.base_url, operation);
        debug!(url = %url, "Forwarding route request");

        let mut http_req = self.http_client.post(&url).json(body);
        if let Some(ref key) = self.api_key {
            http_req = http_req.bearer_auth(key);
        }

        let response = http_req
            .send()
            .await
            .map_err(|e| FleetError::Upstream(format!("Route request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(FleetError::UpstreamStatus {
                status: status.as_u16(),
                retry_after_secs,
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FleetError::Upstream(format!("Failed to read route response: {e}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl RouteBackend for HttpRouteBackend {
    async fn optimize_route(&self, request: &RouteRequest) -> Result<Value> {
        self.post("optimize_route", request).await
    }

    async fn find_charging_stations(&self, query: &StationQuery) -> Result<Value> {
        self.post("find_charging_stations", query).await
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let backend = HttpRouteBackend::new("http://routes.local/api/", None);
        assert_eq!(backend.base_url, "http://routes.local/api");
    }

    #[test]
    fn test_proxy_config_defaults() {
        let config: RouteProxyConfig =
            serde_json::from_value(serde_json::json!({"base_url": "http://x"})).unwrap();
        assert!(config.api_key.is_none());
        assert_eq!(config.retry.max_retries, 3);
    }
}
