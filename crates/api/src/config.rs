//! Server configuration.
//!
//! Values come from, in increasing priority: built-in defaults, a TOML file,
//! `FLEETCARE_*` environment variables, then command-line flags (applied by
//! the binary).

use fleetcare_tools::RouteProxyConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

pub const ENV_BIND_ADDR: &str = "FLEETCARE_BIND_ADDR";
pub const ENV_REPORT_PATH: &str = "FLEETCARE_REPORT_PATH";
pub const ENV_ROUTE_PROXY_URL: &str = "FLEETCARE_ROUTE_PROXY_URL";
pub const ENV_ROUTE_API_KEY: &str = "FLEETCARE_ROUTE_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address to bind
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// JSON report served by `/api/dashboard`
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,

    /// Maximum request body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Where the dashboard frontend is expected to run
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    /// Upstream route service; synthetic routes when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_proxy: Option<RouteProxyConfig>,
}

fn default_bind_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_report_path() -> PathBuf {
    PathBuf::from("crew_report.json")
}

fn default_body_limit() -> usize {
    1024 * 1024
}

fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
            report_path: default_report_path(),
            body_limit_bytes: default_body_limit(),
            frontend_url: default_frontend_url(),
            route_proxy: None,
        }
    }
}

impl ApiConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: Self = toml::from_str(&content)?;

        if config
            .route_proxy
            .as_ref()
            .is_some_and(|p| p.api_key.is_some())
        {
            warn!(
                "Route API key found in config file '{}'. Prefer {} instead.",
                path.display(),
                ENV_ROUTE_API_KEY
            );
        }
        Ok(config)
    }

    /// Apply `FLEETCARE_*` overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using `lookup` as the environment.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            self.bind_addr = addr;
        }
        if let Some(path) = lookup(ENV_REPORT_PATH) {
            self.report_path = PathBuf::from(path);
        }
        if let Some(url) = lookup(ENV_ROUTE_PROXY_URL) {
            match self.route_proxy.as_mut() {
                Some(proxy) => proxy.base_url = url,
                None => {
                    self.route_proxy = Some(RouteProxyConfig {
                        base_url: url,
                        ..Default::default()
                    })
                }
            }
        }
        if let Some(key) = lookup(ENV_ROUTE_API_KEY) {
            match self.route_proxy.as_mut() {
                Some(proxy) => proxy.api_key = Some(key),
                None => warn!(
                    "{} is set but no route proxy is configured; ignoring",
                    ENV_ROUTE_API_KEY
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.port, 5000);
        assert_eq!(config.body_limit_bytes, 1024 * 1024);
        assert!(config.route_proxy.is_none());
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
port = 8081
report_path = "/tmp/report.json"

[route_proxy]
base_url = "http://routes.internal"

[route_proxy.retry]
max_retries = 5
"#
        )
        .unwrap();

        let config = ApiConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.report_path, PathBuf::from("/tmp/report.json"));
        let proxy = config.route_proxy.unwrap();
        assert_eq!(proxy.base_url, "http://routes.internal");
        assert_eq!(proxy.retry.max_retries, 5);
        assert_eq!(proxy.retry.initial_delay_ms, 500);
    }

    #[test]
    fn test_from_file_missing() {
        let err = ApiConfig::from_file("/nonexistent/fleetcare.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = ApiConfig {
            bind_addr: "10.0.0.1".to_string(),
            ..Default::default()
        };
        config.apply_env_from(env(&[
            (ENV_BIND_ADDR, "0.0.0.0"),
            (ENV_REPORT_PATH, "out/report.json"),
            (ENV_ROUTE_PROXY_URL, "http://proxy"),
            (ENV_ROUTE_API_KEY, "k"),
        ]));
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.report_path, PathBuf::from("out/report.json"));
        let proxy = config.route_proxy.unwrap();
        assert_eq!(proxy.base_url, "http://proxy");
        assert_eq!(proxy.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_api_key_without_proxy_is_ignored() {
        let mut config = ApiConfig::default();
        config.apply_env_from(env(&[(ENV_ROUTE_API_KEY, "k")]));
        assert!(config.route_proxy.is_none());
    }
}
