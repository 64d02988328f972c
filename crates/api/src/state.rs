//! Application state for the API server.

use crate::config::ApiConfig;
use fleetcare_common::{Clock, SystemClock};
use fleetcare_tools::ToolRegistry;
use std::sync::Arc;

/// Shared application state for the API server.
pub struct AppState {
    /// Every simulated tool, by wire name
    pub registry: ToolRegistry,

    pub config: ApiConfig,

    /// Source of response timestamps
    pub clock: Arc<dyn Clock>,

    /// Server start time (for health checks)
    pub start_time: std::time::Instant,
}

impl AppState {
    /// State with the standard tool set on the system clock.
    pub fn new(config: ApiConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ApiConfig, clock: Arc<dyn Clock>) -> Self {
        let registry = ToolRegistry::standard(clock.clone(), config.route_proxy.as_ref());
        Self {
            registry,
            config,
            clock,
            start_time: std::time::Instant::now(),
        }
    }

    /// Get the uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
