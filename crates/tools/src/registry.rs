//! Name-indexed set of tools.

use crate::maintenance::MaintenanceHistoryApi;
use crate::notification::CustomerNotificationApi;
use crate::route::{RouteOptimizer, RouteProxyConfig};
use crate::security::SecurityMonitor;
use crate::service_center::ServiceCenterApi;
use crate::telematics::VehicleTelematicsApi;
use fleetcare_common::{Clock, FleetError, Result, Tool, ToolInfo, ToolRequest};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Tools addressable by their wire name.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All six tools sharing one clock. Route plans go through the HTTP
    /// backend when `route_proxy` is set.
    pub fn standard(clock: Arc<dyn Clock>, route_proxy: Option<&RouteProxyConfig>) -> Self {
        let route = match route_proxy {
            Some(config) => RouteOptimizer::with_proxy(config),
            None => RouteOptimizer::default(),
        };

        let mut registry = Self::new();
        registry.register(Arc::new(VehicleTelematicsApi::new(clock.clone())));
        registry.register(Arc::new(MaintenanceHistoryApi::new(clock.clone())));
        registry.register(Arc::new(ServiceCenterApi::new(clock.clone())));
        registry.register(Arc::new(route));
        registry.register(Arc::new(CustomerNotificationApi::new(clock.clone())));
        registry.register(Arc::new(SecurityMonitor::new(clock)));
        info!(tools = registry.tools.len(), "Tool registry ready");
        registry
    }

    /// Add a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn list(&self) -> Vec<ToolInfo> {
        self.tools.values().map(|t| t.info()).collect()
    }

    /// Dispatch a request. Only an unknown tool is an error; action failures
    /// come back as error payloads.
    pub async fn invoke(&self, tool: &str, request: &ToolRequest) -> Result<Value> {
        let handler = self
            .get(tool)
            .ok_or_else(|| FleetError::not_found(format!("Unknown tool: {}", tool)))?;
        debug!(tool, action = %request.action, "Dispatching tool request");
        Ok(handler.invoke(request).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetcare_common::FixedClock;
    use serde_json::json;

    fn registry() -> ToolRegistry {
        ToolRegistry::standard(Arc::new(FixedClock::on(2025, 6, 15).unwrap()), None)
    }

    #[test]
    fn test_standard_registry_has_all_tools() {
        assert_eq!(
            registry().names(),
            vec![
                "customer_notification_api",
                "iternio_route_optimizer",
                "maintenance_history_api",
                "service_center_api",
                "ueba_security_monitor",
                "vehicle_telematics_api",
            ]
        );
    }

    #[test]
    fn test_every_action_has_a_schema() {
        for info in registry().list() {
            for action in &info.actions {
                assert!(
                    info.schemas.get(*action).is_some(),
                    "{} is missing a schema for {}",
                    info.name,
                    action
                );
            }
        }
    }

    #[tokio::test]
    async fn test_invoke_unknown_tool() {
        let err = registry()
            .invoke("weather_api", &ToolRequest::new("forecast", Value::Null))
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_action_payload_lists_actions() {
        let payload = registry()
            .invoke("vehicle_telematics_api", &ToolRequest::new("honk", json!({})))
            .await
            .unwrap();
        assert_eq!(payload["success"], false);
        assert_eq!(payload["valid_actions"], json!(["get_telemetry"]));
    }

    #[tokio::test]
    async fn test_invalid_vehicle_id_payload() {
        let payload = registry()
            .invoke(
                "vehicle_telematics_api",
                &ToolRequest::new("get_telemetry", json!({"vehicle_id": "TRUCK1"})),
            )
            .await
            .unwrap();
        assert_eq!(payload["error"], "Invalid vehicle_id format. Use VEH001-VEH010");
    }
}
