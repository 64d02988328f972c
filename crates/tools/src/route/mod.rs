//! EV route planning: routes, charging stations, energy and charging time.
//!
//! Route plans and station listings come from a [`RouteBackend`], either the
//! local synthetic generator or an HTTP service behind a retrying client.
//! Energy and charging-time figures are always computed locally.

mod backend;
mod proxy;
mod retry;

pub use backend::{RouteBackend, RouteRequest, StationQuery, SyntheticBackend};
pub use proxy::{HttpRouteBackend, RouteProxyConfig};
pub use retry::{RetryConfig, RetryingBackend};

use crate::seed::round_to;
use async_trait::async_trait;
use fleetcare_common::traits::parse_args;
use fleetcare_common::{FleetError, Result, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

const ACTIONS: &[&str] = &[
    "optimize_route",
    "find_charging_stations",
    "calculate_energy",
    "get_charging_time",
];

const BATTERY_CAPACITY_KWH: f64 = 75.0;
const CONSUMPTION_KWH_PER_KM: f64 = 0.2;
const KWH_PER_PERCENT: f64 = BATTERY_CAPACITY_KWH / 100.0;
const COST_PER_KWH: f64 = 0.30;
const DEFAULT_DISTANCE_KM: f64 = 100.0;

/// Arguments of `calculate_energy`. Both fields accept a JSON object or a
/// string holding one.
#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct EnergyRequest {
    /// Route data, e.g. `{"distance_km": 120}`
    #[serde(default)]
    pub route_data: Value,
    /// Vehicle specifications
    #[serde(default)]
    pub vehicle_specs: Value,
}

/// Arguments of `get_charging_time`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ChargingRequest {
    /// Current battery level percentage
    #[serde(default)]
    pub battery_level: f64,
    /// Target battery level percentage
    #[serde(default = "default_target_level")]
    pub target_level: f64,
    /// Charging power in kW
    #[serde(default = "default_charging_power")]
    pub charging_power: f64,
}

fn default_target_level() -> f64 {
    80.0
}

fn default_charging_power() -> f64 {
    50.0
}

#[derive(Debug, Clone, Serialize)]
pub struct EnergyEstimate {
    pub route_distance_km: f64,
    pub estimated_consumption_kwh: f64,
    pub consumption_per_100km: f64,
    pub battery_usage_percent: f64,
    pub remaining_range_km: i64,
    pub factors_applied: Value,
}

/// Consumption for a trip on the assumed pack. Remaining range never goes
/// below zero.
pub fn estimate_energy(distance_km: f64) -> EnergyEstimate {
    let consumption = distance_km * CONSUMPTION_KWH_PER_KM;
    let remaining = ((BATTERY_CAPACITY_KWH - consumption) / CONSUMPTION_KWH_PER_KM) as i64;
    EnergyEstimate {
        route_distance_km: distance_km,
        estimated_consumption_kwh: round_to(consumption, 2),
        consumption_per_100km: CONSUMPTION_KWH_PER_KM * 100.0,
        battery_usage_percent: round_to(consumption / BATTERY_CAPACITY_KWH * 100.0, 1),
        remaining_range_km: remaining.max(0),
        factors_applied: json!({
            "elevation_factor": 1.02,
            "temperature_factor": 1.0,
            "speed_factor": 1.05
        }),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChargingEstimate {
    pub current_battery_level: f64,
    pub target_battery_level: f64,
    pub charging_power_kw: f64,
    pub energy_needed_kwh: f64,
    pub charging_time_minutes: i64,
    pub charging_time_hours: f64,
    pub estimated_cost: f64,
    pub battery_capacity_assumed_kwh: f64,
}

/// Time to charge from `level` to `target` percent. `Ok(None)` when the
/// battery is already at or above the target.
pub fn estimate_charging(level: f64, target: f64, power_kw: f64) -> Result<Option<ChargingEstimate>> {
    if level >= target {
        return Ok(None);
    }
    if power_kw.is_nan() || power_kw <= 0.0 {
        return Err(FleetError::invalid("charging_power must be positive"));
    }
    let needed = (target - level) * KWH_PER_PERCENT;
    let hours = needed / power_kw;
    Ok(Some(ChargingEstimate {
        current_battery_level: level,
        target_battery_level: target,
        charging_power_kw: power_kw,
        energy_needed_kwh: round_to(needed, 2),
        charging_time_minutes: (hours * 60.0) as i64,
        charging_time_hours: round_to(hours, 1),
        estimated_cost: round_to(needed * COST_PER_KWH, 2),
        battery_capacity_assumed_kwh: BATTERY_CAPACITY_KWH,
    }))
}

/// Accept either an object or a JSON string encoding one; null reads as `{}`.
fn json_object(field: &str, value: &Value) -> Result<serde_json::Map<String, Value>> {
    let parsed = match value {
        Value::Null => return Ok(serde_json::Map::new()),
        Value::String(s) => serde_json::from_str::<Value>(s)
            .map_err(|e| FleetError::invalid(format!("Invalid input data: {} is not valid JSON ({})", field, e)))?,
        other => other.clone(),
    };
    match parsed {
        Value::Object(map) => Ok(map),
        _ => Err(FleetError::invalid(format!(
            "Invalid input data: {} must be a JSON object",
            field
        ))),
    }
}

/// EV route optimizer tool.
pub struct RouteOptimizer {
    backend: Arc<dyn RouteBackend>,
}

impl Default for RouteOptimizer {
    fn default() -> Self {
        Self::new(Arc::new(SyntheticBackend))
    }
}

impl RouteOptimizer {
    pub fn new(backend: Arc<dyn RouteBackend>) -> Self {
        Self { backend }
    }

    /// Route and station calls go to the configured HTTP service.
    pub fn with_proxy(config: &RouteProxyConfig) -> Self {
        info!(base_url = %config.base_url, "Route optimizer using HTTP backend");
        let http = HttpRouteBackend::new(config.base_url.clone(), config.api_key.clone());
        Self::new(Arc::new(RetryingBackend::new(http, config.retry.clone())))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    fn calculate_energy(&self, request: &EnergyRequest) -> Result<EnergyEstimate> {
        let route = json_object("route_data", &request.route_data)?;
        let specs = json_object("vehicle_specs", &request.vehicle_specs)?;
        let distance = match route.get("distance_km") {
            None | Some(Value::Null) => DEFAULT_DISTANCE_KM,
            Some(v) => v
                .as_f64()
                .ok_or_else(|| FleetError::invalid("Invalid input data: distance_km must be a number"))?,
        };
        debug!(distance_km = distance, spec_fields = specs.len(), "Estimating energy");
        Ok(estimate_energy(distance))
    }
}

#[async_trait]
impl Tool for RouteOptimizer {
    fn name(&self) -> &str {
        "iternio_route_optimizer"
    }

    fn description(&self) -> &str {
        "Electric vehicle route planning: route optimization, charging station search, \
         energy consumption estimates and charging time calculations for service fleets."
    }

    fn actions(&self) -> &[&'static str] {
        ACTIONS
    }

    fn schemas(&self) -> Value {
        json!({
            "optimize_route": schemars::schema_for!(RouteRequest),
            "find_charging_stations": schemars::schema_for!(StationQuery),
            "calculate_energy": schemars::schema_for!(EnergyRequest),
            "get_charging_time": schemars::schema_for!(ChargingRequest),
        })
    }

    async fn execute(&self, action: &str, args: &Value) -> Result<Value> {
        match action {
            "optimize_route" => {
                let request: RouteRequest = parse_args(action, args)?;
                debug!(
                    backend = self.backend.name(),
                    start = %request.start_location,
                    end = %request.end_location,
                    "Optimizing route"
                );
                self.backend.optimize_route(&request).await
            }
            "find_charging_stations" => {
                let query: StationQuery = parse_args(action, args)?;
                self.backend.find_charging_stations(&query).await
            }
            "calculate_energy" => {
                let request: EnergyRequest = parse_args(action, args)?;
                Ok(serde_json::to_value(self.calculate_energy(&request)?)?)
            }
            "get_charging_time" => {
                let request: ChargingRequest = parse_args(action, args)?;
                match estimate_charging(
                    request.battery_level,
                    request.target_level,
                    request.charging_power,
                )? {
                    Some(estimate) => Ok(serde_json::to_value(estimate)?),
                    None => Ok(json!({"message": "Battery already sufficient"})),
                }
            }
            other => Err(FleetError::unknown_action(other, ACTIONS)),
        }
    }
}
