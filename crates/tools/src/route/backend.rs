use crate::seed::{rng_for, round_to};
use async_trait::async_trait;
use fleetcare_common::{FleetError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Arguments of `optimize_route`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RouteRequest {
    /// Starting location (address or coordinates)
    pub start_location: String,
    /// Destination location (address or coordinates)
    pub end_location: String,
    /// Electric vehicle model
    #[serde(default = "default_vehicle_type")]
    pub vehicle_type: String,
    /// Maximum range of the vehicle in kilometers
    #[serde(default = "default_max_range_km")]
    pub max_range_km: f64,
}

fn default_vehicle_type() -> String {
    "Model S".to_string()
}

fn default_max_range_km() -> f64 {
    500.0
}

/// Arguments of `find_charging_stations`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StationQuery {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    /// Search radius in kilometers
    #[serde(default = "default_radius_km")]
    pub radius_km: f64,
}

fn default_radius_km() -> f64 {
    50.0
}

/// Source of route plans and charging station listings.
#[async_trait]
pub trait RouteBackend: Send + Sync {
    async fn optimize_route(&self, request: &RouteRequest) -> Result<Value>;

    async fn find_charging_stations(&self, query: &StationQuery) -> Result<Value>;

    fn name(&self) -> &str;
}

const STATION_POWER_KW: [u32; 3] = [50, 150, 250];

/// Roughly half the Earth's circumference.
pub const MAX_SEARCH_RADIUS_KM: f64 = 20_000.0;

/// Generates plausible routes locally. The RNG is keyed on the trip (or the
/// search point) so a repeated request returns the same plan.
#[derive(Debug, Default, Clone, Copy)]
pub struct SyntheticBackend;

#[async_trait]
impl RouteBackend for SyntheticBackend {
    async fn optimize_route(&self, request: &RouteRequest) -> Result<Value> {
        let mut rng = rng_for(&format!("{}|{}", request.start_location, request.end_location));
        let distance: i64 = rng.gen_range(50..=300);
        let distance_f = distance as f64;

        let charging_stops = if distance_f > request.max_range_km * 0.6 {
            json!([{
                "name": "SuperCharger Station A",
                "distance_from_start_km": (distance_f * 0.4) as i64,
                "duration_minutes": 20
            }])
        } else {
            json!([])
        };

        Ok(json!({
            "route_optimized": true,
            "start_location": request.start_location,
            "end_location": request.end_location,
            "vehicle_type": request.vehicle_type,
            "total_distance_km": distance,
            "total_time_minutes": (distance_f * 1.5) as i64,
            "charging_stops": charging_stops,
            "energy_consumption_kwh": (distance_f * 0.2) as i64,
            "route_polyline": "encoded_polyline_string_placeholder",
            "warnings": [],
        }))
    }

    async fn find_charging_stations(&self, query: &StationQuery) -> Result<Value> {
        if query.radius_km.is_nan() || query.radius_km <= 0.0 {
            return Err(FleetError::invalid("radius_km must be positive"));
        }
        if query.radius_km > MAX_SEARCH_RADIUS_KM {
            return Err(FleetError::invalid(format!(
                "radius_km must not exceed {} km",
                MAX_SEARCH_RADIUS_KM
            )));
        }
        let mut rng = rng_for(&format!(
            "{:.4},{:.4},{}",
            query.latitude, query.longitude, query.radius_km
        ));
        let (near, far) = if query.radius_km < 1.0 {
            (query.radius_km, 1.0)
        } else {
            (1.0, query.radius_km)
        };

        let count = rng.gen_range(2..=5);
        let stations: Vec<Value> = (0..count)
            .map(|i| {
                json!({
                    "name": format!("Charging Station {}", char::from(b'A' + i)),
                    "address": format!("{} EV Lane", rng.gen_range(1..=999)),
                    "latitude": query.latitude + rng.gen_range(-0.1..=0.1),
                    "longitude": query.longitude + rng.gen_range(-0.1..=0.1),
                    "distance_km": round_to(rng.gen_range(near..=far), 1),
                    "power_kw": STATION_POWER_KW.choose(&mut rng).copied().unwrap_or(50),
                    "connector_types": ["CCS", "Type 2"],
                    "availability": "Available",
                    "network": "EVNet",
                    "cost_per_kwh": 0.35,
                })
            })
            .collect();

        Ok(json!({
            "search_location": {"latitude": query.latitude, "longitude": query.longitude},
            "search_radius_km": query.radius_km,
            "stations_found": stations.len(),
            "charging_stations": stations,
        }))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip(start: &str, end: &str, max_range_km: f64) -> RouteRequest {
        RouteRequest {
            start_location: start.to_string(),
            end_location: end.to_string(),
            vehicle_type: default_vehicle_type(),
            max_range_km,
        }
    }

    #[tokio::test]
    async fn test_same_trip_same_plan() {
        let a = SyntheticBackend.optimize_route(&trip("Pune", "Mumbai", 500.0)).await.unwrap();
        let b = SyntheticBackend.optimize_route(&trip("Pune", "Mumbai", 500.0)).await.unwrap();
        assert_eq!(a, b);
        let distance = a["total_distance_km"].as_i64().unwrap();
        assert!((50..=300).contains(&distance));
        assert_eq!(a["total_time_minutes"].as_i64().unwrap(), (distance as f64 * 1.5) as i64);
    }

    #[tokio::test]
    async fn test_charging_stop_depends_on_range() {
        // Every distance exceeds 0.6 * 50 km and none exceeds 0.6 * 1000 km.
        let short_range = SyntheticBackend.optimize_route(&trip("A", "B", 50.0)).await.unwrap();
        assert_eq!(short_range["charging_stops"].as_array().unwrap().len(), 1);
        let long_range = SyntheticBackend.optimize_route(&trip("A", "B", 1000.0)).await.unwrap();
        assert!(long_range["charging_stops"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_station_listing() {
        let query = StationQuery {
            latitude: 19.07,
            longitude: 72.87,
            radius_km: 25.0,
        };
        let value = SyntheticBackend.find_charging_stations(&query).await.unwrap();
        let stations = value["charging_stations"].as_array().unwrap();
        assert!((2..=5).contains(&stations.len()));
        assert_eq!(stations[0]["name"], "Charging Station A");
        for station in stations {
            let power = station["power_kw"].as_u64().unwrap();
            assert!([50, 150, 250].contains(&power));
            let distance = station["distance_km"].as_f64().unwrap();
            assert!((1.0..=25.0).contains(&distance));
        }
    }

    #[tokio::test]
    async fn test_non_positive_radius_is_rejected() {
        let query = StationQuery {
            latitude: 0.0,
            longitude: 0.0,
            radius_km: 0.0,
        };
        assert!(SyntheticBackend.find_charging_stations(&query).await.is_err());
    }

    #[tokio::test]
    async fn test_radius_is_capped() {
        let query = |radius_km| StationQuery {
            latitude: 12.97,
            longitude: 77.59,
            radius_km,
        };

        let widest = SyntheticBackend
            .find_charging_stations(&query(MAX_SEARCH_RADIUS_KM))
            .await
            .unwrap();
        assert_eq!(widest["search_radius_km"], MAX_SEARCH_RADIUS_KM);

        for radius in [MAX_SEARCH_RADIUS_KM + 0.1, f64::MAX, f64::INFINITY] {
            let err = SyntheticBackend
                .find_charging_stations(&query(radius))
                .await
                .unwrap_err();
            assert!(matches!(err, FleetError::InvalidArgument(_)));
        }
    }
}
