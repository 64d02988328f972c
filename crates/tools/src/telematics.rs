//! Vehicle telematics simulator.
//!
//! Produces a full sensor snapshot for a vehicle. Readings come from an LCG
//! seeded by the vehicle ID, and a fixed rule on the fleet number decides
//! which vehicles carry faults, so the same ID always yields the same data.

use crate::seed::{round_to, seed_for, Lcg};
use async_trait::async_trait;
use chrono::Duration;
use fleetcare_common::clock::{iso_timestamp, Clock, SystemClock};
use fleetcare_common::traits::parse_args;
use fleetcare_common::{FleetError, Result, Tool, VehicleId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

const ACTIONS: &[&str] = &["get_telemetry"];

/// Input for `get_telemetry`.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TelemetryInput {
    /// Vehicle identifier (e.g. VEH001)
    pub vehicle_id: String,
}

/// Severity of the warnings a vehicle reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    None,
    Low,
    Medium,
    High,
}

/// Fault status derived from the fleet number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceStatus {
    pub has_warnings: bool,
    pub warning_level: WarningLevel,
    pub maintenance_due: bool,
}

impl MaintenanceStatus {
    /// Even-numbered vehicles 2..=10 have issues; 3 and 7 have minor ones.
    pub fn for_vehicle(number: u32) -> Self {
        match number {
            4 | 8 => Self::issues(WarningLevel::High),
            2 | 6 | 10 => Self::issues(WarningLevel::Medium),
            3 | 7 => Self {
                has_warnings: true,
                warning_level: WarningLevel::Low,
                maintenance_due: false,
            },
            _ => Self {
                has_warnings: false,
                warning_level: WarningLevel::None,
                maintenance_due: false,
            },
        }
    }

    fn issues(level: WarningLevel) -> Self {
        Self {
            has_warnings: true,
            warning_level: level,
            maintenance_due: true,
        }
    }

    fn is_nominal(&self) -> bool {
        self.warning_level == WarningLevel::None
    }

    fn is_severe(&self) -> bool {
        matches!(self.warning_level, WarningLevel::Medium | WarningLevel::High)
    }
}

/// Diagnostic trouble codes for a vehicle.
pub fn diagnostic_codes(number: u32, status: &MaintenanceStatus) -> Vec<&'static str> {
    if !status.has_warnings {
        return Vec::new();
    }
    match number {
        2 => vec!["P0300", "P0171"],
        4 => vec!["P0128", "P0420", "P0171"],
        6 => vec!["P0562", "P0118"],
        8 => vec!["P0420", "P0300", "P0128"],
        10 => vec!["P0171", "P0562"],
        3 => vec!["P0420"],
        7 => vec!["P0171"],
        _ => Vec::new(),
    }
}

pub fn driving_style_description(score: i64) -> &'static str {
    match score {
        s if s >= 90 => "Excellent - Smooth and efficient driving",
        s if s >= 80 => "Good - Generally safe driving habits",
        s if s >= 70 => "Fair - Some aggressive acceleration/braking",
        s if s >= 60 => "Poor - Frequent harsh driving events",
        _ => "Critical - Dangerous driving patterns detected",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineData {
    pub rpm: f64,
    pub temperature_f: f64,
    pub oil_pressure_psi: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrakeSystem {
    pub front_pad_thickness_mm: f64,
    pub rear_pad_thickness_mm: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TirePressure {
    pub front_left: f64,
    pub front_right: f64,
    pub rear_left: f64,
    pub rear_right: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceInfo {
    pub last_service_date: String,
    pub maintenance_due: bool,
    pub warning_level: WarningLevel,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsagePatterns {
    pub daily_average_miles: i64,
    pub driving_style_score: i64,
    pub driving_style_description: &'static str,
}

/// A complete telematics reading.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    pub vehicle_id: String,
    pub timestamp: String,
    pub engine_data: EngineData,
    pub brake_system: BrakeSystem,
    pub electrical_system: Value,
    pub transmission: Value,
    pub cooling_system: Value,
    pub tire_pressure_psi: TirePressure,
    pub vehicle_status: Value,
    pub gps_location: Value,
    pub diagnostic_codes: Vec<&'static str>,
    pub maintenance_info: MaintenanceInfo,
    pub usage_patterns: UsagePatterns,
    pub alerts: Vec<&'static str>,
}

/// Raw readings used for alerting, before rounding.
struct Readings {
    oil_pressure: f64,
    brake_thickness: f64,
    battery_voltage: f64,
    tire_pressures: [f64; 4],
    coolant_level: f64,
}

fn alerts(status: &MaintenanceStatus, r: &Readings) -> Vec<&'static str> {
    let mut alerts = Vec::new();
    if r.oil_pressure < 30.0 {
        alerts.push("LOW OIL PRESSURE - Check engine oil level immediately");
    }
    if r.brake_thickness < 4.0 {
        alerts.push("BRAKE PADS WORN - Schedule brake service soon");
    }
    if r.battery_voltage < 12.0 {
        alerts.push("LOW BATTERY VOLTAGE - Battery may need replacement");
    }
    if r.tire_pressures.iter().any(|p| *p < 28.0) {
        alerts.push("LOW TIRE PRESSURE - Check tire inflation");
    }
    if r.coolant_level < 70.0 {
        alerts.push("LOW COOLANT LEVEL - Check for leaks and refill");
    }
    if status.maintenance_due {
        alerts.push("SCHEDULED MAINTENANCE DUE - Contact service department");
    }
    alerts
}

/// Simulated vehicle telematics API.
pub struct VehicleTelematicsApi {
    clock: Arc<dyn Clock>,
}

impl Default for VehicleTelematicsApi {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl VehicleTelematicsApi {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Generate the snapshot for one vehicle.
    pub fn snapshot(&self, vehicle_id: &VehicleId) -> TelemetrySnapshot {
        let number = vehicle_id.number();
        let n = f64::from(number);
        let status = MaintenanceStatus::for_vehicle(number);
        let mut lcg = Lcg::new(seed_for(vehicle_id.as_str()));

        debug!(vehicle_id = %vehicle_id, number, level = ?status.warning_level, "Generating telemetry");

        let nominal = status.is_nominal();
        let rpm = (if nominal { 800.0 } else { 850.0 }) + lcg.next_in(0.0, 200.0);
        let engine_temp = (if nominal { 195.0 } else { 210.0 }) + lcg.next_in(-5.0, 15.0);
        let oil_base = match status.warning_level {
            WarningLevel::None | WarningLevel::Low => 40.0,
            _ => 25.0,
        };
        let oil_pressure = oil_base + lcg.next_in(-5.0, 10.0);
        let brake_thickness = (if nominal { 8.0 } else { 3.0 }) + lcg.next_in(-1.0, 2.0);
        let battery_voltage = (if nominal { 12.6 } else { 11.8 }) + lcg.next_in(-0.3, 0.4);
        let trans_temp = 175.0 + lcg.next_in(-10.0, 25.0);
        let mut coolant_level = 85.0 + lcg.next_in(-10.0, 15.0);
        if status.is_severe() {
            coolant_level -= 20.0;
        }

        let mut tire_pressures = [0.0; 4];
        for (i, pressure) in tire_pressures.iter_mut().enumerate() {
            let mut p = 32.0 + lcg.next_in(-3.0, 3.0);
            if status.warning_level == WarningLevel::High && i as u32 == number % 4 {
                p -= 8.0;
            }
            *pressure = round_to(p, 1);
        }

        let odometer = (25_000.0 + n * 5_000.0 + lcg.next_in(0.0, 15_000.0)) as i64;
        let fuel_level = 25.0 + lcg.next_in(0.0, 70.0);
        let latitude = 40.7128 + n * 0.1 - 0.5 + lcg.next_in(-0.01, 0.01);
        let longitude = -74.0060 + n * 0.1 - 0.5 + lcg.next_in(-0.01, 0.01);
        let daily_miles = (30.0 + lcg.next_in(0.0, 120.0)) as i64;
        let style_base = if nominal { 85.0 } else { 65.0 };
        let driving_score = (style_base + lcg.next_in(-15.0, 15.0)) as i64;
        let rear_pad = brake_thickness + lcg.peek_in(-1.0, 1.0);

        let days_ago = (if status.maintenance_due { 30 } else { 15 }) + i64::from(number) * 5;
        let last_service = self.clock.today() - Duration::days(days_ago);

        let readings = Readings {
            oil_pressure,
            brake_thickness,
            battery_voltage,
            tire_pressures,
            coolant_level,
        };

        TelemetrySnapshot {
            vehicle_id: vehicle_id.to_string(),
            timestamp: iso_timestamp(self.clock.as_ref()),
            engine_data: EngineData {
                rpm: round_to(rpm, 0),
                temperature_f: round_to(engine_temp, 1),
                oil_pressure_psi: round_to(oil_pressure, 1),
            },
            brake_system: BrakeSystem {
                front_pad_thickness_mm: round_to(brake_thickness, 1),
                rear_pad_thickness_mm: round_to(rear_pad, 1),
            },
            electrical_system: json!({ "battery_voltage": round_to(battery_voltage, 2) }),
            transmission: json!({ "temperature_f": round_to(trans_temp, 1) }),
            cooling_system: json!({
                "coolant_level_percent": round_to(coolant_level.clamp(0.0, 100.0), 1)
            }),
            tire_pressure_psi: TirePressure {
                front_left: tire_pressures[0],
                front_right: tire_pressures[1],
                rear_left: tire_pressures[2],
                rear_right: tire_pressures[3],
            },
            vehicle_status: json!({
                "odometer_miles": odometer,
                "fuel_level_percent": round_to(fuel_level, 1),
            }),
            gps_location: json!({
                "latitude": round_to(latitude, 6),
                "longitude": round_to(longitude, 6),
            }),
            diagnostic_codes: diagnostic_codes(number, &status),
            maintenance_info: MaintenanceInfo {
                last_service_date: last_service.format("%Y-%m-%d").to_string(),
                maintenance_due: status.maintenance_due,
                warning_level: status.warning_level,
            },
            usage_patterns: UsagePatterns {
                daily_average_miles: daily_miles,
                driving_style_score: driving_score,
                driving_style_description: driving_style_description(driving_score),
            },
            alerts: alerts(&status, &readings),
        }
    }
}

#[async_trait]
impl Tool for VehicleTelematicsApi {
    fn name(&self) -> &str {
        "vehicle_telematics_api"
    }

    fn description(&self) -> &str {
        "Simulates vehicle telematics: engine, brake, battery, tire, GPS, diagnostic \
         trouble codes, maintenance status and usage patterns. Data is consistent per vehicle ID."
    }

    fn actions(&self) -> &[&'static str] {
        ACTIONS
    }

    fn schemas(&self) -> Value {
        json!({ "get_telemetry": schemars::schema_for!(TelemetryInput) })
    }

    async fn execute(&self, action: &str, args: &Value) -> Result<Value> {
        match action {
            "get_telemetry" => {
                let input: TelemetryInput = parse_args(action, args)?;
                let vehicle_id = VehicleId::parse(&input.vehicle_id)?;
                Ok(serde_json::to_value(self.snapshot(&vehicle_id))?)
            }
            other => Err(FleetError::unknown_action(other, ACTIONS)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetcare_common::FixedClock;

    fn api() -> VehicleTelematicsApi {
        VehicleTelematicsApi::new(Arc::new(FixedClock::on(2025, 6, 15).unwrap()))
    }

    fn id(raw: &str) -> VehicleId {
        VehicleId::parse(raw).unwrap()
    }

    #[test]
    fn test_status_rules() {
        assert_eq!(MaintenanceStatus::for_vehicle(4).warning_level, WarningLevel::High);
        assert_eq!(MaintenanceStatus::for_vehicle(6).warning_level, WarningLevel::Medium);
        assert_eq!(MaintenanceStatus::for_vehicle(7).warning_level, WarningLevel::Low);
        assert!(!MaintenanceStatus::for_vehicle(7).maintenance_due);
        assert_eq!(MaintenanceStatus::for_vehicle(5).warning_level, WarningLevel::None);
        assert!(!MaintenanceStatus::for_vehicle(11).has_warnings);
    }

    #[test]
    fn test_same_vehicle_same_snapshot() {
        let api = api();
        let a = serde_json::to_value(api.snapshot(&id("VEH004"))).unwrap();
        let b = serde_json::to_value(api.snapshot(&id("VEH004"))).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_vehicles_differ() {
        let api = api();
        let a = api.snapshot(&id("VEH001"));
        let b = api.snapshot(&id("VEH005"));
        assert_ne!(a.vehicle_status, b.vehicle_status);
    }

    #[test]
    fn test_healthy_vehicle_has_no_codes() {
        let snap = api().snapshot(&id("VEH001"));
        assert!(snap.diagnostic_codes.is_empty());
        assert_eq!(snap.maintenance_info.warning_level, WarningLevel::None);
        assert!(!snap.alerts.contains(&"SCHEDULED MAINTENANCE DUE - Contact service department"));
    }

    #[test]
    fn test_high_warning_vehicle_reports_faults() {
        let snap = api().snapshot(&id("VEH008"));
        assert_eq!(snap.diagnostic_codes, vec!["P0420", "P0300", "P0128"]);
        assert!(snap.maintenance_info.maintenance_due);
        // Brake base is 3mm plus at most 2mm of noise.
        assert!(snap.brake_system.front_pad_thickness_mm <= 5.0);
        assert!(snap.alerts.contains(&"SCHEDULED MAINTENANCE DUE - Contact service department"));
        // Tire index 8 % 4 = 0 is deflated by 8 psi.
        assert!(snap.tire_pressure_psi.front_left < 28.0);
        assert!(snap.alerts.contains(&"LOW TIRE PRESSURE - Check tire inflation"));
    }

    #[test]
    fn test_readings_within_ranges() {
        let api = api();
        for n in 1..=10 {
            let snap = api.snapshot(&id(&format!("VEH{:03}", n)));
            let odo = snap.vehicle_status["odometer_miles"].as_i64().unwrap();
            let base = 25_000 + i64::from(n) * 5_000;
            assert!(odo >= base && odo <= base + 15_000);
            let coolant = snap.cooling_system["coolant_level_percent"].as_f64().unwrap();
            assert!((0.0..=100.0).contains(&coolant));
            assert!((800.0..=1050.0).contains(&snap.engine_data.rpm));
        }
    }

    #[test]
    fn test_last_service_date_uses_clock() {
        let snap = api().snapshot(&id("VEH002"));
        // Due: 30 days + 2 * 5 days before 2025-06-15.
        assert_eq!(snap.maintenance_info.last_service_date, "2025-05-06");
    }

    #[test]
    fn test_driving_style_bands() {
        assert!(driving_style_description(95).starts_with("Excellent"));
        assert!(driving_style_description(80).starts_with("Good"));
        assert!(driving_style_description(72).starts_with("Fair"));
        assert!(driving_style_description(60).starts_with("Poor"));
        assert!(driving_style_description(12).starts_with("Critical"));
    }

    #[tokio::test]
    async fn test_execute_rejects_bad_vehicle_id() {
        let err = api()
            .execute("get_telemetry", &json!({"vehicle_id": "TRUCK9"}))
            .await
            .unwrap_err();
        assert!(matches!(err, FleetError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_execute_returns_full_payload() {
        let value = api()
            .execute("get_telemetry", &json!({"vehicle_id": "VEH003"}))
            .await
            .unwrap();
        assert_eq!(value["vehicle_id"], "VEH003");
        assert_eq!(value["diagnostic_codes"], json!(["P0420"]));
        assert_eq!(value["maintenance_info"]["warning_level"], "low");
        assert!(value["tire_pressure_psi"]["rear_right"].is_number());
    }
}
