//! Maintenance history and failure prediction simulator.
//!
//! Fleet profiles for VEH001..VEH010 are fixed apart from a seeded mileage
//! offset. Service history, RCA batch data and usage analytics are drawn from
//! an RNG keyed on the vehicle and action, so a vehicle's payload only changes
//! with the date. Failure prediction is a weighted linear score, not a model.

use crate::seed::{rng_for, round_to};
use async_trait::async_trait;
use chrono::{Datelike, Duration};
use fleetcare_common::clock::{Clock, SystemClock};
use fleetcare_common::traits::parse_args;
use fleetcare_common::{FleetError, Result, Tool, VehicleId};
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

const ACTIONS: &[&str] = &[
    "get_history",
    "predict_failures",
    "get_rca_data",
    "add_service_record",
    "get_pattern_analysis",
];

const FLEET_SIZE: u32 = 10;

const SERVICE_SHOPS: &[&str] = &["QuickLube Pro", "AutoCare Plus", "MasterTech", "ServiceFirst"];

/// Input shared by every maintenance action.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct MaintenanceInput {
    /// Vehicle ID (VEH001-VEH010)
    pub vehicle_id: String,

    /// Optional filters; for `add_service_record` these are the record fields
    #[serde(default)]
    pub filters: Option<Value>,
}

/// Fields accepted by `add_service_record`.
#[derive(Debug, Default, Deserialize)]
struct NewServiceRecord {
    service_type: Option<String>,
    cost: Option<i64>,
    service_center: Option<String>,
    technician: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsagePattern {
    City,
    Highway,
    Mixed,
    HeavyDuty,
}

impl UsagePattern {
    pub fn multiplier(self) -> f64 {
        match self {
            Self::City => 1.2,
            Self::Highway => 0.9,
            Self::Mixed => 1.0,
            Self::HeavyDuty => 1.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Climate {
    Temperate,
    Hot,
    Cold,
    Humid,
}

impl Climate {
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Temperate => 1.0,
            Self::Hot => 1.3,
            Self::Cold => 1.1,
            Self::Humid => 1.2,
        }
    }
}

/// Static fleet attributes of a vehicle.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleProfile {
    pub year: i32,
    pub make: &'static str,
    pub model: &'static str,
    pub mileage: i64,
    pub usage_pattern: UsagePattern,
    pub climate: Climate,
    pub manufacturing_batch: String,
}

impl VehicleProfile {
    /// Profile for a fleet vehicle. IDs outside VEH001..VEH010 use VEH001's.
    pub fn for_vehicle(vehicle_id: &VehicleId) -> Self {
        let number = vehicle_id.number();
        let i = if (1..=FLEET_SIZE).contains(&number) && vehicle_id.as_str().len() == 6 {
            number
        } else {
            1
        };
        let slot = (i % 4) as usize;
        let mut rng = rng_for(&format!("VEH{:03}:mileage", i));
        let jitter: i64 = rng.gen_range(-2_000..=8_000);

        Self {
            year: 2020 + (i % 4) as i32,
            make: ["Toyota", "Honda", "Ford", "Chevrolet"][slot],
            model: ["Camry", "Accord", "F-150", "Silverado"][slot],
            mileage: 15_000 + i64::from(i) * 5_000 + jitter,
            usage_pattern: [
                UsagePattern::City,
                UsagePattern::Highway,
                UsagePattern::Mixed,
                UsagePattern::HeavyDuty,
            ][slot],
            climate: [Climate::Temperate, Climate::Hot, Climate::Cold, Climate::Humid][slot],
            manufacturing_batch: format!(
                "BATCH_{}_{}",
                2020 + i % 2,
                char::from(b'A' + (i % 3) as u8)
            ),
        }
    }

    /// Whole years since the model year, never negative.
    pub fn age_years(&self, current_year: i32) -> i32 {
        (current_year - self.year).max(0)
    }
}

/// A component tracked by the failure predictor.
#[derive(Debug, Clone, Copy)]
pub struct Component {
    pub name: &'static str,
    pub base_failure_rate: f64,
    pub age_factor: f64,
    pub mileage_factor: f64,
    pub usage_factor: f64,
    pub climate_factor: f64,
}

impl Component {
    const fn new(name: &'static str, base_failure_rate: f64) -> Self {
        Self {
            name,
            base_failure_rate,
            age_factor: 0.0,
            mileage_factor: 0.0,
            usage_factor: 0.0,
            climate_factor: 0.0,
        }
    }
}

pub const COMPONENTS: [Component; 7] = [
    Component { mileage_factor: 0.000_008, ..Component::new("Brake Pads", 0.15) },
    Component { age_factor: 0.05, ..Component::new("Battery", 0.12) },
    Component { mileage_factor: 0.000_005, ..Component::new("Alternator", 0.08) },
    Component { usage_factor: 0.03, ..Component::new("Transmission", 0.06) },
    Component { climate_factor: 0.04, ..Component::new("Air Conditioning", 0.10) },
    Component { age_factor: 0.02, ..Component::new("Water Pump", 0.07) },
    Component { mileage_factor: 0.000_003, ..Component::new("Starter Motor", 0.05) },
];

const MAX_FAILURE_PROBABILITY: f64 = 0.95;

/// Weighted failure score for a component, capped at 0.95.
pub fn failure_probability(
    component: &Component,
    mileage: i64,
    age_years: i32,
    usage: UsagePattern,
    climate: Climate,
) -> f64 {
    let total = component.base_failure_rate
        + component.age_factor * f64::from(age_years)
        + component.mileage_factor * mileage as f64
        + component.usage_factor * usage.multiplier()
        + component.climate_factor * climate.multiplier();
    total.min(MAX_FAILURE_PROBABILITY)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn from_probability(p: f64) -> Self {
        if p > 0.7 {
            Self::High
        } else if p > 0.4 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    fn recommended_action(self) -> &'static str {
        match self {
            Self::High => "Immediate inspection required",
            Self::Medium => "Schedule maintenance",
            Self::Low => "Continue monitoring",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FailurePrediction {
    pub component: &'static str,
    pub failure_probability: f64,
    pub confidence_level: f64,
    pub estimated_days_to_failure: i64,
    pub estimated_failure_date: String,
    pub severity: Severity,
    pub recommended_action: &'static str,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    pub date: String,
    pub service_type: String,
    pub cost: i64,
    pub service_center: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage_at_service: Option<i64>,
    pub technician: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

struct ServiceType {
    name: &'static str,
    cost_range: (i64, i64),
}

const SERVICE_TYPES: &[ServiceType] = &[
    ServiceType { name: "Oil Change", cost_range: (40, 80) },
    ServiceType { name: "Brake Inspection", cost_range: (100, 300) },
    ServiceType { name: "Tire Rotation", cost_range: (50, 100) },
    ServiceType { name: "Air Filter Replacement", cost_range: (30, 60) },
    ServiceType { name: "Transmission Service", cost_range: (150, 400) },
    ServiceType { name: "Coolant Flush", cost_range: (80, 150) },
];

/// Simulated maintenance history and prediction API.
pub struct MaintenanceHistoryApi {
    clock: Arc<dyn Clock>,
    added_records: Mutex<HashMap<String, Vec<ServiceRecord>>>,
}

impl Default for MaintenanceHistoryApi {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl MaintenanceHistoryApi {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            added_records: Mutex::new(HashMap::new()),
        }
    }

    fn current_year(&self) -> i32 {
        self.clock.today().year()
    }

    /// Generated service history followed by any records added at runtime.
    pub fn service_history(&self, vehicle_id: &VehicleId, profile: &VehicleProfile) -> Vec<ServiceRecord> {
        let mut rng = rng_for(&format!("{}:get_history", vehicle_id));
        let today = self.clock.today();
        let mut current = today - Duration::days(365 * i64::from(profile.age_years(today.year())));
        let mut history = Vec::new();

        while current <= today {
            for service in SERVICE_TYPES {
                if rng.gen_bool(0.7) {
                    let shop = SERVICE_SHOPS.choose(&mut rng).copied().unwrap_or(SERVICE_SHOPS[0]);
                    history.push(ServiceRecord {
                        record_id: None,
                        vehicle_id: None,
                        date: current.format("%Y-%m-%d").to_string(),
                        service_type: service.name.to_string(),
                        cost: rng.gen_range(service.cost_range.0..=service.cost_range.1),
                        service_center: shop.to_string(),
                        mileage_at_service: Some(profile.mileage - rng.gen_range(0..=5_000)),
                        technician: format!("TECH_{}", rng.gen_range(1001..=1099)),
                        notes: Some(format!(
                            "Routine {} completed successfully",
                            service.name.to_lowercase()
                        )),
                        status: None,
                    });
                }
            }
            current += Duration::days(rng.gen_range(60..=120));
        }

        if let Some(added) = self.added_records.lock().get(vehicle_id.as_str()) {
            history.extend(added.iter().cloned());
        }
        history.sort_by(|a, b| a.date.cmp(&b.date));
        history
    }

    /// Failure predictions, highest probability first.
    pub fn predict_failures(&self, vehicle_id: &VehicleId, profile: &VehicleProfile) -> Vec<FailurePrediction> {
        let mut rng = rng_for(&format!("{}:predict_failures", vehicle_id));
        let today = self.clock.today();
        let age = profile.age_years(today.year());

        let mut predictions: Vec<FailurePrediction> = COMPONENTS
            .iter()
            .map(|component| {
                let p = failure_probability(
                    component,
                    profile.mileage,
                    age,
                    profile.usage_pattern,
                    profile.climate,
                );
                let days = (365.0 * (1.0 - p) * rng.gen_range(0.5..=2.0)) as i64;
                let confidence = (0.85 + rng.gen_range(-0.15_f64..=0.10)).min(0.95);
                let severity = Severity::from_probability(p);
                FailurePrediction {
                    component: component.name,
                    failure_probability: round_to(p, 3),
                    confidence_level: round_to(confidence, 3),
                    estimated_days_to_failure: days,
                    estimated_failure_date: (today + Duration::days(days))
                        .format("%Y-%m-%d")
                        .to_string(),
                    severity,
                    recommended_action: severity.recommended_action(),
                }
            })
            .collect();

        predictions.sort_by(|a, b| b.failure_probability.total_cmp(&a.failure_probability));
        predictions
    }

    fn rca_data(&self, vehicle_id: &VehicleId, profile: &VehicleProfile) -> Value {
        let mut rng = rng_for(&format!("{}:get_rca_data", vehicle_id));
        json!({
            "batch_analysis": {
                "vehicle_batch": profile.manufacturing_batch,
                "total_vehicles_in_batch": rng.gen_range(500..=1500),
                "reported_issues": rng.gen_range(5..=50),
                "defect_rate": round_to(rng.gen_range(0.01..=0.08), 4),
            },
            "failure_patterns": [
                {
                    "issue": "Premature Brake Pad Wear",
                    "affected_batches": ["BATCH_2020_A", "BATCH_2021_A"],
                    "root_cause": "Substandard brake pad material from Supplier ABC",
                    "occurrence_rate": 0.23,
                    "corrective_action": "Switch to Supplier XYZ for brake pad materials"
                },
                {
                    "issue": "Alternator Bearing Failure",
                    "affected_batches": ["BATCH_2020_B"],
                    "root_cause": "Inadequate bearing lubrication during assembly",
                    "occurrence_rate": 0.18,
                    "corrective_action": "Revised assembly procedures and lubrication protocols"
                },
                {
                    "issue": "Transmission Fluid Leak",
                    "affected_batches": ["BATCH_2021_C"],
                    "root_cause": "Defective seal gaskets from manufacturing batch",
                    "occurrence_rate": 0.15,
                    "corrective_action": "Quality inspection enhancement for seal components"
                }
            ],
            "supplier_quality_trends": [
                {"supplier": "ABC Components", "quality_score": 7.2, "trend": "declining"},
                {"supplier": "XYZ Manufacturing", "quality_score": 8.9, "trend": "stable"},
                {"supplier": "DEF Industries", "quality_score": 8.1, "trend": "improving"}
            ],
            "recommended_actions": [
                "Implement enhanced quality controls for Supplier ABC",
                "Increase inspection frequency for BATCH_2020_A components",
                "Develop predictive maintenance program for identified failure patterns"
            ]
        })
    }

    fn pattern_analysis(&self, vehicle_id: &VehicleId, profile: &VehicleProfile) -> Value {
        let mut rng = rng_for(&format!("{}:get_pattern_analysis", vehicle_id));
        // A current-year vehicle still averages over one year.
        let years = profile.age_years(self.current_year()).max(1);
        let avg_daily = profile.mileage as f64 / (f64::from(years) * 365.0);

        json!({
            "usage_statistics": {
                "avg_daily_miles": round_to(avg_daily, 1),
                "driving_pattern": profile.usage_pattern,
                "seasonal_variation": {
                    "spring": rng.gen_range(80..=120),
                    "summer": rng.gen_range(90..=140),
                    "fall": rng.gen_range(70..=110),
                    "winter": rng.gen_range(60..=100),
                }
            },
            "maintenance_adherence": {
                "on_time_services": rng.gen_range(70..=95),
                "overdue_services": rng.gen_range(5..=30),
                "adherence_score": round_to(rng.gen_range(0.75..=0.95), 2),
            },
            "recommended_intervals": {
                "oil_change": format!(
                    "Every {} miles or {} months",
                    rng.gen_range(3000..=5000),
                    rng.gen_range(3..=6)
                ),
                "brake_inspection": format!("Every {} miles", rng.gen_range(10_000..=15_000)),
                "tire_rotation": format!("Every {} miles", rng.gen_range(5000..=8000)),
                "comprehensive_inspection": "Every 12 months",
            },
            "cost_optimization": {
                "potential_annual_savings": rng.gen_range(200..=800),
                "preventive_vs_reactive_ratio": format!(
                    "{}:{}",
                    rng.gen_range(70..=85),
                    rng.gen_range(15..=30)
                ),
            }
        })
    }

    /// Store a new service record for the vehicle.
    fn add_service_record(&self, vehicle_id: &VehicleId, filters: Option<&Value>) -> Result<ServiceRecord> {
        let fields: NewServiceRecord = match filters {
            Some(v) if !v.is_null() => parse_args("add_service_record", v)?,
            _ => NewServiceRecord::default(),
        };
        let now = self.clock.now();

        let mut records = self.added_records.lock();
        let entry = records.entry(vehicle_id.to_string()).or_default();
        let mut rng = rng_for(&format!("{}:add_service_record:{}", vehicle_id, entry.len()));

        let record = ServiceRecord {
            record_id: Some(format!("SVC_{}_{}", vehicle_id, now.format("%Y%m%d_%H%M%S"))),
            vehicle_id: Some(vehicle_id.to_string()),
            date: now.format("%Y-%m-%d").to_string(),
            service_type: fields
                .service_type
                .unwrap_or_else(|| "General Maintenance".to_string()),
            cost: fields.cost.unwrap_or_else(|| rng.gen_range(50..=300)),
            service_center: fields
                .service_center
                .unwrap_or_else(|| "AutoCare Plus".to_string()),
            mileage_at_service: None,
            technician: fields
                .technician
                .unwrap_or_else(|| format!("TECH_{}", rng.gen_range(1001..=1099))),
            notes: None,
            status: Some("Completed".to_string()),
        };
        entry.push(record.clone());

        info!(
            vehicle_id = %vehicle_id,
            record_id = ?record.record_id,
            service_type = %record.service_type,
            "Service record added"
        );
        Ok(record)
    }
}

#[async_trait]
impl Tool for MaintenanceHistoryApi {
    fn name(&self) -> &str {
        "maintenance_history_api"
    }

    fn description(&self) -> &str {
        "Simulates a vehicle maintenance history and failure prediction system: service \
         history, failure predictions, RCA/CAPA data and usage pattern analysis for VEH001-VEH010."
    }

    fn actions(&self) -> &[&'static str] {
        ACTIONS
    }

    fn schemas(&self) -> Value {
        let schema = json!(schemars::schema_for!(MaintenanceInput));
        ACTIONS
            .iter()
            .map(|action| (action.to_string(), schema.clone()))
            .collect::<serde_json::Map<_, _>>()
            .into()
    }

    async fn execute(&self, action: &str, args: &Value) -> Result<Value> {
        if !ACTIONS.contains(&action) {
            return Err(FleetError::unknown_action(action, ACTIONS));
        }
        let input: MaintenanceInput = parse_args(action, args)?;
        let vehicle_id = VehicleId::parse(&input.vehicle_id)?;
        let profile = VehicleProfile::for_vehicle(&vehicle_id);
        let today = self.clock.today().format("%Y-%m-%d").to_string();

        debug!(vehicle_id = %vehicle_id, action, "Maintenance request");

        let result = match action {
            "get_history" => {
                let history = self.service_history(&vehicle_id, &profile);
                let total_cost: i64 = history.iter().map(|r| r.cost).sum();
                json!({
                    "vehicle_id": vehicle_id,
                    "vehicle_info": profile,
                    "total_records": history.len(),
                    "total_maintenance_cost": total_cost,
                    "service_history": history,
                })
            }
            "predict_failures" => {
                let predictions = self.predict_failures(&vehicle_id, &profile);
                let count = |s: Severity| predictions.iter().filter(|p| p.severity == s).count();
                json!({
                    "vehicle_id": vehicle_id,
                    "prediction_date": today,
                    "summary": {
                        "high_risk_components": count(Severity::High),
                        "medium_risk_components": count(Severity::Medium),
                        "low_risk_components": count(Severity::Low),
                    },
                    "failure_predictions": predictions,
                })
            }
            "get_rca_data" => json!({
                "vehicle_id": vehicle_id,
                "analysis_date": today,
                "rca_analysis": self.rca_data(&vehicle_id, &profile),
            }),
            "add_service_record" => {
                let record = self.add_service_record(&vehicle_id, input.filters.as_ref())?;
                json!({
                    "status": "success",
                    "message": "Service record added successfully",
                    "record": record,
                })
            }
            "get_pattern_analysis" => json!({
                "vehicle_id": vehicle_id,
                "analysis_date": today,
                "pattern_analysis": self.pattern_analysis(&vehicle_id, &profile),
            }),
            other => return Err(FleetError::unknown_action(other, ACTIONS)),
        };
        Ok(result)
    }
}
