//! Service center catalog and appointment book.
//!
//! Five centers with fixed opening hours and daily capacity. Appointments live
//! in memory for the process lifetime; only confirmed ones count toward a
//! center's capacity for a date.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use fleetcare_common::clock::{iso_timestamp, Clock, SystemClock};
use fleetcare_common::traits::parse_args;
use fleetcare_common::{FleetError, Result, Tool};
use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

const ACTIONS: &[&str] = &[
    "check_availability",
    "book_appointment",
    "get_service_centers",
    "cancel_appointment",
    "get_appointments",
];

const FIRST_APPOINTMENT_ID: u32 = 1000;

/// Opening hours per weekday, `HH:MM-HH:MM` or `closed`.
#[derive(Debug, Clone, Serialize)]
pub struct WorkingHours {
    pub monday: &'static str,
    pub tuesday: &'static str,
    pub wednesday: &'static str,
    pub thursday: &'static str,
    pub friday: &'static str,
    pub saturday: &'static str,
    pub sunday: &'static str,
}

impl WorkingHours {
    const fn weekly(weekday: &'static str, saturday: &'static str, sunday: &'static str) -> Self {
        Self {
            monday: weekday,
            tuesday: weekday,
            wednesday: weekday,
            thursday: weekday,
            friday: weekday,
            saturday,
            sunday,
        }
    }

    pub fn on(&self, day: Weekday) -> &'static str {
        match day {
            Weekday::Mon => self.monday,
            Weekday::Tue => self.tuesday,
            Weekday::Wed => self.wednesday,
            Weekday::Thu => self.thursday,
            Weekday::Fri => self.friday,
            Weekday::Sat => self.saturday,
            Weekday::Sun => self.sunday,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceCenter {
    pub id: &'static str,
    pub name: &'static str,
    pub address: &'static str,
    pub city: &'static str,
    pub state: &'static str,
    pub phone: &'static str,
    pub email: &'static str,
    pub working_hours: WorkingHours,
    pub services: &'static [&'static str],
    pub capacity: usize,
    pub manager: &'static str,
}

pub static SERVICE_CENTERS: [ServiceCenter; 5] = [
    ServiceCenter {
        id: "mumbai",
        name: "Mumbai Service Center",
        address: "Plot No. 123, Andheri East, Mumbai, Maharashtra 400069",
        city: "Mumbai",
        state: "Maharashtra",
        phone: "+91-22-2834-5678",
        email: "mumbai@servicecenters.in",
        working_hours: WorkingHours::weekly("09:00-18:00", "09:00-16:00", "closed"),
        services: &[
            "oil_change",
            "brake_service",
            "tire_replacement",
            "battery_check",
            "general_inspection",
            "ac_service",
            "engine_diagnostics",
            "suspension_service",
        ],
        capacity: 15,
        manager: "Rajesh Sharma",
    },
    ServiceCenter {
        id: "delhi",
        name: "Delhi Service Center",
        address: "Sector 18, Noida, Uttar Pradesh 201301",
        city: "Delhi",
        state: "Delhi",
        phone: "+91-11-4567-8901",
        email: "delhi@servicecenters.in",
        working_hours: WorkingHours::weekly("08:30-19:00", "08:30-17:00", "10:00-15:00"),
        services: &[
            "oil_change",
            "brake_service",
            "tire_replacement",
            "battery_check",
            "general_inspection",
            "ac_service",
            "engine_diagnostics",
            "transmission_service",
            "electrical_work",
        ],
        capacity: 20,
        manager: "Priya Gupta",
    },
    ServiceCenter {
        id: "bangalore",
        name: "Bangalore Service Center",
        address: "Electronic City Phase 2, Bangalore, Karnataka 560100",
        city: "Bangalore",
        state: "Karnataka",
        phone: "+91-80-1234-5678",
        email: "bangalore@servicecenters.in",
        working_hours: WorkingHours::weekly("09:00-18:30", "09:00-17:00", "closed"),
        services: &[
            "oil_change",
            "brake_service",
            "tire_replacement",
            "battery_check",
            "general_inspection",
            "ac_service",
            "engine_diagnostics",
            "hybrid_service",
            "software_updates",
        ],
        capacity: 18,
        manager: "Venkat Reddy",
    },
    ServiceCenter {
        id: "chennai",
        name: "Chennai Service Center",
        address: "OMR Road, Thoraipakkam, Chennai, Tamil Nadu 600097",
        city: "Chennai",
        state: "Tamil Nadu",
        phone: "+91-44-9876-5432",
        email: "chennai@servicecenters.in",
        working_hours: WorkingHours::weekly("09:00-18:00", "09:00-16:00", "10:00-14:00"),
        services: &[
            "oil_change",
            "brake_service",
            "tire_replacement",
            "battery_check",
            "general_inspection",
            "ac_service",
            "engine_diagnostics",
            "paint_service",
            "denting_service",
        ],
        capacity: 12,
        manager: "Lakshmi Iyer",
    },
    ServiceCenter {
        id: "hyderabad",
        name: "Hyderabad Service Center",
        address: "Gachibowli, Hyderabad, Telangana 500032",
        city: "Hyderabad",
        state: "Telangana",
        phone: "+91-40-5555-1234",
        email: "hyderabad@servicecenters.in",
        working_hours: WorkingHours::weekly("09:00-19:00", "09:00-17:00", "closed"),
        services: &[
            "oil_change",
            "brake_service",
            "tire_replacement",
            "battery_check",
            "general_inspection",
            "ac_service",
            "engine_diagnostics",
            "wheel_alignment",
            "clutch_service",
        ],
        capacity: 16,
        manager: "Arjun Rao",
    },
];

pub fn find_center(id: &str) -> Option<&'static ServiceCenter> {
    SERVICE_CENTERS.iter().find(|c| c.id == id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct Appointment {
    pub id: String,
    pub service_center_id: String,
    pub service_center_name: String,
    pub date: String,
    pub time: String,
    pub service_type: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub status: AppointmentStatus,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<String>,
}

/// A slot request: center, date, time and service.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SlotRequest {
    /// Service center ID (mumbai, delhi, bangalore, chennai, hyderabad)
    pub service_center_id: String,
    /// Date in YYYY-MM-DD format
    pub date: String,
    /// Time in HH:MM format
    pub time: String,
    /// Service type (e.g. oil_change, brake_service)
    pub service_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BookingRequest {
    #[serde(flatten)]
    pub slot: SlotRequest,
    pub customer_name: String,
    pub customer_phone: String,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct CenterQuery {
    #[serde(default)]
    pub service_center_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CancelRequest {
    pub appointment_id: String,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct AppointmentQuery {
    #[serde(default)]
    pub appointment_id: Option<String>,
    #[serde(default)]
    pub service_center_id: Option<String>,
}

/// Outcome of an availability check.
#[derive(Debug, Clone)]
pub enum Availability {
    Open {
        center: &'static ServiceCenter,
        capacity_remaining: usize,
    },
    Unavailable(String),
}

#[derive(Debug)]
struct AppointmentBook {
    appointments: Vec<Appointment>,
    next_id: u32,
}

impl AppointmentBook {
    fn new() -> Self {
        Self {
            appointments: Vec::new(),
            next_id: FIRST_APPOINTMENT_ID,
        }
    }

    fn confirmed_on(&self, center_id: &str, date: &str) -> usize {
        self.appointments
            .iter()
            .filter(|a| {
                a.service_center_id == center_id
                    && a.date == date
                    && a.status == AppointmentStatus::Confirmed
            })
            .count()
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Appointment> {
        self.appointments.iter_mut().find(|a| a.id == id)
    }

    fn check(&self, slot: &SlotRequest) -> Availability {
        let Some(center) = find_center(&slot.service_center_id) else {
            return Availability::Unavailable(format!(
                "Service center '{}' not found",
                slot.service_center_id
            ));
        };
        if !center.services.contains(&slot.service_type.as_str()) {
            return Availability::Unavailable(format!(
                "Service '{}' not available at {}",
                slot.service_type, center.name
            ));
        }

        let date = match NaiveDate::parse_from_str(&slot.date, "%Y-%m-%d") {
            Ok(d) => d,
            Err(e) => return Availability::Unavailable(format!("Invalid date or time format: {}", e)),
        };
        let hours = center.working_hours.on(date.weekday());
        let Some((open, close)) = parse_hours(hours) else {
            return Availability::Unavailable(format!(
                "{} is closed on {}",
                center.name,
                weekday_name(date.weekday())
            ));
        };
        let time = match NaiveTime::parse_from_str(&slot.time, "%H:%M") {
            Ok(t) => t,
            Err(e) => return Availability::Unavailable(format!("Invalid date or time format: {}", e)),
        };
        if time < open || time > close {
            return Availability::Unavailable(format!(
                "Requested time {} is outside working hours ({})",
                slot.time, hours
            ));
        }

        let booked = self.confirmed_on(center.id, &slot.date);
        if booked >= center.capacity {
            return Availability::Unavailable(format!(
                "Service center is fully booked on {}",
                slot.date
            ));
        }
        Availability::Open {
            center,
            capacity_remaining: center.capacity - booked,
        }
    }
}

fn parse_hours(hours: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (open, close) = hours.split_once('-')?;
    Some((
        NaiveTime::parse_from_str(open, "%H:%M").ok()?,
        NaiveTime::parse_from_str(close, "%H:%M").ok()?,
    ))
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Simulated service center management API.
pub struct ServiceCenterApi {
    clock: Arc<dyn Clock>,
    book: Mutex<AppointmentBook>,
}

impl Default for ServiceCenterApi {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl ServiceCenterApi {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            book: Mutex::new(AppointmentBook::new()),
        }
    }

    pub fn check_availability(&self, slot: &SlotRequest) -> Availability {
        self.book.lock().check(slot)
    }

    /// Validate the slot and store a confirmed appointment under one lock.
    pub fn book(&self, request: BookingRequest) -> Result<Appointment> {
        let mut book = self.book.lock();
        let center = match book.check(&request.slot) {
            Availability::Open { center, .. } => center,
            Availability::Unavailable(reason) => {
                warn!(
                    service_center_id = %request.slot.service_center_id,
                    date = %request.slot.date,
                    reason = %reason,
                    "Booking rejected"
                );
                return Err(FleetError::Conflict(reason));
            }
        };

        let id = format!("APP{}", book.next_id);
        book.next_id += 1;
        let appointment = Appointment {
            id,
            service_center_id: center.id.to_string(),
            service_center_name: center.name.to_string(),
            date: request.slot.date,
            time: request.slot.time,
            service_type: request.slot.service_type,
            customer_name: request.customer_name,
            customer_phone: request.customer_phone,
            status: AppointmentStatus::Confirmed,
            created_at: iso_timestamp(self.clock.as_ref()),
            cancelled_at: None,
        };
        book.appointments.push(appointment.clone());

        info!(
            appointment_id = %appointment.id,
            service_center_id = %appointment.service_center_id,
            date = %appointment.date,
            "Appointment booked"
        );
        Ok(appointment)
    }

    pub fn cancel(&self, appointment_id: &str) -> Result<Appointment> {
        let mut book = self.book.lock();
        let appointment = book
            .get_mut(appointment_id)
            .ok_or_else(|| FleetError::not_found(format!("Appointment '{}' not found", appointment_id)))?;
        if appointment.status == AppointmentStatus::Cancelled {
            return Err(FleetError::Conflict("Appointment is already cancelled".to_string()));
        }
        appointment.status = AppointmentStatus::Cancelled;
        appointment.cancelled_at = Some(iso_timestamp(self.clock.as_ref()));

        info!(appointment_id, "Appointment cancelled");
        Ok(appointment.clone())
    }

    pub fn appointments(&self, service_center_id: Option<&str>) -> Vec<Appointment> {
        self.book
            .lock()
            .appointments
            .iter()
            .filter(|a| service_center_id.map_or(true, |id| a.service_center_id == id))
            .cloned()
            .collect()
    }

    fn appointment(&self, appointment_id: &str) -> Result<Appointment> {
        self.book
            .lock()
            .appointments
            .iter()
            .find(|a| a.id == appointment_id)
            .cloned()
            .ok_or_else(|| FleetError::not_found(format!("Appointment '{}' not found", appointment_id)))
    }
}

#[async_trait]
impl Tool for ServiceCenterApi {
    fn name(&self) -> &str {
        "service_center_api"
    }

    fn description(&self) -> &str {
        "Service center management API for Indian locations: check availability, book and \
         cancel appointments, and look up centers in Mumbai, Delhi, Bangalore, Chennai and Hyderabad."
    }

    fn actions(&self) -> &[&'static str] {
        ACTIONS
    }

    fn schemas(&self) -> Value {
        json!({
            "check_availability": schemars::schema_for!(SlotRequest),
            "book_appointment": schemars::schema_for!(BookingRequest),
            "get_service_centers": schemars::schema_for!(CenterQuery),
            "cancel_appointment": schemars::schema_for!(CancelRequest),
            "get_appointments": schemars::schema_for!(AppointmentQuery),
        })
    }

    async fn execute(&self, action: &str, args: &Value) -> Result<Value> {
        match action {
            "check_availability" => {
                let slot: SlotRequest = parse_args(action, args)?;
                debug!(service_center_id = %slot.service_center_id, date = %slot.date, "Checking availability");
                Ok(match self.check_availability(&slot) {
                    Availability::Open {
                        center,
                        capacity_remaining,
                    } => json!({
                        "available": true,
                        "service_center": center.name,
                        "date": slot.date,
                        "time": slot.time,
                        "service_type": slot.service_type,
                        "capacity_remaining": capacity_remaining,
                    }),
                    Availability::Unavailable(reason) => json!({
                        "available": false,
                        "error": reason,
                    }),
                })
            }
            "book_appointment" => {
                let request: BookingRequest = parse_args(action, args)?;
                let appointment = self.book(request)?;
                Ok(json!({
                    "success": true,
                    "appointment_id": appointment.id,
                    "message": format!("Appointment booked successfully at {}", appointment.service_center_name),
                    "appointment": appointment,
                }))
            }
            "get_service_centers" => {
                let query: CenterQuery = parse_args(action, args)?;
                match query.service_center_id.as_deref() {
                    Some(id) => {
                        let center = find_center(id)
                            .ok_or_else(|| FleetError::not_found(format!("Service center '{}' not found", id)))?;
                        Ok(json!({"success": true, "service_center": center}))
                    }
                    None => {
                        let mut centers = serde_json::Map::new();
                        for center in &SERVICE_CENTERS {
                            centers.insert(center.id.to_string(), serde_json::to_value(center)?);
                        }
                        Ok(json!({
                            "success": true,
                            "total_centers": centers.len(),
                            "service_centers": centers,
                        }))
                    }
                }
            }
            "cancel_appointment" => {
                let request: CancelRequest = parse_args(action, args)?;
                let appointment = self.cancel(&request.appointment_id)?;
                Ok(json!({
                    "success": true,
                    "message": format!("Appointment {} cancelled successfully", appointment.id),
                    "appointment": appointment,
                }))
            }
            "get_appointments" => {
                let query: AppointmentQuery = parse_args(action, args)?;
                if let Some(id) = query.appointment_id.as_deref() {
                    return Ok(json!({"success": true, "appointment": self.appointment(id)?}));
                }
                let appointments = self.appointments(query.service_center_id.as_deref());
                Ok(json!({
                    "success": true,
                    "total_appointments": appointments.len(),
                    "appointments": appointments,
                }))
            }
            other => Err(FleetError::unknown_action(other, ACTIONS)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetcare_common::FixedClock;

    fn api() -> ServiceCenterApi {
        ServiceCenterApi::new(Arc::new(FixedClock::on(2025, 6, 15).unwrap()))
    }

    // 2025-06-16 is a Monday, 2025-06-15 a Sunday.
    fn slot(center: &str, date: &str, time: &str) -> SlotRequest {
        SlotRequest {
            service_center_id: center.to_string(),
            date: date.to_string(),
            time: time.to_string(),
            service_type: "oil_change".to_string(),
        }
    }

    fn booking(center: &str, date: &str) -> BookingRequest {
        BookingRequest {
            slot: slot(center, date, "10:00"),
            customer_name: "Asha Patel".to_string(),
            customer_phone: "+91-98765-43210".to_string(),
        }
    }

    fn reason(availability: Availability) -> String {
        match availability {
            Availability::Unavailable(reason) => reason,
            Availability::Open { .. } => panic!("expected the slot to be unavailable"),
        }
    }

    #[test]
    fn test_open_slot_reports_capacity() {
        match api().check_availability(&slot("mumbai", "2025-06-16", "09:00")) {
            Availability::Open {
                center,
                capacity_remaining,
            } => {
                assert_eq!(center.id, "mumbai");
                assert_eq!(capacity_remaining, 15);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_closed_day_and_hours() {
        let api = api();
        assert_eq!(
            reason(api.check_availability(&slot("mumbai", "2025-06-15", "10:00"))),
            "Mumbai Service Center is closed on Sunday"
        );
        assert!(reason(api.check_availability(&slot("mumbai", "2025-06-16", "18:01")))
            .contains("outside working hours (09:00-18:00)"));
        // Closing time itself is bookable.
        assert!(matches!(
            api.check_availability(&slot("mumbai", "2025-06-16", "18:00")),
            Availability::Open { .. }
        ));
        assert!(matches!(
            api.check_availability(&slot("delhi", "2025-06-15", "10:00")),
            Availability::Open { .. }
        ));
    }

    #[test]
    fn test_rejects_unknown_center_service_and_formats() {
        let api = api();
        assert!(reason(api.check_availability(&slot("pune", "2025-06-16", "10:00"))).contains("not found"));

        let mut s = slot("mumbai", "2025-06-16", "10:00");
        s.service_type = "hybrid_service".to_string();
        assert!(reason(api.check_availability(&s)).contains("not available at Mumbai Service Center"));

        assert!(reason(api.check_availability(&slot("mumbai", "16/06/2025", "10:00")))
            .starts_with("Invalid date or time format"));
        assert!(reason(api.check_availability(&slot("mumbai", "2025-06-16", "10am")))
            .starts_with("Invalid date or time format"));
    }

    #[test]
    fn test_ids_increment_from_1000() {
        let api = api();
        let first = api.book(booking("delhi", "2025-06-16")).unwrap();
        let second = api.book(booking("delhi", "2025-06-17")).unwrap();
        assert_eq!(first.id, "APP1000");
        assert_eq!(second.id, "APP1001");
        assert_eq!(first.status, AppointmentStatus::Confirmed);
        assert_eq!(first.created_at, "2025-06-15T12:00:00.000000");
    }

    #[test]
    fn test_booking_at_capacity_fails() {
        let api = api();
        for _ in 0..12 {
            api.book(booking("chennai", "2025-06-16")).unwrap();
        }
        let err = api.book(booking("chennai", "2025-06-16")).unwrap_err();
        assert_eq!(err.to_string(), "Service center is fully booked on 2025-06-16");
        // Another date is unaffected.
        assert!(api.book(booking("chennai", "2025-06-17")).is_ok());
    }

    #[test]
    fn test_cancel_frees_slot() {
        let api = api();
        let mut last = None;
        for _ in 0..12 {
            last = Some(api.book(booking("chennai", "2025-06-16")).unwrap());
        }
        assert!(matches!(
            api.check_availability(&slot("chennai", "2025-06-16", "10:00")),
            Availability::Unavailable(_)
        ));

        let cancelled = api.cancel(&last.unwrap().id).unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);
        assert!(cancelled.cancelled_at.is_some());

        match api.check_availability(&slot("chennai", "2025-06-16", "10:00")) {
            Availability::Open { capacity_remaining, .. } => assert_eq!(capacity_remaining, 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_cancel_twice_and_unknown() {
        let api = api();
        let appointment = api.book(booking("hyderabad", "2025-06-16")).unwrap();
        api.cancel(&appointment.id).unwrap();
        let err = api.cancel(&appointment.id).unwrap_err();
        assert_eq!(err.to_string(), "Appointment is already cancelled");

        let err = api.cancel("APP9999").unwrap_err();
        assert!(matches!(err, FleetError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_dispatch_payloads() {
        let api = api();
        let centers = api.execute("get_service_centers", &Value::Null).await.unwrap();
        assert_eq!(centers["total_centers"], 5);
        assert_eq!(centers["service_centers"]["bangalore"]["capacity"], 18);
        assert_eq!(centers["service_centers"]["mumbai"]["working_hours"]["sunday"], "closed");

        let booked = api
            .execute(
                "book_appointment",
                &json!({
                    "service_center_id": "bangalore",
                    "date": "2025-06-16",
                    "time": "11:30",
                    "service_type": "hybrid_service",
                    "customer_name": "Ravi Kumar",
                    "customer_phone": "+91-90000-00001"
                }),
            )
            .await
            .unwrap();
        assert_eq!(booked["success"], true);
        assert_eq!(booked["appointment"]["status"], "confirmed");

        let listed = api
            .execute("get_appointments", &json!({"service_center_id": "bangalore"}))
            .await
            .unwrap();
        assert_eq!(listed["total_appointments"], 1);

        let one = api
            .execute("get_appointments", &json!({"appointment_id": booked["appointment_id"]}))
            .await
            .unwrap();
        assert_eq!(one["appointment"]["customer_name"], "Ravi Kumar");
    }

    #[tokio::test]
    async fn test_missing_booking_fields_are_rejected() {
        let response = api()
            .invoke(&fleetcare_common::ToolRequest::new(
                "book_appointment",
                json!({"service_center_id": "delhi", "date": "2025-06-16", "time": "10:00", "service_type": "oil_change"}),
            ))
            .await;
        assert_eq!(response["success"], false);
        assert!(response["error"].as_str().unwrap().contains("customer_name"));
    }
}
