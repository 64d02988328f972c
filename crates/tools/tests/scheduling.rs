//! End-to-end scheduling and notification flows through the tool contract.

use fleetcare_common::{FixedClock, ToolRequest};
use fleetcare_tools::ToolRegistry;
use serde_json::{json, Value};
use std::sync::Arc;

fn registry() -> ToolRegistry {
    ToolRegistry::standard(Arc::new(FixedClock::on(2025, 6, 15).unwrap()), None)
}

async fn call(registry: &ToolRegistry, tool: &str, action: &str, args: Value) -> Value {
    registry
        .invoke(tool, &ToolRequest::new(action, args))
        .await
        .unwrap()
}

fn booking(customer: &str) -> Value {
    json!({
        "service_center_id": "chennai",
        "date": "2025-06-18",
        "time": "14:00",
        "service_type": "brake_service",
        "customer_name": customer,
        "customer_phone": "+91-44-0000-0000"
    })
}

// ============================================================================
// Capacity
// ============================================================================

#[tokio::test]
async fn test_capacity_is_enforced_and_freed_by_cancellation() {
    let registry = registry();
    let mut ids = Vec::new();
    for i in 0..12 {
        let booked = call(&registry, "service_center_api", "book_appointment", booking(&format!("Customer {i}"))).await;
        assert_eq!(booked["success"], true, "booking {i} failed: {booked}");
        ids.push(booked["appointment_id"].as_str().unwrap().to_string());
    }
    assert_eq!(ids.first().map(String::as_str), Some("APP1000"));
    assert_eq!(ids.last().map(String::as_str), Some("APP1011"));

    let full = call(&registry, "service_center_api", "book_appointment", booking("Late")).await;
    assert_eq!(full["success"], false);
    assert_eq!(full["error"], "Service center is fully booked on 2025-06-18");

    let cancelled = call(&registry, "service_center_api", "cancel_appointment", json!({"appointment_id": ids[3]})).await;
    assert_eq!(cancelled["success"], true);
    assert_eq!(cancelled["appointment"]["status"], "cancelled");

    let again = call(&registry, "service_center_api", "cancel_appointment", json!({"appointment_id": ids[3]})).await;
    assert_eq!(again["success"], false);
    assert_eq!(again["error"], "Appointment is already cancelled");

    let check = call(
        &registry,
        "service_center_api",
        "check_availability",
        json!({"service_center_id": "chennai", "date": "2025-06-18", "time": "09:30", "service_type": "brake_service"}),
    )
    .await;
    assert_eq!(check["available"], true);
    assert_eq!(check["capacity_remaining"], 1);

    let rebooked = call(&registry, "service_center_api", "book_appointment", booking("Late")).await;
    assert_eq!(rebooked["appointment_id"], "APP1012");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_bookings_never_exceed_capacity() {
    let registry = Arc::new(registry());
    let mut handles = Vec::new();
    for i in 0..30 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            call(&registry, "service_center_api", "book_appointment", booking(&format!("Racer {i}"))).await
        }));
    }

    let mut confirmed = 0;
    for handle in handles {
        if handle.await.unwrap()["success"] == true {
            confirmed += 1;
        }
    }
    assert_eq!(confirmed, 12);

    let listed = call(&registry, "service_center_api", "get_appointments", json!({"service_center_id": "chennai"})).await;
    assert_eq!(listed["total_appointments"], 12);
}

// ============================================================================
// Workflow
// ============================================================================

#[tokio::test]
async fn test_fault_to_booking_to_notification() {
    let registry = registry();

    let telemetry = call(&registry, "vehicle_telematics_api", "get_telemetry", json!({"vehicle_id": "VEH008"})).await;
    assert!(!telemetry["diagnostic_codes"].as_array().unwrap().is_empty());

    let predictions = call(&registry, "maintenance_history_api", "predict_failures", json!({"vehicle_id": "VEH008"})).await;
    let top = &predictions["failure_predictions"][0];
    assert!(top["failure_probability"].as_f64().unwrap() > 0.0);

    let booked = call(
        &registry,
        "service_center_api",
        "book_appointment",
        json!({
            "service_center_id": "delhi",
            "date": "2025-06-15",
            "time": "11:00",
            "service_type": "engine_diagnostics",
            "customer_name": "Jennifer Taylor",
            "customer_phone": "+1234567897"
        }),
    )
    .await;
    assert_eq!(booked["success"], true);

    let notified = call(
        &registry,
        "customer_notification_api",
        "send_notification",
        json!({
            "customer_id": "VEH008",
            "notification_type": "sms",
            "message": format!("Appointment {} confirmed", booked["appointment_id"].as_str().unwrap())
        }),
    )
    .await;
    assert_eq!(notified["success"], true);
    assert!(notified["notification_id"].as_str().unwrap().starts_with("NOTIF_VEH008_20250615120000_"));
}
