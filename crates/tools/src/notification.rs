//! Customer notification dispatcher.
//!
//! Ten customers keyed by their vehicle ID, each with per-channel opt-ins.
//! Nothing is actually delivered; sent notifications are recorded so their
//! status can be tracked.

use async_trait::async_trait;
use fleetcare_common::clock::{iso_timestamp, Clock, SystemClock};
use fleetcare_common::traits::parse_args;
use fleetcare_common::{FleetError, Result, Tool};
use parking_lot::Mutex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

const ACTIONS: &[&str] = &[
    "send_notification",
    "get_customer_preferences",
    "update_notification_status",
    "get_notification_history",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Email,
    Sms,
    AppPush,
}

impl FromStr for Channel {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            "app_push" => Ok(Self::AppPush),
            _ => Err(FleetError::invalid(
                "Invalid notification_type. Must be: email, sms, or app_push",
            )),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::AppPush => "app_push",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Delivered,
    Failed,
    Read,
}

impl FromStr for NotificationStatus {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            "failed" => Ok(Self::Failed),
            "read" => Ok(Self::Read),
            _ => Err(FleetError::invalid(
                "Invalid status. Must be one of: pending, sent, delivered, failed, read",
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Preferences {
    pub email: bool,
    pub sms: bool,
    pub app_push: bool,
    pub preferred_time: &'static str,
    pub language: &'static str,
}

impl Preferences {
    pub fn allows(&self, channel: Channel) -> bool {
        match channel {
            Channel::Email => self.email,
            Channel::Sms => self.sms,
            Channel::AppPush => self.app_push,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub id: &'static str,
    pub name: &'static str,
    pub email: &'static str,
    pub phone: &'static str,
    pub preferences: Preferences,
}

macro_rules! customer {
    ($id:literal, $name:literal, $email:literal, $phone:literal,
     [$e:literal, $s:literal, $p:literal], $time:literal, $lang:literal) => {
        Customer {
            id: $id,
            name: $name,
            email: $email,
            phone: $phone,
            preferences: Preferences {
                email: $e,
                sms: $s,
                app_push: $p,
                preferred_time: $time,
                language: $lang,
            },
        }
    };
}

pub static CUSTOMERS: [Customer; 10] = [
    customer!("VEH001", "John Smith", "john.smith@email.com", "+1234567890", [true, true, true], "09:00-17:00", "en"),
    customer!("VEH002", "Sarah Johnson", "sarah.johnson@email.com", "+1234567891", [true, false, true], "10:00-18:00", "en"),
    customer!("VEH003", "Mike Davis", "mike.davis@email.com", "+1234567892", [false, true, true], "08:00-16:00", "en"),
    customer!("VEH004", "Emily Wilson", "emily.wilson@email.com", "+1234567893", [true, true, false], "11:00-19:00", "es"),
    customer!("VEH005", "Robert Brown", "robert.brown@email.com", "+1234567894", [true, true, true], "07:00-15:00", "en"),
    customer!("VEH006", "Lisa Garcia", "lisa.garcia@email.com", "+1234567895", [true, false, true], "12:00-20:00", "es"),
    customer!("VEH007", "David Miller", "david.miller@email.com", "+1234567896", [false, true, true], "06:00-14:00", "en"),
    customer!("VEH008", "Jennifer Taylor", "jennifer.taylor@email.com", "+1234567897", [true, true, true], "13:00-21:00", "fr"),
    customer!("VEH009", "Christopher Anderson", "chris.anderson@email.com", "+1234567898", [true, false, false], "09:00-17:00", "en"),
    customer!("VEH010", "Amanda White", "amanda.white@email.com", "+1234567899", [true, true, true], "14:00-22:00", "de"),
];

pub fn find_customer(id: &str) -> Result<&'static Customer> {
    CUSTOMERS
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| FleetError::not_found(format!("Customer {} not found", id)))
}

#[derive(Debug, Clone, Serialize)]
pub struct Recipient {
    pub email: Option<&'static str>,
    pub phone: Option<&'static str>,
    pub device: Option<&'static str>,
}

impl Recipient {
    fn for_channel(customer: &Customer, channel: Channel) -> Self {
        Self {
            email: (channel == Channel::Email).then_some(customer.email),
            phone: (channel == Channel::Sms).then_some(customer.phone),
            device: (channel == Channel::AppPush).then_some("app"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub notification_id: String,
    pub customer_id: String,
    #[serde(rename = "type")]
    pub channel: Channel,
    pub message: String,
    pub subject: Option<String>,
    pub status: NotificationStatus,
    pub timestamp: String,
    pub recipient: Recipient,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_updated: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SendRequest {
    /// Customer ID (VEH001-VEH010)
    pub customer_id: String,
    /// email, sms or app_push
    pub notification_type: String,
    pub message: String,
    /// Subject line, used for email only
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CustomerQuery {
    pub customer_id: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusUpdate {
    pub notification_id: String,
    /// pending, sent, delivered, failed or read
    pub status: String,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
pub struct HistoryQuery {
    #[serde(default)]
    pub customer_id: Option<String>,
}

#[derive(Debug, Default)]
struct Outbox {
    notifications: Vec<Notification>,
    sequence: u64,
}

/// Simulated multi-channel customer notification API.
pub struct CustomerNotificationApi {
    clock: Arc<dyn Clock>,
    outbox: Mutex<Outbox>,
}

impl Default for CustomerNotificationApi {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl CustomerNotificationApi {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            outbox: Mutex::new(Outbox::default()),
        }
    }

    pub fn send(&self, request: SendRequest) -> Result<Notification> {
        let channel: Channel = request.notification_type.parse()?;
        let customer = find_customer(&request.customer_id)?;
        if !customer.preferences.allows(channel) {
            warn!(customer_id = customer.id, channel = %channel, "Channel disabled by customer");
            return Err(FleetError::invalid(format!(
                "Customer {} has disabled {} notifications",
                customer.id, channel
            )));
        }

        let now = self.clock.now();
        let mut outbox = self.outbox.lock();
        outbox.sequence += 1;
        let notification = Notification {
            notification_id: format!(
                "NOTIF_{}_{}_{}",
                customer.id,
                now.format("%Y%m%d%H%M%S"),
                outbox.sequence
            ),
            customer_id: customer.id.to_string(),
            channel,
            message: request.message,
            subject: request.subject.filter(|_| channel == Channel::Email),
            status: NotificationStatus::Sent,
            timestamp: iso_timestamp(self.clock.as_ref()),
            recipient: Recipient::for_channel(customer, channel),
            status_updated: None,
        };
        outbox.notifications.push(notification.clone());

        info!(
            notification_id = %notification.notification_id,
            customer_id = customer.id,
            channel = %channel,
            "Notification sent"
        );
        Ok(notification)
    }

    /// Set a new status, returning the previous one.
    pub fn update_status(&self, notification_id: &str, status: NotificationStatus) -> Result<(NotificationStatus, String)> {
        let updated_at = iso_timestamp(self.clock.as_ref());
        let mut outbox = self.outbox.lock();
        let notification = outbox
            .notifications
            .iter_mut()
            .find(|n| n.notification_id == notification_id)
            .ok_or_else(|| FleetError::not_found(format!("Notification {} not found", notification_id)))?;

        let old = notification.status;
        notification.status = status;
        notification.status_updated = Some(updated_at.clone());
        info!(notification_id, old = ?old, new = ?status, "Notification status updated");
        Ok((old, updated_at))
    }

    pub fn history(&self, customer_id: Option<&str>) -> Vec<Notification> {
        self.outbox
            .lock()
            .notifications
            .iter()
            .filter(|n| customer_id.map_or(true, |id| n.customer_id == id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Tool for CustomerNotificationApi {
    fn name(&self) -> &str {
        "customer_notification_api"
    }

    fn description(&self) -> &str {
        "Manages customer notifications through email, SMS and app push channels: preferences, \
         notification tracking and status updates for customers VEH001-VEH010."
    }

    fn actions(&self) -> &[&'static str] {
        ACTIONS
    }

    fn schemas(&self) -> Value {
        json!({
            "send_notification": schemars::schema_for!(SendRequest),
            "get_customer_preferences": schemars::schema_for!(CustomerQuery),
            "update_notification_status": schemars::schema_for!(StatusUpdate),
            "get_notification_history": schemars::schema_for!(HistoryQuery),
        })
    }

    async fn execute(&self, action: &str, args: &Value) -> Result<Value> {
        match action {
            "send_notification" => {
                let request: SendRequest = parse_args(action, args)?;
                let notification = self.send(request)?;
                Ok(json!({
                    "success": true,
                    "notification_id": notification.notification_id,
                    "customer_id": notification.customer_id,
                    "type": notification.channel,
                    "status": notification.status,
                    "timestamp": notification.timestamp,
                    "message": "Notification sent successfully",
                }))
            }
            "get_customer_preferences" => {
                let query: CustomerQuery = parse_args(action, args)?;
                let customer = find_customer(&query.customer_id)?;
                debug!(customer_id = customer.id, "Preferences lookup");
                Ok(json!({
                    "success": true,
                    "customer_id": customer.id,
                    "customer_name": customer.name,
                    "contact_info": {"email": customer.email, "phone": customer.phone},
                    "preferences": customer.preferences,
                    "total_notifications": self.history(Some(customer.id)).len(),
                }))
            }
            "update_notification_status" => {
                let update: StatusUpdate = parse_args(action, args)?;
                let status: NotificationStatus = update.status.parse()?;
                let (old, updated_at) = self.update_status(&update.notification_id, status)?;
                Ok(json!({
                    "success": true,
                    "notification_id": update.notification_id,
                    "old_status": old,
                    "new_status": status,
                    "updated_at": updated_at,
                    "message": "Notification status updated successfully",
                }))
            }
            "get_notification_history" => {
                let query: HistoryQuery = parse_args(action, args)?;
                if let Some(id) = query.customer_id.as_deref() {
                    find_customer(id)?;
                }
                let notifications = self.history(query.customer_id.as_deref());
                Ok(json!({
                    "success": true,
                    "total_notifications": notifications.len(),
                    "notifications": notifications,
                }))
            }
            other => Err(FleetError::unknown_action(other, ACTIONS)),
        }
    }
}
