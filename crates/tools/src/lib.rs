//! Simulated fleet-maintenance APIs.
//!
//! Each module implements one [`Tool`](fleetcare_common::Tool): telematics,
//! maintenance history and prediction, service center booking, EV routing,
//! customer notifications and agent security monitoring. Generated data is
//! seeded so repeated calls for the same vehicle or trip agree.

pub mod maintenance;
pub mod notification;
pub mod registry;
pub mod route;
pub mod security;
pub mod seed;
pub mod service_center;
pub mod telematics;

pub use maintenance::MaintenanceHistoryApi;
pub use notification::CustomerNotificationApi;
pub use registry::ToolRegistry;
pub use route::{RetryConfig, RouteOptimizer, RouteProxyConfig};
pub use security::SecurityMonitor;
pub use service_center::ServiceCenterApi;
pub use telematics::VehicleTelematicsApi;
