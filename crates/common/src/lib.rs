//! Common types and traits shared across FleetCare crates.
//!
//! This crate provides the tool contract, the error type, and the small
//! primitives (clock, vehicle IDs) every simulated API builds on.

pub mod clock;
pub mod error;
pub mod traits;
pub mod vehicle;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{FleetError, Result};
pub use traits::{Tool, ToolInfo, ToolRequest};
pub use vehicle::VehicleId;
