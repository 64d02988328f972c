//! Vehicle identifiers.

use crate::{FleetError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated vehicle ID of the form `VEH` followed by digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VehicleId(String);

impl VehicleId {
    pub fn parse(raw: &str) -> Result<Self> {
        let digits = raw.strip_prefix("VEH").unwrap_or("");
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FleetError::invalid(
                "Invalid vehicle_id format. Use VEH001-VEH010",
            ));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fleet number taken from the last three characters, or 1 when they
    /// are not all digits (e.g. `VEH7`).
    pub fn number(&self) -> u32 {
        let tail = self.0.len().checked_sub(3).map(|start| &self.0[start..]);
        match tail {
            Some(t) if t.bytes().all(|b| b.is_ascii_digit()) => t.parse().unwrap_or(1),
            _ => 1,
        }
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VehicleId {
    type Error = FleetError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VehicleId> for String {
    fn from(id: VehicleId) -> Self {
        id.0
    }
}
