//! The tool contract shared by every simulated external API.
//!
//! A tool receives an action name plus a JSON argument object and always
//! answers with a JSON payload. Operations are written against
//! [`Result`](crate::Result); [`Tool::invoke`] is the boundary where a
//! [`FleetError`] is folded into an error payload so callers never see a
//! failure they have to handle out of band.

use crate::{FleetError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

/// A request addressed to a single tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    /// Operation to run (e.g. `book_appointment`)
    pub action: String,

    /// Operation arguments, an object or null
    #[serde(default)]
    pub args: Value,
}

impl ToolRequest {
    pub fn new(action: impl Into<String>, args: Value) -> Self {
        Self {
            action: action.into(),
            args,
        }
    }
}

/// Summary of a tool for discovery endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub actions: Vec<&'static str>,
    pub schemas: Value,
}

/// A simulated external API.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Wire name used for routing.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Names of the supported actions.
    fn actions(&self) -> &[&'static str];

    /// JSON Schemas of the argument object, keyed by action.
    fn schemas(&self) -> Value {
        Value::Object(Default::default())
    }

    /// Run one action.
    async fn execute(&self, action: &str, args: &Value) -> Result<Value>;

    /// Run one action and fold any error into a payload.
    async fn invoke(&self, request: &ToolRequest) -> Value {
        match self.execute(&request.action, &request.args).await {
            Ok(value) => value,
            Err(e) => {
                warn!(tool = %self.name(), action = %request.action, error = %e, "Tool action failed");
                error_payload(&e)
            }
        }
    }

    fn info(&self) -> ToolInfo {
        ToolInfo {
            name: self.name().to_string(),
            description: self.description().to_string(),
            actions: self.actions().to_vec(),
            schemas: self.schemas(),
        }
    }
}

/// Render an error as the standard `{success: false, error}` payload.
pub fn error_payload(error: &FleetError) -> Value {
    let mut payload = json!({
        "success": false,
        "error": error.to_string(),
    });
    if let FleetError::UnknownAction { valid, .. } = error {
        payload["valid_actions"] = json!(valid);
    }
    payload
}

/// Deserialize an action's argument object.
///
/// `null` is treated as an empty object so actions whose fields are all
/// optional can be called without arguments.
pub fn parse_args<T: DeserializeOwned>(action: &str, args: &Value) -> Result<T> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args.clone()
    };
    serde_json::from_value(args)
        .map_err(|e| FleetError::invalid(format!("Invalid arguments for {}: {}", action, e)))
}
