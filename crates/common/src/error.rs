//! Error types for FleetCare tools.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Unknown action: {action}. Valid actions are: {}", .valid.join(", "))]
    UnknownAction {
        action: String,
        valid: Vec<&'static str>,
    },

    /// The upstream could not be reached or its response could not be read.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The upstream answered with a non-success HTTP status.
    #[error("Upstream error: HTTP {status}: {body}")]
    UpstreamStatus {
        status: u16,
        retry_after_secs: Option<u64>,
        body: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FleetError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unknown_action(action: impl Into<String>, valid: &[&'static str]) -> Self {
        Self::UnknownAction {
            action: action.into(),
            valid: valid.to_vec(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FleetError>;
