//! Error types for the stock watch agent

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Core Pipeline Errors
    // =============================

    /// Bad user input, rejected before a session starts
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error("Quote provider error: {0}")]
    Quote(String),

    #[error("State persistence error: {0}")]
    State(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// LLM call failed after every retry was spent
#[derive(Error, Debug, Clone, PartialEq)]
#[error("LLM request failed after {attempts} attempt(s): {message}")]
pub struct TransportError {
    pub attempts: u32,
    pub message: String,
}

/// Failure raised by a catalog action
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Missing argument '{argument}' for {action}")]
    MissingArgument { action: String, argument: String },

    #[error("Invalid argument for {action}: {detail}")]
    InvalidArgument { action: String, detail: String },

    #[error("{action} failed: {detail}")]
    UpstreamFailure { action: String, detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionErrorKind {
    UnknownAction,
    MissingArgument,
    InvalidArgument,
    UpstreamFailure,
}

impl ActionError {
    pub fn kind(&self) -> ActionErrorKind {
        match self {
            ActionError::UnknownAction(_) => ActionErrorKind::UnknownAction,
            ActionError::MissingArgument { .. } => ActionErrorKind::MissingArgument,
            ActionError::InvalidArgument { .. } => ActionErrorKind::InvalidArgument,
            ActionError::UpstreamFailure { .. } => ActionErrorKind::UpstreamFailure,
        }
    }

    pub fn missing(action: &str, argument: &str) -> Self {
        ActionError::MissingArgument {
            action: action.to_string(),
            argument: argument.to_string(),
        }
    }

    pub fn invalid(action: &str, detail: impl Into<String>) -> Self {
        ActionError::InvalidArgument {
            action: action.to_string(),
            detail: detail.into(),
        }
    }

    pub fn upstream(action: &str, detail: impl Into<String>) -> Self {
        ActionError::UpstreamFailure {
            action: action.to_string(),
            detail: detail.into(),
        }
    }
}
