//! Errors raised by flow code.

use thiserror::Error;

/// Failure inside an application flow.
///
/// The engine logs these, shows the error page and leaves the continuation
/// that was being resumed in place so the same token can be retried.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Missing required input '{0}'")]
    MissingInput(String),

    #[error("Invalid input '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    /// Frozen state or an attribute could not be converted
    #[error("State codec failed: {0}")]
    StateCodec(String),

    #[error("{0}")]
    Failed(String),
}

impl FlowError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(error: serde_json::Error) -> Self {
        Self::StateCodec(error.to_string())
    }
}
