//! Engine error types.

use crate::core::ContinuationToken;
use crate::flow::FlowError;
use crate::store::StoreError;
use thiserror::Error;

/// Errors returned by the flow runner
#[derive(Debug, Error)]
pub enum EngineError {
    /// No flow is registered under this name
    #[error("Unknown flow '{0}'")]
    UnknownFlow(String),

    /// The token is unknown, already used or past its time-to-live
    #[error("Continuation '{token}' has expired or was already used")]
    ContinuationExpired { token: ContinuationToken },

    /// Another request is resuming the same continuation right now
    #[error("Continuation '{token}' is already being resumed")]
    ContinuationBusy { token: ContinuationToken },

    /// Back-navigation target that was marked as not revisitable
    #[error("Continuation '{token}' cannot be revisited")]
    NotBookmarkable { token: ContinuationToken },

    /// Back-navigation found no earlier page to return to
    #[error("No earlier page to go back to from '{token}'")]
    NoEarlierPage { token: ContinuationToken },

    /// The flow's own logic failed
    #[error("Flow '{flow}' failed at '{point}': {source}")]
    UserCode {
        flow: String,
        point: String,
        #[source]
        source: FlowError,
    },

    /// The continuation store is full
    #[error("Continuation store exhausted ({capacity} entries)")]
    ResourceExhausted { capacity: usize },

    #[error("Continuation store error: {0}")]
    Store(StoreError),
}

impl EngineError {
    /// True when the user should be told to start over.
    ///
    /// A busy continuation is not expired: the token stays valid once the
    /// other request finishes.
    pub fn is_expired(&self) -> bool {
        matches!(
            self,
            Self::ContinuationExpired { .. }
                | Self::NotBookmarkable { .. }
                | Self::NoEarlierPage { .. }
        )
    }
}

impl From<StoreError> for EngineError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound { token } | StoreError::Expired { token } => {
                Self::ContinuationExpired { token }
            }
            StoreError::Claimed { token } => Self::ContinuationBusy { token },
            StoreError::ResourceExhausted { capacity } => Self::ResourceExhausted { capacity },
            other => Self::Store(other),
        }
    }
}
