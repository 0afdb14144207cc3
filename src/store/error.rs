//! Continuation store error types.

use crate::core::ContinuationToken;
use thiserror::Error;

/// Errors that can occur in continuation store operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    /// No entry is stored under this token (never issued, invalidated or used)
    #[error("No continuation stored under token '{token}'")]
    NotFound { token: ContinuationToken },

    /// The entry existed but its time-to-live has passed
    #[error("Continuation '{token}' has expired")]
    Expired { token: ContinuationToken },

    /// Another request is currently resuming this continuation
    #[error("Continuation '{token}' is already being resumed")]
    Claimed { token: ContinuationToken },

    /// The entry is not in the claimed state this operation requires
    #[error("Continuation '{token}' is not claimed")]
    NotClaimed { token: ContinuationToken },

    /// The store holds as many continuations as it is allowed to
    #[error("Continuation store is full ({capacity} entries)")]
    ResourceExhausted { capacity: usize },

    /// The requested time-to-live cannot be represented
    #[error("Invalid time-to-live: {0}")]
    InvalidTtl(String),
}

impl StoreError {
    /// True for errors a user should see as "your session expired".
    pub fn is_gone(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Expired { .. })
    }
}
