//! Checkpoint error types.

use thiserror::Error;

/// Errors that can occur while exporting or restoring continuations
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// Encoding to JSON or the binary envelope failed
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),

    /// Decoding from JSON or the binary envelope failed
    #[error("Deserialization failed: {0}")]
    DeserializationFailed(String),

    /// Checkpoint was written by an incompatible format version
    #[error("Unsupported checkpoint version {found}, supported: {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// Checkpoint content cannot be loaded into the target store
    #[error("Checkpoint validation failed: {0}")]
    ValidationFailed(String),
}
