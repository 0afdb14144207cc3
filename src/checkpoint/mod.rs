//! Checkpoint and restore for continuation stores.
//!
//! The in-memory store loses everything on restart. A checkpoint is a
//! serializable copy of its unexpired entries that can be written to any
//! durable medium and loaded into a fresh store.
//!
//! Two encodings are provided: JSON for readability and a compact binary
//! envelope (bincode) whose entries are JSON documents, since frozen flow
//! state is schemaless.

use crate::store::Continuation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod error;

pub use error::CheckpointError;

/// Version identifier for checkpoint format
pub const CHECKPOINT_VERSION: u32 = 1;

/// One exported store entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckpointEntry {
    pub continuation: Continuation,
    /// Entry was already resumed and is kept only for back-navigation
    pub superseded: bool,
}

/// Serializable copy of a continuation store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Checkpoint format version
    pub version: u32,

    /// When the checkpoint was taken
    pub taken_at: DateTime<Utc>,

    pub entries: Vec<CheckpointEntry>,
}

#[derive(Serialize, Deserialize)]
struct BinaryEnvelope {
    version: u32,
    taken_at_millis: i64,
    entries: Vec<(bool, Vec<u8>)>,
}

impl Checkpoint {
    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string(self).map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        let checkpoint: Self = serde_json::from_str(json)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        checkpoint.check_version()?;
        Ok(checkpoint)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, CheckpointError> {
        let entries = self
            .entries
            .iter()
            .map(|entry| {
                serde_json::to_vec(&entry.continuation)
                    .map(|bytes| (entry.superseded, bytes))
                    .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let envelope = BinaryEnvelope {
            version: self.version,
            taken_at_millis: self.taken_at.timestamp_millis(),
            entries,
        };
        bincode::serialize(&envelope)
            .map_err(|e| CheckpointError::SerializationFailed(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CheckpointError> {
        let envelope: BinaryEnvelope = bincode::deserialize(bytes)
            .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))?;
        if envelope.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: envelope.version,
                supported: CHECKPOINT_VERSION,
            });
        }

        let taken_at =
            DateTime::from_timestamp_millis(envelope.taken_at_millis).ok_or_else(|| {
                CheckpointError::ValidationFailed(format!(
                    "timestamp {} is out of range",
                    envelope.taken_at_millis
                ))
            })?;

        let entries = envelope
            .entries
            .into_iter()
            .map(|(superseded, bytes)| {
                serde_json::from_slice(&bytes)
                    .map(|continuation| CheckpointEntry {
                        continuation,
                        superseded,
                    })
                    .map_err(|e| CheckpointError::DeserializationFailed(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            version: envelope.version,
            taken_at,
            entries,
        })
    }

    fn check_version(&self) -> Result<(), CheckpointError> {
        if self.version == CHECKPOINT_VERSION {
            Ok(())
        } else {
            Err(CheckpointError::UnsupportedVersion {
                found: self.version,
                supported: CHECKPOINT_VERSION,
            })
        }
    }
}
