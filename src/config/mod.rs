//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration:
//!
//! ```rust
//! use pageflow::config::{CapacityPolicy, EngineConfig};
//!
//! let config = EngineConfig::from_json(r#"{ "default_ttl_secs": 900,
//!                                           "capacity_policy": "evict_oldest" }"#)
//!     .unwrap();
//! assert_eq!(config.default_ttl_secs, 900);
//! assert_eq!(config.capacity_policy, CapacityPolicy::EvictOldest);
//! assert_eq!(config.pages.expired, "flow/expired");
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

mod validation;

pub use validation::{validate, violations, ConfigViolation};

/// What to do when the continuation store is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityPolicy {
    /// Fail the suspension with a resource error
    #[default]
    Reject,
    /// Drop the oldest stored continuation and retry once
    EvictOldest,
}

/// Page ids rendered for replies that did not come from a flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplyPages {
    /// Token unknown, used or past its time-to-live
    pub expired: String,
    /// Flow code failed
    pub error: String,
    /// No such flow, or nothing to start
    pub not_found: String,
    /// Continuation store is full
    pub unavailable: String,
    /// Another request is resuming the same token
    pub busy: String,
}

impl Default for ReplyPages {
    fn default() -> Self {
        Self {
            expired: "flow/expired".to_string(),
            error: "flow/error".to_string(),
            not_found: "flow/not-found".to_string(),
            unavailable: "flow/unavailable".to_string(),
            busy: "flow/busy".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Time-to-live of a continuation when the flow does not set one
    pub default_ttl_secs: u64,

    /// Upper bound on stored continuations, in any state
    pub max_continuations: usize,

    pub capacity_policy: CapacityPolicy,

    /// Minimum time between expiry sweeps triggered by new suspensions
    pub sweep_interval_secs: u64,

    pub pages: ReplyPages,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3600,
            max_continuations: 10_000,
            capacity_policy: CapacityPolicy::Reject,
            sweep_interval_secs: 60,
            pages: ReplyPages::default(),
        }
    }
}

/// Errors loading a configuration document
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration could not be parsed: {0}")]
    Parse(String),

    #[error("Invalid configuration: {}", join(.0))]
    Invalid(Vec<ConfigViolation>),
}

pub(crate) fn join(violations: &[ConfigViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let problems = violations(&config);
        if problems.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
