//! Errors raised while assembling an engine.

use crate::config::ConfigViolation;
use thiserror::Error;

/// Errors that can occur when building a session controller.
#[derive(Debug, Error, PartialEq)]
pub enum BuildError {
    #[error("Invalid configuration: {}", crate::config::join(.0))]
    InvalidConfig(Vec<ConfigViolation>),

    #[error("Flow '{0}' registered more than once")]
    DuplicateFlow(String),

    #[error("No flows registered. Call .flow(name, flow) before .build()")]
    NoFlows,

    #[error("Entry points without a registered flow: {}", .0.join(", "))]
    UnknownEntryPoints(Vec<String>),
}
