//! Suspending, storing and resuming flows.
//!
//! # Key Concepts
//!
//! - **Suspender**: freezes a flow's state into a continuation and hands a
//!   stored continuation to exactly one resumer
//! - **Runner**: dispatches a flow from the top or from a suspend point and
//!   settles the result (suspended, completed or terminated)
//!
//! A flow session ends when its flow finishes or terminates; at that point
//! every continuation it left in the store is dropped.

mod error;
mod runner;
mod suspender;

pub use error::EngineError;
pub use runner::{FlowRunner, Outcome};
pub use suspender::Suspender;
