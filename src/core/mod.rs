//! Core page-flow types.
//!
//! This module contains the plain data the rest of the engine moves around:
//! - Flow state records via the `State` trait
//! - Tokens and session identifiers
//! - Page descriptors and submitted input
//! - Immutable suspension history
//! - The clock continuations expire against

mod clock;
mod history;
mod input;
mod page;
mod state;
mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use history::{FlowHistory, SuspendRecord};
pub use input::{FormValue, Upload, UserInput};
pub use page::{ModelData, Page, PageResponse};
pub use state::State;
pub use token::{ContinuationToken, SessionId};
