//! Core State trait for flow state records.
//!
//! A flow is written as an explicit state machine: one state per suspend
//! point, each carrying exactly the locals that stay live across that
//! suspension. The record is frozen into a continuation when the flow
//! suspends and thawed again when the matching request arrives.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Trait for flow state records.
///
/// All methods are pure - no side effects. A state value describes where a
/// suspended flow resumes and with what local variables.
///
/// # Required Traits
///
/// - `Clone`: States are copied into every continuation snapshot
/// - `Debug`: States must be debuggable for diagnostics
/// - `Serialize` + `Deserialize`: States are frozen by value when stored
///
/// # Example
///
/// ```rust
/// use pageflow::core::State;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Debug, Serialize, Deserialize)]
/// enum Checkout {
///     Address { cart: Vec<String> },
///     Payment { cart: Vec<String>, address: String },
///     Receipt { order_id: u64 },
/// }
///
/// impl State for Checkout {
///     fn name(&self) -> &str {
///         match self {
///             Self::Address { .. } => "Address",
///             Self::Payment { .. } => "Payment",
///             Self::Receipt { .. } => "Receipt",
///         }
///     }
///
///     fn bookmarkable(&self) -> bool {
///         !matches!(self, Self::Payment { .. })
///     }
/// }
/// ```
pub trait State: Clone + Debug + Serialize + for<'de> Deserialize<'de> + Send + Sync {
    /// Name of the suspend point this state resumes, for display/logging.
    fn name(&self) -> &str;

    /// Whether a continuation captured in this state may be revisited
    /// with the back button.
    ///
    /// Non-bookmarkable continuations only act as links in the resume
    /// chain. Default implementation returns `true`.
    fn bookmarkable(&self) -> bool {
        true
    }
}
