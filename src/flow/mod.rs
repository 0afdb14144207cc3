//! Application flows written as explicit state machines.
//!
//! A flow that in a scripting language would read
//!
//! ```text
//! name  = sendPageAndWait("ask-name")
//! email = sendPageAndWait("ask-email", {name})
//! sendPage("done", {name, email})
//! ```
//!
//! becomes one state per suspend point, each holding the locals live across
//! it, and a dispatch function from `(state, resume value)` to the next
//! [`Step`].
//!
//! # Example
//!
//! ```rust
//! use pageflow::core::{Page, State, UserInput};
//! use pageflow::flow::{Flow, FlowContext, FlowError, Step};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum Signup {
//!     AskName,
//!     AskEmail { name: String },
//! }
//!
//! impl State for Signup {
//!     fn name(&self) -> &str {
//!         match self {
//!             Self::AskName => "AskName",
//!             Self::AskEmail { .. } => "AskEmail",
//!         }
//!     }
//! }
//!
//! struct SignupFlow;
//!
//! impl Flow for SignupFlow {
//!     type State = Signup;
//!
//!     fn start(&self, _ctx: &mut FlowContext) -> Result<Step<Signup>, FlowError> {
//!         Ok(Step::suspend(Signup::AskName, Page::new("signup/name")))
//!     }
//!
//!     fn resume(
//!         &self,
//!         state: Signup,
//!         _input: &UserInput,
//!         ctx: &mut FlowContext,
//!     ) -> Result<Step<Signup>, FlowError> {
//!         match state {
//!             Signup::AskName => {
//!                 let name = ctx.require_text("name")?.to_string();
//!                 Ok(Step::suspend(
//!                     Signup::AskEmail { name: name.clone() },
//!                     Page::new("signup/email").with("name", name),
//!                 ))
//!             }
//!             Signup::AskEmail { name } => {
//!                 let email = ctx.require_text("email")?;
//!                 Ok(Step::finish(
//!                     Page::new("signup/done").with("name", name).with("email", email),
//!                 ))
//!             }
//!         }
//!     }
//! }
//! ```

use crate::core::{Page, State, UserInput};
use serde_json::Value;
use std::time::Duration;

mod context;
mod error;
mod registry;
mod step;

pub use context::FlowContext;
pub use error::FlowError;
pub use registry::FlowRegistry;
pub use step::{Step, Suspension};

/// A registered flow entry point.
///
/// `start` runs the flow from the top; `resume` re-enters it right after the
/// suspend point recorded in `state`, with `input` as the value that
/// suspension "returns".
pub trait Flow: Send + Sync + 'static {
    type State: State;

    fn start(&self, ctx: &mut FlowContext) -> Result<Step<Self::State>, FlowError>;

    fn resume(
        &self,
        state: Self::State,
        input: &UserInput,
        ctx: &mut FlowContext,
    ) -> Result<Step<Self::State>, FlowError>;
}

/// A step whose state has been frozen for storage.
#[derive(Debug, Clone)]
pub(crate) enum FrozenStep {
    Suspend {
        point: String,
        state: Value,
        page: Page,
        bookmark: bool,
        ttl: Option<Duration>,
    },
    Finish(Page),
}

/// Object-safe view of a [`Flow`] that works on frozen state.
pub(crate) trait ErasedFlow: Send + Sync {
    fn start(&self, ctx: &mut FlowContext) -> Result<FrozenStep, FlowError>;

    fn resume(
        &self,
        state: &Value,
        input: &UserInput,
        ctx: &mut FlowContext,
    ) -> Result<FrozenStep, FlowError>;
}

impl<F: Flow> ErasedFlow for F {
    fn start(&self, ctx: &mut FlowContext) -> Result<FrozenStep, FlowError> {
        freeze(Flow::start(self, ctx)?)
    }

    fn resume(
        &self,
        state: &Value,
        input: &UserInput,
        ctx: &mut FlowContext,
    ) -> Result<FrozenStep, FlowError> {
        let state: F::State = serde_json::from_value(state.clone())?;
        freeze(Flow::resume(self, state, input, ctx)?)
    }
}

fn freeze<S: State>(step: Step<S>) -> Result<FrozenStep, FlowError> {
    match step {
        Step::Suspend(suspension) => {
            let bookmark = suspension.is_bookmark();
            Ok(FrozenStep::Suspend {
                point: suspension.state.name().to_string(),
                state: serde_json::to_value(&suspension.state)?,
                page: suspension.page,
                bookmark,
                ttl: suspension.ttl,
            })
        }
        Step::Finish(page) => Ok(FrozenStep::Finish(page)),
    }
}
