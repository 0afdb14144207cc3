//! Pageflow: continuation-based web page flows
//!
//! A multi-page interaction (a wizard, a form with an upload step, a
//! captcha) is written as one sequential flow. Every time the flow needs
//! the user, it suspends: its state is frozen into a continuation, the page
//! is sent along with an unguessable token, and the next request carrying
//! that token resumes the flow right where it stopped.
//!
//! # Core Concepts
//!
//! - **Flow**: an explicit state machine, one state per suspend point
//! - **Continuation**: a frozen flow state stored under a token with a
//!   time-to-live
//! - **Session controller**: turns each request into exactly one reply page
//!
//! # Example
//!
//! ```rust
//! use pageflow::builder::EngineBuilder;
//! use pageflow::controller::{FlowRequest, ReplyKind};
//! use pageflow::core::{Page, UserInput};
//! use pageflow::flow::{Flow, FlowContext, FlowError, Step};
//! use pageflow::impl_state;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum Signup {
//!     AskName,
//!     AskEmail { name: String },
//! }
//!
//! impl_state!(Signup { AskName, AskEmail });
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
//!                     Signup::AskEmail { name },
//!                     Page::new("signup/email"),
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
//!
//! let controller = EngineBuilder::new()
//!     .flow("signup", SignupFlow)
//!     .entry_point("signup")
//!     .build()
//!     .unwrap();
//!
//! let reply = controller.handle(FlowRequest::start("signup"));
//! assert_eq!(reply.target_page(), "signup/name");
//!
//! let token = reply.token().cloned().unwrap();
//! let reply = controller.handle(
//!     FlowRequest::resume(token).with_input(UserInput::new().with_text("name", "Ada")),
//! );
//! assert_eq!(reply.target_page(), "signup/email");
//!
//! let token = reply.token().cloned().unwrap();
//! let reply = controller.handle(
//!     FlowRequest::resume(token)
//!         .with_input(UserInput::new().with_text("email", "ada@example.com")),
//! );
//! assert_eq!(reply.kind, ReplyKind::Completed);
//! assert_eq!(reply.page.model_value("name").unwrap(), "Ada");
//! ```

pub mod builder;
pub mod checkpoint;
pub mod config;
pub mod controller;
pub mod core;
pub mod engine;
pub mod flow;
pub mod store;

// Re-export commonly used types
pub use builder::EngineBuilder;
pub use controller::{FlowRequest, Reply, ReplyKind, SessionController};
pub use core::{ContinuationToken, Page, PageResponse, State, UserInput};
pub use flow::{Flow, FlowContext, FlowError, Step, Suspension};
