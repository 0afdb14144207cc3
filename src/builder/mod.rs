//! Fluent assembly of a page-flow engine.
//!
//! # Example
//!
//! ```
//! use pageflow::builder::EngineBuilder;
//! use pageflow::core::{Page, UserInput};
//! use pageflow::flow::{Flow, FlowContext, FlowError, Step};
//! use pageflow::impl_state;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Debug, Serialize, Deserialize)]
//! enum Greeting {
//!     AskName,
//! }
//!
//! impl_state!(Greeting { AskName });
//!
//! struct GreetingFlow;
//!
//! impl Flow for GreetingFlow {
//!     type State = Greeting;
//!
//!     fn start(&self, _ctx: &mut FlowContext) -> Result<Step<Greeting>, FlowError> {
//!         Ok(Step::suspend(Greeting::AskName, Page::new("greet/name")))
//!     }
//!
//!     fn resume(
//!         &self,
//!         _state: Greeting,
//!         input: &UserInput,
//!         _ctx: &mut FlowContext,
//!     ) -> Result<Step<Greeting>, FlowError> {
//!         let name = input.text("name").unwrap_or("stranger");
//!         Ok(Step::finish(Page::new("greet/hello").with("name", name)))
//!     }
//! }
//!
//! let controller = EngineBuilder::new()
//!     .flow("greet", GreetingFlow)
//!     .entry_point("greet")
//!     .build()
//!     .unwrap();
//! assert_eq!(controller.runner().registry().names(), vec!["greet"]);
//! ```

pub mod error;
pub mod macros;

pub use error::BuildError;

use crate::config::{violations, EngineConfig};
use crate::controller::SessionController;
use crate::core::{Clock, SystemClock};
use crate::engine::{FlowRunner, Suspender};
use crate::flow::{Flow, FlowRegistry};
use crate::store::{ContinuationStore, MemoryContinuationStore};
use std::sync::Arc;

/// Builder for a [`SessionController`].
///
/// Without an explicit store, an in-memory store is created from the
/// configuration and the given clock (the system clock by default).
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    registry: FlowRegistry,
    duplicates: Vec<String>,
    entry_points: Vec<String>,
    store: Option<Arc<dyn ContinuationStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a flow under `name`.
    pub fn flow<F: Flow>(mut self, name: impl Into<String>, flow: F) -> Self {
        let name = name.into();
        if !self.registry.register(name.clone(), flow) {
            self.duplicates.push(name);
        }
        self
    }

    /// Declare a flow name that requests are expected to start.
    ///
    /// Checked at build time so a typo fails fast instead of at the
    /// first request.
    pub fn entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_points.push(name.into());
        self
    }

    /// Use an existing store. Overrides the clock and the store settings
    /// in the configuration.
    pub fn store(mut self, store: Arc<dyn ContinuationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<SessionController, BuildError> {
        let problems = violations(&self.config);
        if !problems.is_empty() {
            return Err(BuildError::InvalidConfig(problems));
        }

        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(BuildError::DuplicateFlow(name));
        }

        if self.registry.is_empty() {
            return Err(BuildError::NoFlows);
        }

        let unknown: Vec<String> = self
            .entry_points
            .into_iter()
            .filter(|name| !self.registry.contains(name))
            .collect();
        if !unknown.is_empty() {
            return Err(BuildError::UnknownEntryPoints(unknown));
        }

        let config = self.config;
        let store = match self.store {
            Some(store) => store,
            None => {
                let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
                Arc::new(MemoryContinuationStore::from_config(&config, clock))
            }
        };

        tracing::info!(
            flows = ?self.registry.names(),
            capacity = store.capacity(),
            policy = ?config.capacity_policy,
            "Page-flow engine built"
        );

        let suspender = Suspender::new(store, config.capacity_policy);
        let runner = FlowRunner::new(self.registry, suspender);
        Ok(SessionController::new(runner, config.pages))
    }
}
