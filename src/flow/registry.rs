//! Named flow entry points.

use super::{ErasedFlow, Flow};
use std::collections::HashMap;
use std::sync::Arc;

/// Lookup table from flow name to entry point.
#[derive(Default, Clone)]
pub struct FlowRegistry {
    flows: HashMap<String, Arc<dyn ErasedFlow>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flow under `name`.
    ///
    /// Returns `false` and leaves the registry unchanged if the name is taken.
    pub fn register<F: Flow>(&mut self, name: impl Into<String>, flow: F) -> bool {
        let name = name.into();
        if self.flows.contains_key(&name) {
            return false;
        }
        self.flows.insert(name, Arc::new(flow));
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.flows.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.flows.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub(crate) fn get(&self, name: &str) -> Option<Arc<dyn ErasedFlow>> {
        self.flows.get(name).cloned()
    }
}

impl std::fmt::Debug for FlowRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowRegistry")
            .field("flows", &self.names())
            .finish()
    }
}
