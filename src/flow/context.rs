//! Explicit request and session context handed to every flow dispatch.

use super::error::FlowError;
use crate::core::{ContinuationToken, Page, SessionId, UserInput};
use crate::store::Attributes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Everything a flow may read or change while it runs.
///
/// Attributes are scoped to the flow session and captured by value in each
/// continuation, so going back to an earlier page also restores the
/// attributes as they were on that page.
#[derive(Debug)]
pub struct FlowContext {
    flow: String,
    session_id: SessionId,
    continuation: Option<ContinuationToken>,
    input: Arc<UserInput>,
    attributes: Attributes,
    terminal_page: Option<Page>,
}

impl FlowContext {
    pub(crate) fn new(
        flow: impl Into<String>,
        session_id: SessionId,
        continuation: Option<ContinuationToken>,
        input: Arc<UserInput>,
        attributes: Attributes,
    ) -> Self {
        Self {
            flow: flow.into(),
            session_id,
            continuation,
            input,
            attributes,
            terminal_page: None,
        }
    }

    pub fn flow_name(&self) -> &str {
        &self.flow
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Token of the continuation being resumed; `None` when starting.
    pub fn continuation(&self) -> Option<&ContinuationToken> {
        self.continuation.as_ref()
    }

    /// Parameters of the current request.
    pub fn input(&self) -> &UserInput {
        &self.input
    }

    /// Text parameter that must be present and non-blank.
    pub fn require_text(&self, key: &str) -> Result<&str, FlowError> {
        match self.input.text(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(FlowError::MissingInput(key.to_string())),
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Typed attribute lookup.
    pub fn attribute_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, FlowError> {
        self.attributes
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(FlowError::from)
    }

    pub fn set_attribute(
        &mut self,
        key: impl Into<String>,
        value: impl Serialize,
    ) -> Result<(), FlowError> {
        let value = serde_json::to_value(value)?;
        self.attributes.insert(key.into(), value);
        Ok(())
    }

    pub fn remove_attribute(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    /// Show `page` as the last page of this flow session and abandon it.
    ///
    /// Meant for helpers that render a terminal page on behalf of their
    /// caller: whatever the enclosing flow returns afterwards is discarded,
    /// no continuation is stored and the session's earlier continuations
    /// are invalidated. The first call wins.
    pub fn terminate(&mut self, page: Page) {
        if self.terminal_page.is_none() {
            self.terminal_page = Some(page);
        }
    }

    pub fn is_terminated(&self) -> bool {
        self.terminal_page.is_some()
    }

    pub(crate) fn into_parts(self) -> (Attributes, Option<Page>) {
        (self.attributes, self.terminal_page)
    }
}
