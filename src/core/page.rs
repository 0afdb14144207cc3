//! Page descriptors exchanged with the rendering layer.

use super::token::ContinuationToken;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key-value payload handed to the renderer.
pub type ModelData = BTreeMap<String, Value>;

/// A page a flow wants shown: an opaque target id plus its model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub target: String,
    #[serde(default)]
    pub model: ModelData,
}

impl Page {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            model: ModelData::new(),
        }
    }

    /// Add a model entry, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.model.insert(key.into(), value.into());
        self
    }

    /// Turn the page into a response carrying an optional resume token.
    pub fn respond(self, token: Option<ContinuationToken>) -> PageResponse {
        PageResponse {
            target_page: self.target,
            model: self.model,
            token,
        }
    }
}

/// What the web layer receives: render `target_page` with `model` and
/// embed `token` (if any) in the next round-trip.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageResponse {
    pub target_page: String,
    pub model: ModelData,
    pub token: Option<ContinuationToken>,
}

impl PageResponse {
    pub fn model_value(&self, key: &str) -> Option<&Value> {
        self.model.get(key)
    }
}
