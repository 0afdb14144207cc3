//! Submitted request data: form fields and uploaded files.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An uploaded file as received from the transport layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// A single submitted value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormValue {
    Text(String),
    File(Upload),
}

/// Key-value payload of an inbound request.
///
/// This is the value a suspended flow receives when it is resumed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserInput(BTreeMap<String, FormValue>);

impl UserInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field, builder style.
    pub fn with_text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, FormValue::Text(value.into()));
        self
    }

    /// Add an uploaded file, builder style.
    pub fn with_file(mut self, key: impl Into<String>, upload: Upload) -> Self {
        self.insert(key, FormValue::File(upload));
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FormValue) -> Option<FormValue> {
        self.0.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&FormValue> {
        self.0.get(key)
    }

    /// Text value of a field; `None` if absent or if the field is a file.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(FormValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn file(&self, key: &str) -> Option<&Upload> {
        match self.0.get(key) {
            Some(FormValue::File(upload)) => Some(upload),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FormValue)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for UserInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), FormValue::Text(v.into())))
                .collect(),
        )
    }
}
