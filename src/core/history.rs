//! Suspension history of a flow session.
//!
//! The trail of suspend points a flow session passed through before
//! reaching a page. Continuations only store their parent link; the trail
//! is rebuilt from those links on demand. It is immutable: recording a new
//! point returns a new history.

use super::token::ContinuationToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Record of one suspension that was later resumed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuspendRecord {
    /// Name of the suspend point
    pub point: String,
    /// Token the continuation was stored under
    pub token: ContinuationToken,
    /// When the flow suspended there
    pub at: DateTime<Utc>,
}

/// Ordered trail of suspensions.
///
/// # Example
///
/// ```rust
/// use pageflow::core::{ContinuationToken, FlowHistory, SuspendRecord};
/// use chrono::Utc;
///
/// let history = FlowHistory::new();
/// let history = history.record(SuspendRecord {
///     point: "AskName".to_string(),
///     token: ContinuationToken::generate(),
///     at: Utc::now(),
/// });
/// let history = history.record(SuspendRecord {
///     point: "AskEmail".to_string(),
///     token: ContinuationToken::generate(),
///     at: Utc::now(),
/// });
///
/// assert_eq!(history.path(), vec!["AskName", "AskEmail"]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowHistory {
    records: Vec<SuspendRecord>,
}

impl FlowHistory {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Record a suspension, returning a new history.
    ///
    /// This is a pure function - it does not mutate the existing history.
    pub fn record(&self, record: SuspendRecord) -> Self {
        let mut records = self.records.clone();
        records.push(record);
        Self { records }
    }

    /// Names of the suspend points traversed, oldest first.
    pub fn path(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.point.as_str()).collect()
    }

    /// Time between the first and last recorded suspension.
    ///
    /// Returns `None` if nothing has been recorded.
    pub fn duration(&self) -> Option<Duration> {
        if let (Some(first), Some(last)) = (self.records.first(), self.records.last()) {
            last.at.signed_duration_since(first.at).to_std().ok()
        } else {
            None
        }
    }

    pub fn last(&self) -> Option<&SuspendRecord> {
        self.records.last()
    }

    pub fn records(&self) -> &[SuspendRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<SuspendRecord> for FlowHistory {
    fn from_iter<I: IntoIterator<Item = SuspendRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
