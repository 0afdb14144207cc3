//! Keyed storage for suspended flow continuations.
//!
//! The store is the only shared mutable resource in the engine. Each entry
//! moves through a fixed life cycle and is never edited in place:
//!
//! - **live**: stored by `put`, visible to `get` and `claim`
//! - **claimed**: hidden while exactly one request resumes it; `release`
//!   returns it to live if the resume failed
//! - **superseded**: the resume succeeded; kept until expiry only as a node
//!   in the back-navigation tree, never resumable again
//!
//! Any entry disappears when it expires, is invalidated, or its flow
//! session ends.

use crate::core::{ContinuationToken, Page, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

mod error;
mod memory;

pub use error::StoreError;
pub use memory::MemoryContinuationStore;

/// Session-scoped key-value attributes, captured by value at each suspension.
pub type Attributes = BTreeMap<String, Value>;

/// A captured point of suspension in a running flow.
///
/// Everything needed to re-enter the flow lives here: which flow, which
/// suspend point, the frozen state record and the session attributes as they
/// were when the flow suspended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Continuation {
    pub id: ContinuationToken,
    pub session_id: SessionId,
    pub flow: String,
    /// First continuation stored for the flow session
    pub root_id: ContinuationToken,
    /// The continuation that was resumed to get here
    pub parent_id: Option<ContinuationToken>,
    /// Whether this node may be revisited directly
    pub bookmark: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Name of the suspend point
    pub point: String,
    /// Frozen flow state record
    pub state: Value,
    pub attributes: Attributes,
    /// Page that was shown when the flow suspended
    pub page: Page,
}

impl Continuation {
    /// Check whether the continuation is past its time-to-live (pure)
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A continuation before the store has assigned its token and timestamps.
#[derive(Clone, Debug, PartialEq)]
pub struct ContinuationDraft {
    pub session_id: SessionId,
    pub flow: String,
    /// `None` when this draft is the first suspension of its session
    pub root_id: Option<ContinuationToken>,
    pub parent_id: Option<ContinuationToken>,
    pub bookmark: bool,
    pub point: String,
    pub state: Value,
    pub attributes: Attributes,
    pub page: Page,
}

impl ContinuationDraft {
    /// Copy of a stored continuation, to be stored again under a new token.
    pub fn reissue(from: &Continuation) -> Self {
        Self {
            session_id: from.session_id,
            flow: from.flow.clone(),
            root_id: Some(from.root_id.clone()),
            parent_id: from.parent_id.clone(),
            bookmark: from.bookmark,
            point: from.point.clone(),
            state: from.state.clone(),
            attributes: from.attributes.clone(),
            page: from.page.clone(),
        }
    }

    pub(crate) fn seal(
        self,
        id: ContinuationToken,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Continuation {
        let root_id = self.root_id.unwrap_or_else(|| id.clone());
        Continuation {
            id,
            session_id: self.session_id,
            root_id,
            flow: self.flow,
            parent_id: self.parent_id,
            bookmark: self.bookmark,
            created_at,
            expires_at,
            point: self.point,
            state: self.state,
            attributes: self.attributes,
            page: self.page,
        }
    }
}

/// What the store holds for one flow session.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowSession {
    pub id: SessionId,
    pub flow: String,
    /// First continuation the session stored
    pub root: ContinuationToken,
    /// Most recently stored continuation that can still be resumed
    pub current: Option<ContinuationToken>,
    /// Every resumable continuation, oldest first
    pub live: Vec<ContinuationToken>,
    /// Unexpired entries in any state
    pub stored: usize,
}

/// Trait for storing and retrieving continuations.
///
/// Implementations must support concurrent use from independent flow
/// sessions.
pub trait ContinuationStore: Send + Sync {
    /// Store a continuation under a fresh token.
    ///
    /// `ttl` of `None` uses the store's default. Fails with
    /// `ResourceExhausted` when the store is full.
    fn put(
        &self,
        draft: ContinuationDraft,
        ttl: Option<Duration>,
    ) -> Result<ContinuationToken, StoreError>;

    /// Get a live continuation. Expired entries are purged on access.
    fn get(&self, token: &ContinuationToken) -> Result<Arc<Continuation>, StoreError>;

    /// Remove an entry early. Returns whether anything was removed.
    fn invalidate(&self, token: &ContinuationToken) -> bool;

    /// Remove every entry with `expires_at <= now`, returning the count.
    fn sweep(&self, now: DateTime<Utc>) -> usize;

    /// Hide a live continuation so that exactly one caller resumes it.
    fn claim(&self, token: &ContinuationToken) -> Result<Arc<Continuation>, StoreError>;

    /// Return a claimed continuation to the live state.
    fn release(&self, token: &ContinuationToken) -> Result<(), StoreError>;

    /// Mark a claimed continuation as used.
    fn supersede(&self, token: &ContinuationToken) -> Result<(), StoreError>;

    /// Read a live or superseded continuation without claiming it.
    fn lookup(&self, token: &ContinuationToken) -> Result<Arc<Continuation>, StoreError>;

    /// Remove every entry belonging to a flow session.
    fn invalidate_session(&self, session_id: &SessionId) -> usize;

    /// Summarise a flow session, or `None` if it holds no unexpired entry.
    fn session(&self, session_id: &SessionId) -> Option<FlowSession>;

    /// Remove the oldest unclaimed entry, returning its token.
    fn evict_oldest(&self) -> Option<ContinuationToken>;

    /// Number of stored entries, in any state.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;

    /// Current time as the store sees it.
    fn now(&self) -> DateTime<Utc>;
}
