//! Capturing and re-entering suspended flows.
//!
//! The suspender is the only part of the engine that touches the store. It
//! turns a frozen step into a stored continuation, hands a stored
//! continuation to exactly one resumer, and settles the entry afterwards.

use super::error::EngineError;
use crate::config::CapacityPolicy;
use crate::core::{ContinuationToken, SessionId};
use crate::store::{Continuation, ContinuationDraft, ContinuationStore, StoreError};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct Suspender {
    store: Arc<dyn ContinuationStore>,
    policy: CapacityPolicy,
}

impl Suspender {
    pub fn new(store: Arc<dyn ContinuationStore>, policy: CapacityPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &Arc<dyn ContinuationStore> {
        &self.store
    }

    /// Store a continuation, applying the capacity policy when full.
    pub fn capture(
        &self,
        draft: ContinuationDraft,
        ttl: Option<Duration>,
    ) -> Result<ContinuationToken, EngineError> {
        match self.store.put(draft.clone(), ttl) {
            Err(StoreError::ResourceExhausted { capacity })
                if self.policy == CapacityPolicy::EvictOldest =>
            {
                if self.store.evict_oldest().is_none() {
                    return Err(EngineError::ResourceExhausted { capacity });
                }
                Ok(self.store.put(draft, ttl)?)
            }
            result => Ok(result?),
        }
    }

    /// Claim a continuation for resumption.
    pub fn enter(&self, token: &ContinuationToken) -> Result<Arc<Continuation>, EngineError> {
        self.store.claim(token).map_err(|error| {
            if error.is_gone() {
                tracing::warn!(token = %token, error = %error, "Resume with unusable token");
            }
            EngineError::from(error)
        })
    }

    /// The resume succeeded: the token may never be resumed again.
    pub fn commit(&self, token: &ContinuationToken) {
        if let Err(error) = self.store.supersede(token) {
            tracing::debug!(
                token = %token,
                error = %error,
                "Resumed continuation vanished before commit"
            );
        }
    }

    /// The resume failed: make the token resumable again.
    pub fn abort(&self, token: &ContinuationToken) {
        if let Err(error) = self.store.release(token) {
            tracing::warn!(
                token = %token,
                error = %error,
                "Could not release continuation after failed resume"
            );
        }
    }

    /// Drop every continuation of a finished flow session.
    pub fn end_session(&self, session_id: &SessionId) -> usize {
        self.store.invalidate_session(session_id)
    }
}
