//! In-memory continuation store with lazy expiry and opportunistic sweeps.

use super::{Continuation, ContinuationDraft, ContinuationStore, FlowSession, StoreError};
use crate::checkpoint::{Checkpoint, CheckpointEntry, CheckpointError, CHECKPOINT_VERSION};
use crate::config::EngineConfig;
use crate::core::{Clock, ContinuationToken, SessionId, SystemClock};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_TTL: Duration = Duration::from_secs(3600);
const DEFAULT_CAPACITY: usize = 10_000;
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Live,
    Claimed,
    Superseded,
}

#[derive(Debug)]
struct Entry {
    continuation: Arc<Continuation>,
    slot: Slot,
    /// Insertion order; timestamps can tie
    seq: u64,
}

/// Thread-safe in-memory store.
///
/// Entries do not survive a process restart; use [`checkpoint`] and
/// [`restore`] to carry them across one.
///
/// [`checkpoint`]: MemoryContinuationStore::checkpoint
/// [`restore`]: MemoryContinuationStore::restore
pub struct MemoryContinuationStore {
    entries: RwLock<HashMap<ContinuationToken, Entry>>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    capacity: usize,
    sweep_interval: Duration,
    last_sweep: Mutex<DateTime<Utc>>,
    next_seq: AtomicU64,
}

impl MemoryContinuationStore {
    /// Create a store with default limits and the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            default_ttl: DEFAULT_TTL,
            capacity: DEFAULT_CAPACITY,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            last_sweep: Mutex::new(now),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Create a store sized and timed from engine configuration.
    pub fn from_config(config: &EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_clock(clock)
            .with_default_ttl(config.default_ttl())
            .with_capacity(config.max_continuations)
            .with_sweep_interval(config.sweep_interval())
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Minimum time between sweeps triggered by `put`.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Export every unexpired entry.
    ///
    /// Claimed entries are exported as live: a resume in flight when the
    /// checkpoint is taken has not happened as far as the copy is concerned.
    pub fn checkpoint(&self) -> Checkpoint {
        let now = self.clock.now();
        let guard = self.entries.read();
        let mut kept: Vec<&Entry> = guard
            .values()
            .filter(|entry| !entry.continuation.is_expired_at(now))
            .collect();
        kept.sort_by_key(|entry| entry.seq);

        let entries = kept
            .into_iter()
            .map(|entry| CheckpointEntry {
                continuation: Continuation::clone(&entry.continuation),
                superseded: entry.slot == Slot::Superseded,
            })
            .collect();

        Checkpoint {
            version: CHECKPOINT_VERSION,
            taken_at: now,
            entries,
        }
    }

    /// Load entries from a checkpoint, returning how many were restored.
    ///
    /// Expired entries and tokens already present are skipped.
    pub fn restore(&self, checkpoint: &Checkpoint) -> Result<usize, CheckpointError> {
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: checkpoint.version,
                supported: CHECKPOINT_VERSION,
            });
        }

        let now = self.clock.now();
        let mut entries = self.entries.write();

        let pending: Vec<_> = checkpoint
            .entries
            .iter()
            .filter(|item| {
                let continuation = &item.continuation;
                !continuation.is_expired_at(now) && !entries.contains_key(&continuation.id)
            })
            .collect();

        if entries.len() + pending.len() > self.capacity {
            return Err(CheckpointError::ValidationFailed(format!(
                "restoring {} entries into a store holding {} would exceed its capacity of {}",
                pending.len(),
                entries.len(),
                self.capacity
            )));
        }

        let restored = pending.len();
        for item in pending {
            let slot = if item.superseded {
                Slot::Superseded
            } else {
                Slot::Live
            };
            entries.insert(
                item.continuation.id.clone(),
                Entry {
                    continuation: Arc::new(item.continuation.clone()),
                    slot,
                    seq: self.next_seq(),
                },
            );
        }

        tracing::info!(
            restored,
            skipped = checkpoint.entries.len() - restored,
            "Continuations restored from checkpoint"
        );
        Ok(restored)
    }

    fn next_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    fn sweep_due(&self, now: DateTime<Utc>) -> bool {
        let mut last = self.last_sweep.lock();
        let elapsed = now.signed_duration_since(*last).to_std().unwrap_or(Duration::ZERO);
        if elapsed >= self.sweep_interval {
            *last = now;
            true
        } else {
            false
        }
    }

    /// Run `read` against an unexpired entry, purging it if it has expired.
    fn with_unexpired<T>(
        &self,
        token: &ContinuationToken,
        read: impl FnOnce(&Entry) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let now = self.clock.now();
        {
            let entries = self.entries.read();
            match entries.get(token) {
                None => return Err(not_found(token)),
                Some(entry) if !entry.continuation.is_expired_at(now) => return read(entry),
                Some(_) => {}
            }
        }

        self.purge_expired_entry(token, now);
        Err(StoreError::Expired {
            token: token.clone(),
        })
    }

    fn purge_expired_entry(&self, token: &ContinuationToken, now: DateTime<Utc>) {
        let mut entries = self.entries.write();
        let expired = entries
            .get(token)
            .is_some_and(|entry| entry.continuation.is_expired_at(now));
        if expired {
            entries.remove(token);
            tracing::warn!(token = %token, "Expired continuation purged on access");
        }
    }

    fn transition(
        &self,
        token: &ContinuationToken,
        from: Slot,
        to: Slot,
    ) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        let entry = entries.get_mut(token).ok_or_else(|| not_found(token))?;
        if entry.slot != from {
            return Err(StoreError::NotClaimed {
                token: token.clone(),
            });
        }
        entry.slot = to;
        Ok(())
    }
}

impl Default for MemoryContinuationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContinuationStore for MemoryContinuationStore {
    fn put(
        &self,
        draft: ContinuationDraft,
        ttl: Option<Duration>,
    ) -> Result<ContinuationToken, StoreError> {
        let now = self.clock.now();
        let ttl = ttl.unwrap_or(self.default_ttl);
        let expires_at = expiry(now, ttl)?;

        let mut entries = self.entries.write();

        if self.sweep_due(now) {
            let removed = purge_expired(&mut entries, now);
            if removed > 0 {
                tracing::debug!(removed, "Swept expired continuations");
            }
        }

        if entries.len() >= self.capacity && purge_expired(&mut entries, now) == 0 {
            tracing::warn!(capacity = self.capacity, "Continuation store is full");
            return Err(StoreError::ResourceExhausted {
                capacity: self.capacity,
            });
        }

        let mut token = ContinuationToken::generate();
        while entries.contains_key(&token) {
            token = ContinuationToken::generate();
        }

        let continuation = draft.seal(token.clone(), now, expires_at);
        tracing::debug!(
            token = %token,
            flow = %continuation.flow,
            session_id = %continuation.session_id,
            point = %continuation.point,
            ttl_secs = ttl.as_secs(),
            "Continuation stored"
        );
        entries.insert(
            token.clone(),
            Entry {
                continuation: Arc::new(continuation),
                slot: Slot::Live,
                seq: self.next_seq(),
            },
        );

        Ok(token)
    }

    fn get(&self, token: &ContinuationToken) -> Result<Arc<Continuation>, StoreError> {
        self.with_unexpired(token, |entry| match entry.slot {
            Slot::Live => Ok(Arc::clone(&entry.continuation)),
            Slot::Claimed => Err(StoreError::Claimed {
                token: token.clone(),
            }),
            Slot::Superseded => Err(not_found(token)),
        })
    }

    fn invalidate(&self, token: &ContinuationToken) -> bool {
        let removed = self.entries.write().remove(token).is_some();
        if removed {
            tracing::debug!(token = %token, "Continuation invalidated");
        }
        removed
    }

    fn sweep(&self, now: DateTime<Utc>) -> usize {
        let removed = purge_expired(&mut self.entries.write(), now);
        *self.last_sweep.lock() = now;
        if removed > 0 {
            tracing::debug!(removed, "Swept expired continuations");
        }
        removed
    }

    fn claim(&self, token: &ContinuationToken) -> Result<Arc<Continuation>, StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.write();

        let expired = match entries.get(token) {
            None => return Err(not_found(token)),
            Some(entry) => entry.continuation.is_expired_at(now),
        };
        if expired {
            entries.remove(token);
            tracing::warn!(token = %token, "Expired continuation purged on access");
            return Err(StoreError::Expired {
                token: token.clone(),
            });
        }

        let entry = entries.get_mut(token).ok_or_else(|| not_found(token))?;
        match entry.slot {
            Slot::Live => {
                entry.slot = Slot::Claimed;
                Ok(Arc::clone(&entry.continuation))
            }
            Slot::Claimed => Err(StoreError::Claimed {
                token: token.clone(),
            }),
            Slot::Superseded => Err(not_found(token)),
        }
    }

    fn release(&self, token: &ContinuationToken) -> Result<(), StoreError> {
        self.transition(token, Slot::Claimed, Slot::Live)
    }

    fn supersede(&self, token: &ContinuationToken) -> Result<(), StoreError> {
        self.transition(token, Slot::Claimed, Slot::Superseded)
    }

    fn lookup(&self, token: &ContinuationToken) -> Result<Arc<Continuation>, StoreError> {
        self.with_unexpired(token, |entry| Ok(Arc::clone(&entry.continuation)))
    }

    fn invalidate_session(&self, session_id: &SessionId) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.continuation.session_id != *session_id);
        let removed = before - entries.len();
        if removed > 0 {
            tracing::debug!(session_id = %session_id, removed, "Flow session invalidated");
        }
        removed
    }

    fn session(&self, session_id: &SessionId) -> Option<FlowSession> {
        let now = self.clock.now();
        let entries = self.entries.read();
        let mut members: Vec<&Entry> = entries
            .values()
            .filter(|entry| {
                entry.continuation.session_id == *session_id
                    && !entry.continuation.is_expired_at(now)
            })
            .collect();
        members.sort_by_key(|entry| entry.seq);

        let first = members.first()?;
        let live: Vec<ContinuationToken> = members
            .iter()
            .filter(|entry| entry.slot == Slot::Live)
            .map(|entry| entry.continuation.id.clone())
            .collect();

        Some(FlowSession {
            id: *session_id,
            flow: first.continuation.flow.clone(),
            root: first.continuation.root_id.clone(),
            current: live.last().cloned(),
            live,
            stored: members.len(),
        })
    }

    fn evict_oldest(&self) -> Option<ContinuationToken> {
        let mut entries = self.entries.write();
        let oldest = entries
            .iter()
            .filter(|(_, entry)| entry.slot != Slot::Claimed)
            .min_by_key(|(_, entry)| entry.seq)
            .map(|(token, _)| token.clone())?;

        entries.remove(&oldest);
        tracing::warn!(token = %oldest, "Evicted oldest continuation");
        Some(oldest)
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

fn not_found(token: &ContinuationToken) -> StoreError {
    StoreError::NotFound {
        token: token.clone(),
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>, StoreError> {
    let ttl_delta =
        chrono::Duration::from_std(ttl).map_err(|e| StoreError::InvalidTtl(e.to_string()))?;
    now.checked_add_signed(ttl_delta)
        .ok_or_else(|| StoreError::InvalidTtl(format!("{:?} overflows the calendar", ttl)))
}

fn purge_expired(entries: &mut HashMap<ContinuationToken, Entry>, now: DateTime<Utc>) -> usize {
    let before = entries.len();
    entries.retain(|_, entry| !entry.continuation.is_expired_at(now));
    before - entries.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ManualClock, Page};
    use serde_json::json;

    fn draft(session_id: SessionId, point: &str) -> ContinuationDraft {
        ContinuationDraft {
            session_id,
            flow: "registration".to_string(),
            root_id: None,
            parent_id: None,
            bookmark: true,
            point: point.to_string(),
            state: json!({ "step": point }),
            attributes: Default::default(),
            page: Page::new(format!("registration/{}", point)),
        }
    }

    fn store_with_clock() -> (MemoryContinuationStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let store = MemoryContinuationStore::with_clock(clock.clone());
        (store, clock)
    }

    #[test]
    fn put_then_get_returns_same_continuation() {
        let (store, _clock) = store_with_clock();
        let session = SessionId::generate();

        let token = store.put(draft(session, "AskName"), None).unwrap();
        let stored = store.get(&token).unwrap();

        assert_eq!(stored.id, token);
        assert_eq!(stored.session_id, session);
        assert_eq!(stored.point, "AskName");
        assert_eq!(stored.state, json!({ "step": "AskName" }));
        assert_eq!(stored.expires_at - stored.created_at, chrono::Duration::hours(1));
    }

    #[test]
    fn get_after_expiry_fails_and_purges() {
        let (store, clock) = store_with_clock();
        let token = store
            .put(
                draft(SessionId::generate(), "AskName"),
                Some(Duration::from_secs(30)),
            )
            .unwrap();

        clock.advance(chrono::Duration::seconds(29));
        assert!(store.get(&token).is_ok());

        clock.advance(chrono::Duration::seconds(1));
        assert!(matches!(store.get(&token), Err(StoreError::Expired { .. })));
        assert!(store.is_empty());
        assert!(matches!(store.get(&token), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn zero_ttl_is_immediately_unreachable() {
        let (store, _clock) = store_with_clock();
        let token = store
            .put(draft(SessionId::generate(), "AskName"), Some(Duration::ZERO))
            .unwrap();

        assert!(matches!(store.get(&token), Err(StoreError::Expired { .. })));
    }

    #[test]
    fn invalidate_removes_entry() {
        let (store, _clock) = store_with_clock();
        let token = store.put(draft(SessionId::generate(), "Upload"), None).unwrap();

        assert!(store.invalidate(&token));
        assert!(!store.invalidate(&token));
        assert!(matches!(store.get(&token), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn sweep_removes_only_expired_entries() {
        let (store, clock) = store_with_clock();
        let session = SessionId::generate();
        store
            .put(draft(session, "Short"), Some(Duration::from_secs(10)))
            .unwrap();
        let long = store
            .put(draft(session, "Long"), Some(Duration::from_secs(100)))
            .unwrap();

        clock.advance(chrono::Duration::seconds(10));
        assert_eq!(store.sweep(clock.now()), 1);
        assert_eq!(store.len(), 1);
        assert!(store.get(&long).is_ok());
    }

    #[test]
    fn full_store_reports_resource_exhausted() {
        let (store, _clock) = store_with_clock();
        let store = store.with_capacity(2);
        let session = SessionId::generate();

        store.put(draft(session, "One"), None).unwrap();
        store.put(draft(session, "Two"), None).unwrap();
        let result = store.put(draft(session, "Three"), None);

        assert_eq!(result, Err(StoreError::ResourceExhausted { capacity: 2 }));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn full_store_reclaims_expired_space_before_failing() {
        let (store, clock) = store_with_clock();
        let store = store.with_capacity(1);

        store
            .put(draft(SessionId::generate(), "Old"), Some(Duration::from_secs(5)))
            .unwrap();
        clock.advance(chrono::Duration::seconds(5));

        assert!(store.put(draft(SessionId::generate(), "New"), None).is_ok());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn claim_is_exclusive_until_released() {
        let (store, _clock) = store_with_clock();
        let token = store.put(draft(SessionId::generate(), "AskName"), None).unwrap();

        assert!(store.claim(&token).is_ok());
        assert!(matches!(store.claim(&token), Err(StoreError::Claimed { .. })));
        assert!(matches!(store.get(&token), Err(StoreError::Claimed { .. })));

        store.release(&token).unwrap();
        assert!(store.claim(&token).is_ok());
    }

    #[test]
    fn superseded_entry_cannot_be_claimed_but_can_be_looked_up() {
        let (store, _clock) = store_with_clock();
        let token = store.put(draft(SessionId::generate(), "AskName"), None).unwrap();

        store.claim(&token).unwrap();
        store.supersede(&token).unwrap();

        assert!(matches!(store.claim(&token), Err(StoreError::NotFound { .. })));
        assert!(matches!(store.get(&token), Err(StoreError::NotFound { .. })));
        assert_eq!(store.lookup(&token).unwrap().point, "AskName");
    }

    #[test]
    fn release_requires_claim() {
        let (store, _clock) = store_with_clock();
        let token = store.put(draft(SessionId::generate(), "AskName"), None).unwrap();

        assert!(matches!(
            store.release(&token),
            Err(StoreError::NotClaimed { .. })
        ));
        assert!(matches!(
            store.supersede(&ContinuationToken::from("missing")),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn invalidate_session_leaves_other_sessions_alone() {
        let (store, _clock) = store_with_clock();
        let a = SessionId::generate();
        let b = SessionId::generate();
        store.put(draft(a, "One"), None).unwrap();
        store.put(draft(a, "Two"), None).unwrap();
        let kept = store.put(draft(b, "One"), None).unwrap();

        assert_eq!(store.invalidate_session(&a), 2);
        assert_eq!(store.len(), 1);
        assert!(store.get(&kept).is_ok());
    }

    #[test]
    fn evict_oldest_skips_claimed_entries() {
        let (store, clock) = store_with_clock();
        let session = SessionId::generate();
        let first = store.put(draft(session, "First"), None).unwrap();
        clock.advance(chrono::Duration::seconds(1));
        let second = store.put(draft(session, "Second"), None).unwrap();

        store.claim(&first).unwrap();
        assert_eq!(store.evict_oldest(), Some(second));
        assert_eq!(store.evict_oldest(), None);
    }

    #[test]
    fn checkpoint_round_trip_preserves_slots() {
        let (store, _clock) = store_with_clock();
        let session = SessionId::generate();
        let used = store.put(draft(session, "Used"), None).unwrap();
        let live = store.put(draft(session, "Live"), None).unwrap();
        store.claim(&used).unwrap();
        store.supersede(&used).unwrap();

        let checkpoint = store.checkpoint();
        let (copy, _clock) = store_with_clock();
        assert_eq!(copy.restore(&checkpoint).unwrap(), 2);

        assert!(copy.get(&live).is_ok());
        assert!(copy.get(&used).is_err());
        assert!(copy.lookup(&used).is_ok());
    }

    #[test]
    fn restore_rejects_unknown_version() {
        let (store, _clock) = store_with_clock();
        let mut checkpoint = store.checkpoint();
        checkpoint.version = CHECKPOINT_VERSION + 1;

        assert!(matches!(
            store.restore(&checkpoint),
            Err(CheckpointError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn restore_over_capacity_leaves_store_untouched() {
        let (source, _clock) = store_with_clock();
        let session = SessionId::generate();
        for point in ["One", "Two", "Three"] {
            source.put(draft(session, point), None).unwrap();
        }
        let checkpoint = source.checkpoint();

        let (target, _clock) = store_with_clock();
        let target = target.with_capacity(2);

        assert!(matches!(
            target.restore(&checkpoint),
            Err(CheckpointError::ValidationFailed(_))
        ));
        assert!(target.is_empty());
    }

    #[test]
    fn restore_counts_entries_already_held() {
        let (source, _clock) = store_with_clock();
        let session = SessionId::generate();
        let kept = source.put(draft(session, "One"), None).unwrap();
        source.put(draft(session, "Two"), None).unwrap();
        let checkpoint = source.checkpoint();

        let (target, _clock) = store_with_clock();
        let target = target.with_capacity(2);
        target.put(draft(SessionId::generate(), "Other"), None).unwrap();

        assert!(target.restore(&checkpoint).is_err());
        assert_eq!(target.len(), 1);
        assert!(target.get(&kept).is_err());
    }

    #[test]
    fn first_draft_becomes_session_root() {
        let (store, _clock) = store_with_clock();
        let session = SessionId::generate();
        let root = store.put(draft(session, "One"), None).unwrap();

        let mut next = draft(session, "Two");
        next.root_id = Some(root.clone());
        next.parent_id = Some(root.clone());
        let second = store.put(next, None).unwrap();

        assert_eq!(store.get(&root).unwrap().root_id, root);
        assert_eq!(store.get(&second).unwrap().root_id, root);
    }

    #[test]
    fn session_view_tracks_current_live_entry() {
        let (store, _clock) = store_with_clock();
        let session = SessionId::generate();
        let root = store.put(draft(session, "One"), None).unwrap();
        let mut next = draft(session, "Two");
        next.root_id = Some(root.clone());
        let second = store.put(next, None).unwrap();
        store.put(draft(SessionId::generate(), "Elsewhere"), None).unwrap();

        store.claim(&root).unwrap();
        store.supersede(&root).unwrap();

        let view = store.session(&session).unwrap();
        assert_eq!(view.root, root);
        assert_eq!(view.current, Some(second.clone()));
        assert_eq!(view.live, vec![second]);
        assert_eq!(view.stored, 2);
        assert_eq!(view.flow, "registration");

        store.invalidate_session(&session);
        assert!(store.session(&session).is_none());
    }

    #[test]
    fn evict_oldest_uses_insertion_order_when_timestamps_tie() {
        let (store, _clock) = store_with_clock();
        let session = SessionId::generate();
        let first = store.put(draft(session, "First"), None).unwrap();
        store.put(draft(session, "Second"), None).unwrap();

        assert_eq!(store.evict_oldest(), Some(first));
    }
}
