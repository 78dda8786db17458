//! Shared server state

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crypto_session::ChannelSession;
use dashmap::DashMap;
use exchange_protocol::{SessionId, StatsResponse};

/// Idle time after which an HTTP session is dropped
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(300);

/// A stored HTTP session and when it was last touched
struct StoredSession {
    session: Arc<ChannelSession>,
    last_used: Instant,
}

/// Application state
#[derive(Clone)]
pub struct AppState {
    /// Sessions created over HTTP: SessionId -> responder session
    sessions: Arc<DashMap<SessionId, StoredSession>>,
    counters: Arc<Counters>,
    max_sessions: usize,
    session_ttl: Duration,
}

#[derive(Default)]
struct Counters {
    /// Slots taken in `sessions`, reserved before the insert
    stored: AtomicUsize,
    channels: AtomicUsize,
    sealed: AtomicU64,
    opened: AtomicU64,
}

impl AppState {
    pub fn new(max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            counters: Arc::new(Counters::default()),
            max_sessions,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Register a session under a fresh id
    ///
    /// Returns `None` when the store is full even after idle sessions have
    /// been evicted.
    pub fn insert(&self, session: ChannelSession) -> Option<SessionId> {
        if !self.reserve_slot() {
            self.evict_idle();
            if !self.reserve_slot() {
                return None;
            }
        }

        let id = SessionId::new();
        self.sessions.insert(
            id,
            StoredSession {
                session: Arc::new(session),
                last_used: Instant::now(),
            },
        );
        Some(id)
    }

    /// Look up a session and mark it used; the map guard is released before
    /// returning
    pub fn session(&self, id: &SessionId) -> Option<Arc<ChannelSession>> {
        self.sessions.get_mut(id).map(|mut entry| {
            entry.last_used = Instant::now();
            Arc::clone(&entry.session)
        })
    }

    /// Remove a session and drop its key material
    pub fn close(&self, id: &SessionId) -> bool {
        match self.sessions.remove(id) {
            Some((_, stored)) => {
                self.counters.stored.fetch_sub(1, Ordering::AcqRel);
                stored.session.close();
                true
            }
            None => false,
        }
    }

    /// Close and drop every session idle for longer than the TTL
    pub fn evict_idle(&self) -> usize {
        let now = Instant::now();
        let mut evicted = 0;
        self.sessions.retain(|_, stored| {
            if now.duration_since(stored.last_used) < self.session_ttl {
                return true;
            }
            stored.session.close();
            evicted += 1;
            false
        });
        if evicted > 0 {
            self.counters.stored.fetch_sub(evicted, Ordering::AcqRel);
        }
        evicted
    }

    fn reserve_slot(&self) -> bool {
        self.counters
            .stored
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |taken| {
                (taken < self.max_sessions).then_some(taken + 1)
            })
            .is_ok()
    }

    pub fn channel_opened(&self) {
        self.counters.channels.fetch_add(1, Ordering::Relaxed);
    }

    pub fn channel_closed(&self) {
        self.counters.channels.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_sealed(&self) {
        self.counters.sealed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_opened(&self) {
        self.counters.opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> StatsResponse {
        StatsResponse {
            sessions: self.sessions.len(),
            channels: self.counters.channels.load(Ordering::Relaxed),
            sealed: self.counters.sealed.load(Ordering::Relaxed),
            opened: self.counters.opened.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_session::ChannelState;
    use std::thread;

    #[test]
    fn test_insert_lookup_close() {
        let state = AppState::new(4);
        let id = state.insert(ChannelSession::new_responder()).unwrap();

        let session = state.session(&id).unwrap();
        assert_eq!(state.stats().sessions, 1);

        assert!(state.close(&id));
        assert_eq!(session.state(), ChannelState::Closed);
        assert!(state.session(&id).is_none());
        assert!(!state.close(&id));
    }

    #[test]
    fn test_capacity() {
        let state = AppState::new(1);
        let id = state.insert(ChannelSession::new_responder()).unwrap();
        assert!(state.insert(ChannelSession::new_responder()).is_none());

        state.close(&id);
        assert!(state.insert(ChannelSession::new_responder()).is_some());
    }

    #[test]
    fn test_idle_sessions_are_evicted() {
        let state = AppState::new(1).with_session_ttl(Duration::from_millis(20));
        let old_id = state.insert(ChannelSession::new_responder()).unwrap();
        let old = state.session(&old_id).unwrap();

        thread::sleep(Duration::from_millis(40));

        // Full store, but the only entry is idle
        let new_id = state.insert(ChannelSession::new_responder()).unwrap();
        assert_eq!(old.state(), ChannelState::Closed);
        assert!(state.session(&old_id).is_none());
        assert!(state.session(&new_id).is_some());
        assert_eq!(state.stats().sessions, 1);
    }

    #[test]
    fn test_recently_used_sessions_survive_eviction() {
        let state = AppState::new(4).with_session_ttl(Duration::from_secs(60));
        let id = state.insert(ChannelSession::new_responder()).unwrap();
        assert_eq!(state.evict_idle(), 0);
        assert!(state.session(&id).is_some());
    }

    #[test]
    fn test_concurrent_inserts_respect_limit() {
        let state = AppState::new(5);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let state = state.clone();
                thread::spawn(move || state.insert(ChannelSession::new_responder()).is_some())
            })
            .collect();

        let stored = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(stored, 5);
        assert_eq!(state.stats().sessions, 5);
    }
}
