//! In-memory session store keyed by an opaque cookie token

use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use rand::Rng;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::chat::SessionState;

/// Session id length in bytes (32 bytes = 256 bits, hex-encoded to 64 chars)
const SESSION_ID_LENGTH: usize = 32;

struct SessionEntry {
    state: Arc<Mutex<SessionState>>,
    last_seen: DateTime<Utc>,
}

/// A session resolved for one request
///
/// The state mutex is held for a whole operation, which serializes
/// concurrent requests from the same client.
pub struct SessionHandle {
    pub id: String,
    pub state: Arc<Mutex<SessionState>>,
    /// True when the request carried no usable session and a cookie must be issued
    pub is_new: bool,
}

/// Per-client session states with idle expiry and a hard capacity
///
/// Every hit promotes the entry, so LRU order is also `last_seen` order and
/// expired sessions always sit at the cold end of the cache.
pub struct SessionStore {
    sessions: Mutex<LruCache<String, SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(10_000) {
        Some(n) => n,
        None => unreachable!(),
    };

    pub fn new(ttl_seconds: u64, max_sessions: usize) -> Self {
        let ttl_seconds = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        let capacity = NonZeroUsize::new(max_sessions).unwrap_or(Self::DEFAULT_CAPACITY);
        Self {
            sessions: Mutex::new(LruCache::new(capacity)),
            ttl: Duration::try_seconds(ttl_seconds).unwrap_or(Duration::MAX),
        }
    }

    /// Resolve the session for `id`, creating one with `init` when the id is
    /// absent, unknown or expired
    pub async fn get_or_create<F>(&self, id: Option<&str>, init: F) -> SessionHandle
    where
        F: FnOnce() -> SessionState,
    {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;

        if let Some(id) = id.filter(|id| is_valid_session_id(id)) {
            let mut expired = false;
            if let Some(entry) = sessions.get_mut(id) {
                if now - entry.last_seen <= self.ttl {
                    entry.last_seen = now;
                    return SessionHandle {
                        id: id.to_string(),
                        state: Arc::clone(&entry.state),
                        is_new: false,
                    };
                }
                expired = true;
            }
            if expired {
                sessions.pop(id);
                tracing::debug!("Session expired, starting a new one");
            }
        }

        let purged = Self::purge_expired_locked(&mut sessions, now, self.ttl);
        if purged > 0 {
            tracing::debug!(purged, remaining = sessions.len(), "Purged expired sessions");
        }

        let id = generate_session_id();
        let state = Arc::new(Mutex::new(init()));
        let evicted = sessions.push(
            id.clone(),
            SessionEntry {
                state: Arc::clone(&state),
                last_seen: now,
            },
        );
        if evicted.is_some() {
            tracing::warn!(
                capacity = sessions.cap().get(),
                "Session store full, evicted least recently used session"
            );
        }
        tracing::debug!(active_sessions = sessions.len(), "Created session");

        SessionHandle {
            id,
            state,
            is_new: true,
        }
    }

    /// Number of stored sessions, expired ones included until purged
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    pub async fn capacity(&self) -> usize {
        self.sessions.lock().await.cap().get()
    }

    /// Pop expired sessions from the cold end; stops at the first live one
    fn purge_expired_locked(
        sessions: &mut LruCache<String, SessionEntry>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> usize {
        let mut purged = 0;
        while let Some((_, entry)) = sessions.peek_lru() {
            if now - entry.last_seen <= ttl {
                break;
            }
            sessions.pop_lru();
            purged += 1;
        }
        purged
    }
}

fn generate_session_id() -> String {
    let bytes: [u8; SESSION_ID_LENGTH] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Well-formed ids only; anything else is treated as no session at all
pub fn is_valid_session_id(id: &str) -> bool {
    id.len() == SESSION_ID_LENGTH * 2 && id.bytes().all(|b| b.is_ascii_hexdigit())
}
