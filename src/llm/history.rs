//! Per-session conversation histories with idle expiry and a session cap.

use super::client::ChatMessage;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Ordered, append-only message log for one session.
#[derive(Debug, Default, Clone)]
pub struct History {
    messages: Vec<ChatMessage>,
}

impl History {
    /// Messages in the order they were exchanged.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing has been exchanged yet.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Record a completed exchange.
    pub fn push_exchange(&mut self, user: ChatMessage, assistant: ChatMessage) {
        self.messages.push(user);
        self.messages.push(assistant);
    }
}

/// History handle shared between the store and the turn currently using it.
///
/// Holding the lock serializes turns on the session.
pub type SharedHistory = Arc<Mutex<History>>;

/// Storage for session histories, keyed by caller-chosen session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// History for `session_id`, created empty on first reference.
    async fn history(&self, session_id: &str) -> SharedHistory;

    /// Drop a session. Returns whether it existed.
    async fn remove(&self, session_id: &str) -> bool;

    /// Number of live sessions.
    async fn session_count(&self) -> usize;
}

struct SessionEntry {
    history: SharedHistory,
    last_access: Instant,
}

impl SessionEntry {
    fn in_use(&self) -> bool {
        Arc::strong_count(&self.history) > 1
    }
}

/// In-process session store. Histories are lost on restart.
///
/// Sessions idle for longer than the TTL are dropped on the next access, and once more than
/// `max_sessions` exist the least recently used idle sessions are evicted.
pub struct InMemorySessionStore {
    ttl: Duration,
    max_sessions: usize,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    pub fn new(ttl: Duration, max_sessions: usize) -> Self {
        Self {
            ttl,
            max_sessions: max_sessions.max(1),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn evict_expired(&self, sessions: &mut HashMap<String, SessionEntry>, now: Instant) {
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.in_use() || now.duration_since(entry.last_access) < self.ttl
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted idle sessions");
        }
    }

    fn evict_over_capacity(&self, sessions: &mut HashMap<String, SessionEntry>, keep: &str) {
        while sessions.len() > self.max_sessions {
            let oldest = sessions
                .iter()
                .filter(|(id, entry)| id.as_str() != keep && !entry.in_use())
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(id, _)| id.clone());
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                    tracing::debug!(session_id = %id, "Evicted least recently used session");
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn history(&self, session_id: &str) -> SharedHistory {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        self.evict_expired(&mut sessions, now);

        let entry = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(session_id, "Created session history");
                SessionEntry {
                    history: SharedHistory::default(),
                    last_access: now,
                }
            });
        entry.last_access = now;
        let history = Arc::clone(&entry.history);

        self.evict_over_capacity(&mut sessions, session_id);
        history
    }

    async fn remove(&self, session_id: &str) -> bool {
        self.sessions.lock().await.remove(session_id).is_some()
    }

    async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
