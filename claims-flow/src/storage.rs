use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::{context::Context, error::Result};

/// Session information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub graph_id: String,
    pub current_task_id: String,
    pub status_message: Option<String>,
    #[serde(skip)]
    pub context: Context,
}

impl Session {
    pub fn new_from_task(sid: String, graph_id: &str, task_name: &str) -> Self {
        Self {
            id: sid,
            graph_id: graph_id.to_string(),
            current_task_id: task_name.to_string(),
            status_message: None,
            context: Context::new(),
        }
    }
}

/// Trait for storing and retrieving sessions
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn save(&self, session: Session) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Session>>;
    /// Remove a session; returns whether it existed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

struct StoredSession {
    session: Session,
    last_access: Instant,
}

/// In-memory session storage with optional idle expiry.
///
/// A session idle for longer than the TTL is treated as absent and evicted on
/// the next lookup or by [`InMemorySessionStorage::purge_expired`].
pub struct InMemorySessionStorage {
    sessions: Arc<DashMap<String, StoredSession>>,
    ttl: Option<Duration>,
}

impl InMemorySessionStorage {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl: None,
        }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            ttl: Some(ttl),
        }
    }

    fn is_expired(&self, stored: &StoredSession, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.duration_since(stored.last_access) > ttl)
    }

    /// Drop every expired session, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, stored| !self.is_expired(stored, now));
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for InMemorySessionStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStorage for InMemorySessionStorage {
    async fn save(&self, session: Session) -> Result<()> {
        self.sessions.insert(
            session.id.clone(),
            StoredSession {
                session,
                last_access: Instant::now(),
            },
        );
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        let now = Instant::now();
        {
            let Some(mut entry) = self.sessions.get_mut(id) else {
                return Ok(None);
            };
            if !self.is_expired(&entry, now) {
                entry.last_access = now;
                return Ok(Some(entry.session.clone()));
            }
        }

        debug!(session_id = %id, "Evicting expired session");
        self.sessions.remove(id);
        Ok(None)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.sessions.remove(id).is_some())
    }
}
