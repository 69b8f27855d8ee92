// Chat front-end: per-session context objects and the HTTP handlers that drive them.

pub mod handlers;
pub mod session;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use session::{ChatSession, SessionSlot};

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

/// All live chat sessions.
///
/// Sessions idle for longer than the TTL are dropped, either when a new one is
/// created or by the background sweeper. A session with a turn in flight is
/// never dropped.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<SessionSlot>>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn create(&self) -> Uuid {
        self.prune_idle(Utc::now());

        let session = ChatSession::new();
        let id = session.id;
        self.sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id, Arc::new(SessionSlot::new(session)));
        id
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<SessionSlot>> {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&id)
            .cloned()
    }

    /// Drops sessions idle past the TTL as of `now`. Returns how many went.
    pub fn prune_idle(&self, now: DateTime<Utc>) -> usize {
        let ttl = match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => ttl,
            Err(_) => return 0,
        };

        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = sessions.len();
        sessions.retain(|_, slot| {
            slot.is_busy() || now - slot.with_state(|session| session.last_active) <= ttl
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {evicted} idle chat session(s)");
        }
        evicted
    }

    /// Prunes idle sessions every `every` until the runtime shuts down.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                debug!("Sweeping idle chat sessions");
                store.prune_idle(Utc::now());
            }
        })
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
