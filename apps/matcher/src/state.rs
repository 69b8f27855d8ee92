use std::sync::Arc;
use std::time::Duration;

use crate::chat::SessionStore;
use crate::foundry::AgentPlatform;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Agent platform client, shared by every session.
    pub platform: Arc<dyn AgentPlatform>,
    /// The pre-provisioned matching agent every turn runs against.
    pub agent_id: String,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(platform: Arc<dyn AgentPlatform>, agent_id: impl Into<String>) -> Self {
        Self {
            platform,
            agent_id: agent_id.into(),
            sessions: SessionStore::default(),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.sessions = SessionStore::new(ttl);
        self
    }
}
