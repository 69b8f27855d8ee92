//! Chat session: one visible transcript and one platform thread per session.
//!
//! The thread is created on the first question and reused for every later
//! turn, so the agent sees the whole conversation. The transcript shows the
//! user's question as typed; the platform receives it wrapped in the
//! structured-output template.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::runner::{execute_turn, TurnOutcome};
use crate::foundry::models::Role;
use crate::foundry::prompts::wrap_job_description;
use crate::foundry::AgentPlatform;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
}

/// Explicit per-session context, created once and handed to every turn.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub thread_id: Option<String>,
    pub transcript: Vec<TranscriptEntry>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            thread_id: None,
            transcript: Vec::new(),
            created_at: now,
            last_active: now,
        }
    }

    /// Records the question and returns the bound thread, if there is one yet.
    pub fn begin_turn(&mut self, question: &str) -> Option<String> {
        self.last_active = Utc::now();
        self.transcript.push(TranscriptEntry {
            role: Role::User,
            content: question.to_string(),
        });
        self.thread_id.clone()
    }

    pub fn bind_thread(&mut self, thread_id: &str) {
        info!("Session {} bound to thread {thread_id}", self.id);
        self.thread_id = Some(thread_id.to_string());
    }

    /// Turns the outcome into the assistant's transcript entry.
    pub fn finish_turn(&mut self, outcome: &TurnOutcome) -> TranscriptEntry {
        let content = match outcome {
            TurnOutcome::Answered(text) => text.clone(),
            TurnOutcome::RunFailed(detail) => format!("Agent failed: {detail}"),
            TurnOutcome::TransportFailed(_) => outcome.to_string(),
        };

        let reply = TranscriptEntry {
            role: Role::Assistant,
            content,
        };
        self.last_active = Utc::now();
        self.transcript.push(reply.clone());
        reply
    }
}

/// A session as stored by the server.
///
/// `state` is only ever locked briefly, never across an await, so readers
/// see the transcript while a turn is running. `turn` is held for a whole
/// turn and keeps one question per session in flight.
#[derive(Debug, Default)]
pub struct SessionSlot {
    state: Mutex<ChatSession>,
    turn: tokio::sync::Mutex<()>,
}

impl SessionSlot {
    pub fn new(session: ChatSession) -> Self {
        Self {
            state: Mutex::new(session),
            turn: tokio::sync::Mutex::new(()),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ChatSession> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> ChatSession {
        self.lock_state().clone()
    }

    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut ChatSession) -> R) -> R {
        f(&mut self.lock_state())
    }

    /// True while a turn is running.
    pub fn is_busy(&self) -> bool {
        self.turn.try_lock().is_err()
    }

    /// Runs one chat turn. Never fails: run failures and transport errors
    /// become the assistant's transcript entry.
    pub async fn submit(
        &self,
        platform: &dyn AgentPlatform,
        agent_id: &str,
        question: &str,
    ) -> TranscriptEntry {
        let _turn = self.turn.lock().await;

        let bound = self.with_state(|session| session.begin_turn(question));
        let outcome = match self.ensure_thread(platform, bound).await {
            Ok(thread_id) => {
                let prompt = wrap_job_description(question);
                execute_turn(platform, &thread_id, agent_id, &prompt).await
            }
            Err(outcome) => outcome,
        };

        self.with_state(|session| session.finish_turn(&outcome))
    }

    async fn ensure_thread(
        &self,
        platform: &dyn AgentPlatform,
        bound: Option<String>,
    ) -> Result<String, TurnOutcome> {
        if let Some(thread_id) = bound {
            return Ok(thread_id);
        }

        match platform.create_thread().await {
            Ok(thread_id) => {
                self.with_state(|session| session.bind_thread(&thread_id));
                Ok(thread_id)
            }
            Err(err) => {
                let id = self.with_state(|session| session.id);
                warn!("Session {id} could not open a thread: {err}");
                Err(err.into())
            }
        }
    }
}
