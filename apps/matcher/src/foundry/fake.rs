//! In-memory `AgentPlatform` used by workflow tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Notify, Semaphore};

use super::models::{AgentDefinition, Connection, ListOrder, Role, Run, RunStatus, ThreadMessage};
use super::AgentPlatform;
use crate::errors::PlatformError;

/// Which call should fail with a transport-level error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailingCall {
    CreateThread,
    AppendMessage,
    Run,
    ListMessages,
}

#[derive(Default)]
pub(crate) struct FakeState {
    pub threads: HashMap<String, Vec<ThreadMessage>>,
    pub created_threads: Vec<String>,
    pub runs: Vec<(String, String)>,
    pub agents: Vec<AgentDefinition>,
    pub connection_lookups: usize,
}

/// Holds every run until the test adds a permit to `release`.
pub(crate) struct RunGate {
    pub entered: Notify,
    pub release: Semaphore,
}

impl Default for RunGate {
    fn default() -> Self {
        Self {
            entered: Notify::new(),
            release: Semaphore::new(0),
        }
    }
}

#[derive(Default)]
pub(crate) struct FakePlatform {
    pub state: Mutex<FakeState>,
    connections: HashMap<String, String>,
    replies: Mutex<VecDeque<Vec<String>>>,
    run_error: Option<Value>,
    failing: Option<FailingCall>,
    gate: Option<Arc<RunGate>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connection(mut self, name: &str, id: &str) -> Self {
        self.connections.insert(name.to_string(), id.to_string());
        self
    }

    /// Each run appends these assistant messages, in order, to the thread.
    pub fn with_reply(self, messages: &[&str]) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(messages.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn with_failed_runs(mut self, last_error: Value) -> Self {
        self.run_error = Some(last_error);
        self
    }

    pub fn failing_on(mut self, call: FailingCall) -> Self {
        self.failing = Some(call);
        self
    }

    pub fn with_run_gate(mut self, gate: Arc<RunGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn messages(&self, thread_id: &str) -> Vec<ThreadMessage> {
        self.state
            .lock()
            .unwrap()
            .threads
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    fn check(&self, call: FailingCall) -> Result<(), PlatformError> {
        if self.failing == Some(call) {
            return Err(PlatformError::Api {
                status: 503,
                message: format!("{call:?} unavailable"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl AgentPlatform for FakePlatform {
    async fn create_agent(&self, definition: &AgentDefinition) -> Result<String, PlatformError> {
        let mut state = self.state.lock().unwrap();
        state.agents.push(definition.clone());
        Ok(format!("asst_{}", state.agents.len()))
    }

    async fn create_thread(&self) -> Result<String, PlatformError> {
        self.check(FailingCall::CreateThread)?;
        let mut state = self.state.lock().unwrap();
        let id = format!("thread_{}", state.created_threads.len() + 1);
        state.created_threads.push(id.clone());
        state.threads.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn append_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), PlatformError> {
        self.check(FailingCall::AppendMessage)?;
        let mut state = self.state.lock().unwrap();
        let thread = state
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| PlatformError::NotFound(format!("thread '{thread_id}'")))?;
        thread.push(ThreadMessage::text(role, content));
        Ok(())
    }

    async fn create_and_process_run(
        &self,
        thread_id: &str,
        agent_id: &str,
    ) -> Result<Run, PlatformError> {
        self.check(FailingCall::Run)?;
        if let Some(ref gate) = self.gate {
            gate.entered.notify_one();
            let _permit = gate.release.acquire().await;
        }
        let mut state = self.state.lock().unwrap();
        state.runs.push((thread_id.to_string(), agent_id.to_string()));
        let run_id = format!("run_{}", state.runs.len());

        if let Some(ref error) = self.run_error {
            return Ok(Run {
                id: run_id,
                status: RunStatus::Failed,
                last_error: Some(error.clone()),
            });
        }

        let replies = self.replies.lock().unwrap().pop_front().unwrap_or_default();
        let thread = state
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| PlatformError::NotFound(format!("thread '{thread_id}'")))?;
        thread.extend(
            replies
                .into_iter()
                .map(|text| ThreadMessage::text(Role::Assistant, text)),
        );

        Ok(Run {
            id: run_id,
            status: RunStatus::Completed,
            last_error: None,
        })
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        order: ListOrder,
    ) -> Result<Vec<ThreadMessage>, PlatformError> {
        self.check(FailingCall::ListMessages)?;
        let mut messages = self.messages(thread_id);
        if order == ListOrder::Descending {
            messages.reverse();
        }
        Ok(messages)
    }

    async fn get_connection(&self, name: &str) -> Result<Connection, PlatformError> {
        self.state.lock().unwrap().connection_lookups += 1;
        self.connections
            .get(name)
            .map(|id| Connection {
                id: id.clone(),
                name: name.to_string(),
            })
            .ok_or_else(|| PlatformError::NotFound(format!("connection '{name}'")))
    }
}
