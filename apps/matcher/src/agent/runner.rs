//! Conversation driver: one user turn against the matching agent.
//!
//! A turn is: append one user message, start one run and wait for it to settle,
//! then read back the newest assistant reply. Nothing is retried.

use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::PlatformError;
use crate::foundry::models::{ListOrder, Role, ThreadMessage};
use crate::foundry::prompts::NO_REPLY_FALLBACK;
use crate::foundry::AgentPlatform;

/// Result of one turn. Callers pick how to surface each kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The run succeeded. Holds the newest assistant text, or the fixed
    /// fallback when the agent wrote nothing.
    Answered(String),
    /// The run settled in a non-success state. Holds the platform's error payload.
    RunFailed(String),
    /// A request to the platform failed before the turn could finish.
    TransportFailed(String),
}

impl TurnOutcome {
    pub fn is_answered(&self) -> bool {
        matches!(self, TurnOutcome::Answered(_))
    }
}

impl fmt::Display for TurnOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnOutcome::Answered(text) => write!(f, "{text}"),
            TurnOutcome::RunFailed(detail) => write!(f, "Run failed: {detail}"),
            TurnOutcome::TransportFailed(detail) => write!(f, "Error when calling agent: {detail}"),
        }
    }
}

impl From<PlatformError> for TurnOutcome {
    fn from(err: PlatformError) -> Self {
        TurnOutcome::TransportFailed(err.to_string())
    }
}

/// Text of the chronologically last assistant message that carries text.
pub fn last_assistant_text(messages: &[ThreadMessage]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .filter(|m| m.role == Role::Assistant)
        .find_map(ThreadMessage::last_text)
}

/// Sends `content` on an existing thread and waits for the agent's answer.
pub async fn execute_turn(
    platform: &dyn AgentPlatform,
    thread_id: &str,
    agent_id: &str,
    content: &str,
) -> TurnOutcome {
    match try_execute_turn(platform, thread_id, agent_id, content).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!("Turn on thread {thread_id} failed in transport: {err}");
            err.into()
        }
    }
}

async fn try_execute_turn(
    platform: &dyn AgentPlatform,
    thread_id: &str,
    agent_id: &str,
    content: &str,
) -> Result<TurnOutcome, PlatformError> {
    platform
        .append_message(thread_id, Role::User, content)
        .await?;

    let run = platform
        .create_and_process_run(thread_id, agent_id)
        .await?;

    if !run.status.is_success() {
        let detail = run.failure_detail();
        warn!("Run {} on thread {thread_id} ended {:?}: {detail}", run.id, run.status);
        return Ok(TurnOutcome::RunFailed(detail));
    }

    let messages = platform
        .list_messages(thread_id, ListOrder::Ascending)
        .await?;

    let answer = last_assistant_text(&messages)
        .unwrap_or(NO_REPLY_FALLBACK)
        .to_string();
    info!("Run {} on thread {thread_id} answered ({} chars)", run.id, answer.len());
    Ok(TurnOutcome::Answered(answer))
}

/// One-shot driver: every call opens a brand-new thread, so there is no
/// continuity between calls.
pub async fn run_agent(platform: &dyn AgentPlatform, agent_id: &str, user_text: &str) -> TurnOutcome {
    let thread_id = match platform.create_thread().await {
        Ok(id) => id,
        Err(err) => return err.into(),
    };
    execute_turn(platform, &thread_id, agent_id, user_text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundry::fake::{FailingCall, FakePlatform};
    use serde_json::json;

    #[tokio::test]
    async fn test_failed_run_returns_platform_payload() {
        let platform = FakePlatform::new().with_failed_runs(json!({
            "code": "server_error",
            "message": "Sorry, something went wrong."
        }));

        let outcome = run_agent(&platform, "agent-1", "Find a data engineer").await;

        match &outcome {
            TurnOutcome::RunFailed(detail) => {
                assert!(detail.contains("server_error"));
                assert!(detail.contains("Sorry, something went wrong."));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(outcome.to_string().starts_with("Run failed: "));
    }

    #[tokio::test]
    async fn test_answer_is_last_assistant_message() {
        let platform = FakePlatform::new().with_reply(&["first draft", "final answer"]);

        let outcome = run_agent(&platform, "agent-1", "Find a data engineer").await;

        assert_eq!(outcome, TurnOutcome::Answered("final answer".to_string()));
    }

    #[tokio::test]
    async fn test_no_assistant_message_yields_fallback() {
        let platform = FakePlatform::new();

        let outcome = run_agent(&platform, "agent-1", "Find a data engineer").await;

        assert_eq!(outcome, TurnOutcome::Answered(NO_REPLY_FALLBACK.to_string()));
    }

    #[tokio::test]
    async fn test_each_call_uses_a_new_thread() {
        let platform = FakePlatform::new().with_reply(&["a"]).with_reply(&["b"]);

        run_agent(&platform, "agent-1", "one").await;
        run_agent(&platform, "agent-1", "two").await;

        let state = platform.state.lock().unwrap();
        assert_eq!(state.created_threads, vec!["thread_1", "thread_2"]);
        assert_eq!(state.runs.len(), 2);
    }

    #[tokio::test]
    async fn test_user_text_is_sent_unchanged() {
        let platform = FakePlatform::new().with_reply(&["ok"]);

        run_agent(&platform, "agent-1", "raw question").await;

        let messages = platform.messages("thread_1");
        assert_eq!(messages[0], ThreadMessage::text(Role::User, "raw question"));
    }

    #[tokio::test]
    async fn test_transport_error_is_reported_not_raised() {
        let platform = FakePlatform::new().failing_on(FailingCall::ListMessages);

        let outcome = run_agent(&platform, "agent-1", "question").await;

        assert!(matches!(outcome, TurnOutcome::TransportFailed(ref d) if d.contains("503")));
        assert!(outcome.to_string().starts_with("Error when calling agent: "));
    }

    #[tokio::test]
    async fn test_failed_append_starts_no_run() {
        let platform = FakePlatform::new().failing_on(FailingCall::AppendMessage);

        let outcome = run_agent(&platform, "agent-1", "question").await;

        assert!(matches!(outcome, TurnOutcome::TransportFailed(_)));
        assert!(platform.state.lock().unwrap().runs.is_empty());
    }

    #[test]
    fn test_last_assistant_text_skips_user_messages() {
        let messages = vec![
            ThreadMessage::text(Role::Assistant, "older"),
            ThreadMessage::text(Role::User, "follow-up"),
        ];
        assert_eq!(last_assistant_text(&messages), Some("older"));
    }

    #[test]
    fn test_last_assistant_text_ignores_textless_messages() {
        let messages = vec![
            ThreadMessage::text(Role::Assistant, "with text"),
            ThreadMessage {
                role: Role::Assistant,
                text_parts: vec![],
            },
        ];
        assert_eq!(last_assistant_text(&messages), Some("with text"));
    }

    #[test]
    fn test_outcome_serializes_with_kind_tag() {
        let value = serde_json::to_value(TurnOutcome::RunFailed("boom".to_string())).unwrap();
        assert_eq!(value, json!({"kind": "run_failed", "detail": "boom"}));
    }
}
