pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::chat::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::handle_chat_page))
        .route("/health", get(health::health_handler))
        .route("/api/v1/sessions", post(handlers::handle_create_session))
        .route("/api/v1/sessions/:id", get(handlers::handle_get_session))
        .route(
            "/api/v1/sessions/:id/messages",
            post(handlers::handle_submit_question),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use chrono::Utc;
    use uuid::Uuid;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::foundry::fake::{FakePlatform, RunGate};
    use crate::foundry::prompts::wrap_job_description;

    const QUESTION: &str = "Find a Python backend engineer with 5 years experience";

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn create_session(router: &Router) -> String {
        let (status, body) = send(router, Request::post("/api/v1/sessions").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_question_round_trip_keeps_raw_text_in_transcript() {
        let platform = Arc::new(FakePlatform::new().with_reply(&["alice.pdf: Suitable"]));
        let router = build_router(AppState::new(platform.clone(), "agent-1"));
        let session_id = create_session(&router).await;

        let (status, body) = send(
            &router,
            post_json(
                &format!("/api/v1/sessions/{session_id}/messages"),
                json!({ "question": QUESTION }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply"]["role"], "assistant");
        assert_eq!(body["reply"]["content"], "alice.pdf: Suitable");

        let (status, body) = send(
            &router,
            Request::get(format!("/api/v1/sessions/{session_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transcript"][0], json!({"role": "user", "content": QUESTION}));

        let thread_id = body["thread_id"].as_str().unwrap();
        let sent = platform.messages(thread_id);
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].last_text(), Some(wrap_job_description(QUESTION).as_str()));
        assert_eq!(platform.state.lock().unwrap().runs.len(), 1);
    }

    #[tokio::test]
    async fn test_thread_id_constant_across_three_questions() {
        let platform = Arc::new(
            FakePlatform::new()
                .with_reply(&["one"])
                .with_reply(&["two"])
                .with_reply(&["three"]),
        );
        let router = build_router(AppState::new(platform.clone(), "agent-1"));
        let session_id = create_session(&router).await;

        let mut thread_ids = Vec::new();
        for question in ["first", "second", "third"] {
            let (status, _) = send(
                &router,
                post_json(
                    &format!("/api/v1/sessions/{session_id}/messages"),
                    json!({ "question": question }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);

            let (_, body) = send(
                &router,
                Request::get(format!("/api/v1/sessions/{session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
            thread_ids.push(body["thread_id"].as_str().unwrap().to_string());
        }

        assert!(thread_ids.iter().all(|id| id == &thread_ids[0]));
        assert_eq!(platform.state.lock().unwrap().created_threads.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_session_is_404() {
        let router = build_router(AppState::new(Arc::new(FakePlatform::new()), "agent-1"));

        let (status, body) = send(
            &router,
            post_json(
                &format!("/api/v1/sessions/{}/messages", Uuid::new_v4()),
                json!({ "question": QUESTION }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let platform = Arc::new(FakePlatform::new());
        let router = build_router(AppState::new(platform.clone(), "agent-1"));
        let session_id = create_session(&router).await;

        let (status, _) = send(
            &router,
            post_json(
                &format!("/api/v1/sessions/{session_id}/messages"),
                json!({ "question": "   " }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(platform.state.lock().unwrap().created_threads.is_empty());
    }

    #[tokio::test]
    async fn test_health_reports_session_count() {
        let router = build_router(AppState::new(Arc::new(FakePlatform::new()), "agent-1"));
        create_session(&router).await;

        let (status, body) = send(&router, Request::get("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sessions"], 1);
    }

    fn get_session(session_id: &str) -> Request<Body> {
        Request::get(format!("/api/v1/sessions/{session_id}"))
            .body(Body::empty())
            .unwrap()
    }

    fn gated_platform(reply: &str) -> (Arc<RunGate>, Arc<FakePlatform>) {
        let gate = Arc::new(RunGate::default());
        let platform = Arc::new(
            FakePlatform::new()
                .with_reply(&[reply])
                .with_run_gate(gate.clone()),
        );
        (gate, platform)
    }

    #[tokio::test]
    async fn test_missing_question_gets_json_envelope() {
        let platform = Arc::new(FakePlatform::new());
        let router = build_router(AppState::new(platform.clone(), "agent-1"));
        let session_id = create_session(&router).await;

        let (status, body) = send(
            &router,
            post_json(&format!("/api/v1/sessions/{session_id}/messages"), json!({})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(body["error"]["message"].as_str().unwrap().contains("question"));
        assert!(platform.state.lock().unwrap().created_threads.is_empty());
    }

    #[tokio::test]
    async fn test_expired_session_is_gone() {
        let state = AppState::new(Arc::new(FakePlatform::new()), "agent-1")
            .with_session_ttl(Duration::from_secs(60));
        let router = build_router(state.clone());
        let session_id = create_session(&router).await;

        let id = Uuid::parse_str(&session_id).unwrap();
        let stale = Utc::now() - chrono::Duration::minutes(2);
        state
            .sessions
            .get(id)
            .unwrap()
            .with_state(|session| session.last_active = stale);
        assert_eq!(state.sessions.prune_idle(Utc::now()), 1);

        let (status, body) = send(&router, get_session(&session_id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (status, _) = send(
            &router,
            post_json(
                &format!("/api/v1/sessions/{session_id}/messages"),
                json!({ "question": QUESTION }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_transcript_readable_while_turn_runs() {
        let (gate, platform) = gated_platform("alice.pdf: Suitable");
        let router = build_router(AppState::new(platform, "agent-1"));
        let session_id = create_session(&router).await;

        let pending = tokio::spawn(router.clone().oneshot(post_json(
            &format!("/api/v1/sessions/{session_id}/messages"),
            json!({ "question": QUESTION }),
        )));
        gate.entered.notified().await;

        let (status, body) = tokio::time::timeout(
            Duration::from_secs(5),
            send(&router, get_session(&session_id)),
        )
        .await
        .expect("session read waited for the running turn");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transcript"], json!([{"role": "user", "content": QUESTION}]));

        gate.release.add_permits(1);
        let response = pending.await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_turn_completes_after_client_disconnects() {
        let (gate, platform) = gated_platform("alice.pdf: Suitable");
        let state = AppState::new(platform, "agent-1");
        let router = build_router(state.clone());
        let session_id = create_session(&router).await;

        let client = tokio::spawn(router.clone().oneshot(post_json(
            &format!("/api/v1/sessions/{session_id}/messages"),
            json!({ "question": QUESTION }),
        )));
        gate.entered.notified().await;
        client.abort();
        assert!(client.await.unwrap_err().is_cancelled());

        gate.release.add_permits(1);
        let slot = state.sessions.get(Uuid::parse_str(&session_id).unwrap()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), async {
            while slot.is_busy() || slot.snapshot().transcript.len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("turn did not finish");

        let transcript = slot.snapshot().transcript;
        assert_eq!(transcript[0].content, QUESTION);
        assert_eq!(transcript[1].content, "alice.pdf: Suitable");
    }
}
