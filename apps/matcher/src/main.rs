use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use cv_matcher::config::{ChatConfig, FoundryConfig};
use cv_matcher::foundry::FoundryClient;
use cv_matcher::logging;
use cv_matcher::routes::build_router;
use cv_matcher::state::AppState;

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Missing required settings stop the server before anything is bound.
    let foundry = FoundryConfig::from_env()?;
    let chat = ChatConfig::from_env()?;

    logging::init(&chat.rust_log);

    info!("Starting CV chat agent v{}", env!("CARGO_PKG_VERSION"));

    let platform = FoundryClient::new(&foundry)?;
    let auth = if foundry.access_token.is_some() {
        "static token"
    } else {
        "Azure credential chain"
    };
    info!("Foundry client initialized ({}, {auth})", foundry.project_endpoint);

    let state = AppState::new(Arc::new(platform), chat.agent_id.clone())
        .with_session_ttl(chat.session_ttl);
    state.sessions.spawn_sweeper(SESSION_SWEEP_INTERVAL);
    info!(
        "Serving agent {} (idle sessions expire after {}s)",
        chat.agent_id,
        chat.session_ttl.as_secs()
    );

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", chat.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
