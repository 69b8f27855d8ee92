/// Foundry client: the single point of entry for all agent-platform calls.
///
/// ARCHITECTURAL RULE: No other module may call the Foundry project API directly.
/// Agents, threads, messages, runs and connection lookups all go through
/// the `AgentPlatform` trait, implemented here by `FoundryClient`.
///
/// Every request is attempted exactly once. Run completion is awaited by
/// polling with no overall deadline.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::config::FoundryConfig;
use auth::{AzureIdentityProvider, CachedToken, StaticToken, TokenProvider};
use crate::errors::{azure_error_message, PlatformError};

pub mod auth;
pub mod models;
pub mod prompts;

#[cfg(test)]
pub(crate) mod fake;

use models::{
    AgentDefinition, Connection, CreateAgentRequest, CreateMessageRequest, CreateRunRequest,
    IdResponse, ListOrder, MessageList, Role, Run, ThreadMessage,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const RUN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Operations the matching workflow needs from the agent platform.
///
/// Carried as `Arc<dyn AgentPlatform>` so the workflow can run against an
/// in-memory platform in tests.
#[async_trait]
pub trait AgentPlatform: Send + Sync {
    /// Creates an agent and returns its id.
    async fn create_agent(&self, definition: &AgentDefinition) -> Result<String, PlatformError>;

    /// Creates an empty thread and returns its id.
    async fn create_thread(&self) -> Result<String, PlatformError>;

    async fn append_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), PlatformError>;

    /// Starts a run and waits until it settles.
    async fn create_and_process_run(
        &self,
        thread_id: &str,
        agent_id: &str,
    ) -> Result<Run, PlatformError>;

    async fn list_messages(
        &self,
        thread_id: &str,
        order: ListOrder,
    ) -> Result<Vec<ThreadMessage>, PlatformError>;

    /// Looks up a project connection by name.
    async fn get_connection(&self, name: &str) -> Result<Connection, PlatformError>;
}

/// HTTP implementation of `AgentPlatform` against a Foundry project endpoint.
#[derive(Clone)]
pub struct FoundryClient {
    client: Client,
    endpoint: String,
    api_version: String,
    token: Arc<CachedToken>,
    poll_interval: Duration,
}

impl FoundryClient {
    /// Uses `access_token` when configured, otherwise the Azure credential chain.
    pub fn new(config: &FoundryConfig) -> Result<Self, PlatformError> {
        let provider: Arc<dyn TokenProvider> = match &config.access_token {
            Some(token) => Arc::new(StaticToken(token.clone())),
            None => Arc::new(AzureIdentityProvider::new()?),
        };
        Self::with_token_provider(config, provider)
    }

    pub fn with_token_provider(
        config: &FoundryConfig,
        provider: Arc<dyn TokenProvider>,
    ) -> Result<Self, PlatformError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: config.project_endpoint.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            token: Arc::new(CachedToken::new(provider)),
            poll_interval: RUN_POLL_INTERVAL,
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}?api-version={}",
            self.endpoint, path, self.api_version
        )
    }

    async fn get(&self, path: &str) -> Result<RequestBuilder, PlatformError> {
        let token = self.token.bearer().await?;
        Ok(self.client.get(self.url(path)).bearer_auth(token))
    }

    async fn post(&self, path: &str) -> Result<RequestBuilder, PlatformError> {
        let token = self.token.bearer().await?;
        Ok(self.client.post(self.url(path)).bearer_auth(token))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, PlatformError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message: azure_error_message(&body),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, PlatformError> {
        let request = self.get(&format!("threads/{thread_id}/runs/{run_id}")).await?;
        self.send(request).await
    }
}

#[async_trait]
impl AgentPlatform for FoundryClient {
    async fn create_agent(&self, definition: &AgentDefinition) -> Result<String, PlatformError> {
        let body = CreateAgentRequest::from_definition(definition);
        let request = self.post("assistants").await?.json(&body);
        let created: IdResponse = self.send(request).await?;
        info!("Created agent '{}' ({})", definition.name, created.id);
        Ok(created.id)
    }

    async fn create_thread(&self) -> Result<String, PlatformError> {
        let request = self.post("threads").await?.json(&serde_json::json!({}));
        let created: IdResponse = self.send(request).await?;
        debug!("Created thread {}", created.id);
        Ok(created.id)
    }

    async fn append_message(
        &self,
        thread_id: &str,
        role: Role,
        content: &str,
    ) -> Result<(), PlatformError> {
        let body = CreateMessageRequest {
            role: role.as_str(),
            content,
        };
        let request = self
            .post(&format!("threads/{thread_id}/messages"))
            .await?
            .json(&body);
        let created: IdResponse = self.send(request).await?;
        debug!("Appended {} message {} to thread {thread_id}", role.as_str(), created.id);
        Ok(())
    }

    async fn create_and_process_run(
        &self,
        thread_id: &str,
        agent_id: &str,
    ) -> Result<Run, PlatformError> {
        let body = CreateRunRequest {
            assistant_id: agent_id,
        };
        let request = self
            .post(&format!("threads/{thread_id}/runs"))
            .await?
            .json(&body);
        let mut run: Run = self.send(request).await?;
        debug!("Started run {} on thread {thread_id}", run.id);

        while !run.status.is_settled() {
            tokio::time::sleep(self.poll_interval).await;
            run = self.get_run(thread_id, &run.id).await?;
            debug!("Run {} status: {:?}", run.id, run.status);
        }

        Ok(run)
    }

    async fn list_messages(
        &self,
        thread_id: &str,
        order: ListOrder,
    ) -> Result<Vec<ThreadMessage>, PlatformError> {
        let path = format!("threads/{thread_id}/messages");
        let mut messages = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut request = self
                .get(&path)
                .await?
                .query(&[("order", order.as_query())]);
            if let Some(ref cursor) = after {
                request = request.query(&[("after", cursor.as_str())]);
            }

            let page: MessageList = self.send(request).await?;
            messages.extend(page.data.into_iter().map(ThreadMessage::from));

            match (page.has_more, page.last_id) {
                (true, Some(last_id)) => after = Some(last_id),
                _ => break,
            }
        }

        Ok(messages)
    }

    async fn get_connection(&self, name: &str) -> Result<Connection, PlatformError> {
        let request = self.get(&format!("connections/{name}")).await?;
        match self.send(request).await {
            Err(PlatformError::Api { status: 404, .. }) => {
                Err(PlatformError::NotFound(format!("connection '{name}'")))
            }
            other => other,
        }
    }
}
