/// Search service client for index, data source, skillset and indexer management.
///
/// Authenticated with the service admin key. Resource bodies come from
/// `schema`; ordering and create/upsert policy live in `provision`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::{debug, info};

use crate::config::SearchServiceConfig;
use crate::errors::{azure_error_message, PlatformError};

pub mod provision;
pub mod schema;

#[cfg(test)]
pub(crate) mod fake;

use schema::{ResourceKind, SearchResource};

pub const SEARCH_API_VERSION: &str = "2024-07-01";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait]
pub trait SearchPlatform: Send + Sync {
    /// True if a resource of this kind and name is already defined.
    async fn exists(&self, kind: ResourceKind, name: &str) -> Result<bool, PlatformError>;

    /// Creates the resource. Fails if one with the same name exists.
    async fn create(&self, resource: &SearchResource) -> Result<(), PlatformError>;

    /// Creates the resource or replaces an existing definition.
    async fn create_or_update(&self, resource: &SearchResource) -> Result<(), PlatformError>;

    /// Queues an on-demand indexer run.
    async fn run_indexer(&self, name: &str) -> Result<(), PlatformError>;
}

#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: String,
    admin_key: String,
}

impl SearchClient {
    pub fn new(config: &SearchServiceConfig) -> Result<Self, PlatformError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            admin_key: config.admin_key.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        self.client
            .request(
                method,
                format!("{}/{}?api-version={}", self.endpoint, path, SEARCH_API_VERSION),
            )
            .header("api-key", &self.admin_key)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<StatusCode, PlatformError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message: azure_error_message(&body),
            });
        }

        Ok(status)
    }
}

#[async_trait]
impl SearchPlatform for SearchClient {
    async fn exists(&self, kind: ResourceKind, name: &str) -> Result<bool, PlatformError> {
        let path = format!("{}/{name}", kind.collection());
        match self.execute(self.request(reqwest::Method::GET, &path)).await {
            Ok(_) => Ok(true),
            Err(PlatformError::Api { status: 404, .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn create(&self, resource: &SearchResource) -> Result<(), PlatformError> {
        let kind = resource.kind();
        let request = self
            .request(reqwest::Method::POST, kind.collection())
            .json(resource);
        self.execute(request).await?;
        debug!("Created {} '{}'", kind.label(), resource.name());
        Ok(())
    }

    async fn create_or_update(&self, resource: &SearchResource) -> Result<(), PlatformError> {
        let kind = resource.kind();
        let path = format!("{}/{}", kind.collection(), resource.name());
        let request = self.request(reqwest::Method::PUT, &path).json(resource);
        let status = self.execute(request).await?;
        debug!("Upserted {} '{}' ({status})", kind.label(), resource.name());
        Ok(())
    }

    async fn run_indexer(&self, name: &str) -> Result<(), PlatformError> {
        let path = format!("indexers/{name}/run");
        match self.execute(self.request(reqwest::Method::POST, &path)).await {
            Ok(_) => {
                info!("Indexer '{name}' run queued");
                Ok(())
            }
            Err(PlatformError::Api { status: 404, .. }) => {
                Err(PlatformError::NotFound(format!("indexer '{name}'")))
            }
            Err(err) => Err(err),
        }
    }
}
