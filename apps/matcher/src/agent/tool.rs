//! Retrieval tool binder: turns a search connection name into the tool
//! descriptor attached to the agent.

use tracing::debug;

use crate::config::AgentConfig;
use crate::errors::PlatformError;
use crate::foundry::models::{QueryType, SearchToolDescriptor};
use crate::foundry::AgentPlatform;

/// Number of CV chunks the agent retrieves per query.
pub const SEARCH_TOP_K: u32 = 5;

/// Resolves a project connection name to its opaque connection id.
/// Not cached: each call asks the platform again.
pub async fn get_connection_id(
    platform: &dyn AgentPlatform,
    name: &str,
) -> Result<String, PlatformError> {
    let connection = platform.get_connection(name).await?;
    debug!("Resolved connection '{}' to {}", connection.name, connection.id);
    Ok(connection.id)
}

/// Builds the hybrid (vector + semantic) search tool for the configured index.
pub async fn build_search_tool(
    platform: &dyn AgentPlatform,
    config: &AgentConfig,
) -> Result<SearchToolDescriptor, PlatformError> {
    let index_connection_id = get_connection_id(platform, &config.search_connection_name).await?;

    Ok(SearchToolDescriptor {
        index_connection_id,
        index_name: config.search_index_name.clone(),
        query_type: QueryType::VectorSemanticHybrid,
        top_k: SEARCH_TOP_K,
        filter: config.search_filter.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundry::fake::FakePlatform;

    fn agent_config() -> AgentConfig {
        AgentConfig {
            model_deployment: "gpt-4.1-nano".to_string(),
            search_connection_name: "cv-search-connection".to_string(),
            search_index_name: "cv-index".to_string(),
            search_filter: Some("candidate_id ne 'draft.pdf'".to_string()),
        }
    }

    #[tokio::test]
    async fn test_build_search_tool_uses_resolved_connection() {
        let platform = FakePlatform::new().with_connection("cv-search-connection", "/conn/abc");

        let tool = build_search_tool(&platform, &agent_config()).await.unwrap();

        assert_eq!(tool.index_connection_id, "/conn/abc");
        assert_eq!(tool.index_name, "cv-index");
        assert_eq!(tool.query_type, QueryType::VectorSemanticHybrid);
        assert_eq!(tool.top_k, 5);
        assert_eq!(tool.filter.as_deref(), Some("candidate_id ne 'draft.pdf'"));
    }

    #[tokio::test]
    async fn test_unknown_connection_fails() {
        let platform = FakePlatform::new();

        let err = get_connection_id(&platform, "missing").await.unwrap_err();

        assert!(matches!(err, PlatformError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_connection_is_resolved_on_every_call() {
        let platform = FakePlatform::new().with_connection("cv-search-connection", "/conn/abc");

        build_search_tool(&platform, &agent_config()).await.unwrap();
        build_search_tool(&platform, &agent_config()).await.unwrap();

        assert_eq!(platform.state.lock().unwrap().connection_lookups, 2);
    }
}
