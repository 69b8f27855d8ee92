//! Agent definition: persona, matching procedure and retrieval tool, created in one call.

use tracing::info;

use crate::agent::tool::build_search_tool;
use crate::config::AgentConfig;
use crate::errors::PlatformError;
use crate::foundry::models::{AgentDefinition, SearchToolDescriptor, ToolDescriptor};
use crate::foundry::prompts::{AGENT_INSTRUCTIONS, AGENT_NAME};
use crate::foundry::AgentPlatform;

/// The full definition of the CV matching agent for a given model and search tool.
pub fn agent_definition(model: &str, search_tool: SearchToolDescriptor) -> AgentDefinition {
    AgentDefinition {
        name: AGENT_NAME.to_string(),
        model: model.to_string(),
        instructions: AGENT_INSTRUCTIONS.to_string(),
        tools: vec![ToolDescriptor::AzureAiSearch(search_tool)],
    }
}

/// Creates the matching agent with its search tool attached and returns the agent id.
///
/// Each call creates a new agent; the platform does not deduplicate by name.
pub async fn create_agent(
    platform: &dyn AgentPlatform,
    config: &AgentConfig,
) -> Result<String, PlatformError> {
    let search_tool = build_search_tool(platform, config).await?;
    let definition = agent_definition(&config.model_deployment, search_tool);

    let agent_id = platform.create_agent(&definition).await?;
    info!(
        "Agent '{}' created on model {} with index '{}'",
        definition.name, definition.model, config.search_index_name
    );
    Ok(agent_id)
}
