//! Wire and domain types for the Foundry Agents API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a thread message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Sort order for listing thread messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    Ascending,
    Descending,
}

impl ListOrder {
    pub fn as_query(&self) -> &'static str {
        match self {
            ListOrder::Ascending => "asc",
            ListOrder::Descending => "desc",
        }
    }
}

/// One message in a thread, reduced to its text parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMessage {
    pub role: Role,
    pub text_parts: Vec<String>,
}

impl ThreadMessage {
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text_parts: vec![text.into()],
        }
    }

    /// The last text part, which is what the assistant settled on.
    pub fn last_text(&self) -> Option<&str> {
        self.text_parts.last().map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
}

impl RunStatus {
    /// States after which polling stops. `RequiresAction` is included because
    /// no client-side tools are registered, so nothing would ever resume the run.
    pub fn is_settled(&self) -> bool {
        !matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Completed)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<Value>,
}

impl Run {
    /// The platform's error payload rendered verbatim, or a description of the
    /// status when the platform supplied none.
    pub fn failure_detail(&self) -> String {
        match &self.last_error {
            Some(Value::Null) | None => format!("run ended with status {:?}", self.status),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Connection {
    pub id: String,
    pub name: String,
}

/// How the retrieval tool queries the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Simple,
    Semantic,
    Vector,
    VectorSimpleHybrid,
    VectorSemanticHybrid,
}

/// Binds an agent to one search index through a project connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchToolDescriptor {
    pub index_connection_id: String,
    pub index_name: String,
    pub query_type: QueryType,
    pub top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolDescriptor {
    AzureAiSearch(SearchToolDescriptor),
}

#[derive(Debug, Clone)]
pub struct AgentDefinition {
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub tools: Vec<ToolDescriptor>,
}

// ────────────────────────────────────────────────────────────────────────────
// Request / response bodies
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct CreateAgentRequest<'a> {
    pub model: &'a str,
    pub name: &'a str,
    pub instructions: &'a str,
    pub tools: Vec<ToolSpec>,
    pub tool_resources: ToolResources<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ToolSpec {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
}

#[derive(Debug, Default, Serialize)]
pub(crate) struct ToolResources<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azure_ai_search: Option<SearchResources<'a>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchResources<'a> {
    pub indexes: Vec<&'a SearchToolDescriptor>,
}

impl<'a> CreateAgentRequest<'a> {
    pub fn from_definition(definition: &'a AgentDefinition) -> Self {
        let mut tools = Vec::new();
        let mut indexes = Vec::new();
        for tool in &definition.tools {
            match tool {
                ToolDescriptor::AzureAiSearch(search) => {
                    tools.push(ToolSpec {
                        tool_type: "azure_ai_search",
                    });
                    indexes.push(search);
                }
            }
        }

        let tool_resources = ToolResources {
            azure_ai_search: (!indexes.is_empty()).then_some(SearchResources { indexes }),
        };

        Self {
            model: &definition.model,
            name: &definition.name,
            instructions: &definition.instructions,
            tools,
            tool_resources,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct IdResponse {
    pub id: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateMessageRequest<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRunRequest<'a> {
    pub assistant_id: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageList {
    pub data: Vec<MessageWire>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub last_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageWire {
    pub role: Role,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentPart {
    #[serde(rename = "type")]
    pub part_type: String,
    pub text: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextValue {
    pub value: String,
}

impl From<MessageWire> for ThreadMessage {
    fn from(wire: MessageWire) -> Self {
        let text_parts = wire
            .content
            .into_iter()
            .filter(|part| part.part_type == "text")
            .filter_map(|part| part.text.map(|t| t.value))
            .collect();
        Self {
            role: wire.role,
            text_parts,
        }
    }
}
