use std::str::FromStr;

use thiserror::Error;

use crate::search::provision::ProvisionMode;

pub const DEFAULT_INDEXER_NAME: &str = "cv-indexer";
pub const DEFAULT_DATA_SOURCE_NAME: &str = "cv-data-source";
pub const DEFAULT_SEARCH_INDEX_NAME: &str = "cv-index";
pub const DEFAULT_SKILLSET_NAME: &str = "cv-skillset";
/// text-embedding-3-small
pub const DEFAULT_EMBEDDING_DIMENSIONS: u32 = 1536;
pub const DEFAULT_FOUNDRY_API_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Required environment variable '{0}' is not set")]
    Missing(String),

    #[error("Environment variable '{name}' has an invalid value '{value}'")]
    Invalid { name: String, value: String },
}

/// Source of configuration values. The process environment in production,
/// a map in tests.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Loads `.env` if present; ignores a missing file.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Returns the value of a required environment variable.
pub fn env(name: &str) -> Result<String, ConfigError> {
    require(&process_env, name)
}

/// Empty values are treated the same as unset ones.
pub fn require(lookup: Lookup<'_>, key: &str) -> Result<String, ConfigError> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key.to_string())),
    }
}

fn optional(lookup: Lookup<'_>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn or_default(lookup: Lookup<'_>, key: &str, default: &str) -> String {
    optional(lookup, key).unwrap_or_else(|| default.to_string())
}

fn parse_or<T: FromStr>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T, ConfigError> {
    match optional(lookup, key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
            name: key.to_string(),
            value: raw,
        }),
    }
}

/// Connection to the Foundry project that hosts agents, threads and connections.
#[derive(Debug, Clone)]
pub struct FoundryConfig {
    pub project_endpoint: String,
    /// Fixed bearer token. When unset, tokens come from the Azure credential chain.
    pub access_token: Option<String>,
    pub api_version: String,
}

impl FoundryConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            project_endpoint: require(lookup, "FOUNDRY_PROJECT_ENDPOINT")?,
            access_token: optional(lookup, "FOUNDRY_ACCESS_TOKEN"),
            api_version: or_default(lookup, "FOUNDRY_API_VERSION", DEFAULT_FOUNDRY_API_VERSION),
        })
    }
}

/// Settings needed only when creating the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub model_deployment: String,
    pub search_connection_name: String,
    pub search_index_name: String,
    pub search_filter: Option<String>,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            model_deployment: require(lookup, "FOUNDRY_MODEL_DEPLOYMENT_NAME")?,
            search_connection_name: require(lookup, "AZURE_AI_SEARCH_CONNECTION_NAME")?,
            search_index_name: require(lookup, "AI_SEARCH_INDEX_NAME")?,
            search_filter: optional(lookup, "AI_SEARCH_FILTER"),
        })
    }
}

/// Chat server configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub agent_id: String,
    pub port: u16,
    pub rust_log: String,
    /// Idle time after which a chat session is dropped.
    pub session_ttl: std::time::Duration,
}

impl ChatConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            agent_id: require(lookup, "FOUNDRY_AGENT_ID")?,
            port: parse_or(lookup, "PORT", 8080u16)?,
            rust_log: or_default(lookup, "RUST_LOG", "info"),
            session_ttl: std::time::Duration::from_secs(
                parse_or(lookup, "SESSION_TTL_MINUTES", 60u64)? * 60,
            ),
        })
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub connection_string: String,
    pub container: String,
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            connection_string: require(lookup, "AZURE_STORAGE_CONNECTION_STRING")?,
            container: require(lookup, "BLOB_CONTAINER_NAME")?,
        })
    }
}

/// Azure OpenAI deployment used by the embedding skill.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub dimensions: u32,
}

impl EmbeddingConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: require(lookup, "AZURE_OPENAI_ENDPOINT")?,
            api_key: require(lookup, "AZURE_OPENAI_API_KEY")?,
            deployment: require(lookup, "AZURE_OPENAI_EMBEDDING_DEPLOYMENT")?,
            dimensions: parse_or(
                lookup,
                "AZURE_OPENAI_EMBEDDING_DIM",
                DEFAULT_EMBEDDING_DIMENSIONS,
            )?,
        })
    }
}

/// Search service endpoint and admin key.
#[derive(Debug, Clone)]
pub struct SearchServiceConfig {
    pub endpoint: String,
    pub admin_key: String,
}

impl SearchServiceConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: require(lookup, "AZURE_SEARCH_ENDPOINT")?,
            admin_key: require(lookup, "AZURE_SEARCH_ADMIN_KEY")?,
        })
    }
}

/// Settings for triggering an on-demand indexer run.
#[derive(Debug, Clone)]
pub struct IndexerRunConfig {
    pub service: SearchServiceConfig,
    pub indexer_name: String,
}

impl IndexerRunConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            service: SearchServiceConfig::from_lookup(lookup)?,
            indexer_name: or_default(lookup, "SEARCH_INDEXER_NAME", DEFAULT_INDEXER_NAME),
        })
    }
}

/// Everything the search provisioner needs.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub service: SearchServiceConfig,
    pub index_name: String,
    pub data_source_name: String,
    pub indexer_name: String,
    pub skillset_name: String,
    pub provision_mode: ProvisionMode,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
}

impl SearchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            service: SearchServiceConfig::from_lookup(lookup)?,
            index_name: or_default(lookup, "SEARCH_INDEX_NAME", DEFAULT_SEARCH_INDEX_NAME),
            data_source_name: or_default(lookup, "DATA_SOURCE_NAME", DEFAULT_DATA_SOURCE_NAME),
            indexer_name: or_default(lookup, "SEARCH_INDEXER_NAME", DEFAULT_INDEXER_NAME),
            skillset_name: or_default(lookup, "SEARCH_SKILLSET_NAME", DEFAULT_SKILLSET_NAME),
            provision_mode: parse_or(lookup, "SEARCH_PROVISION_MODE", ProvisionMode::default())?,
            storage: StorageConfig::from_lookup(lookup)?,
            embedding: EmbeddingConfig::from_lookup(lookup)?,
        })
    }
}
