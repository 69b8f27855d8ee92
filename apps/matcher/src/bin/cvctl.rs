//! Operator CLI: provision search, trigger indexing, create the agent, browse
//! the CV container and ask one-off questions.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use cv_matcher::agent::factory::create_agent;
use cv_matcher::agent::runner::run_agent;
use cv_matcher::blob::{download_to_file, AzureBlobStore, BlobStore};
use cv_matcher::config::{
    AgentConfig, ChatConfig, FoundryConfig, IndexerRunConfig, SearchConfig, StorageConfig,
};
use cv_matcher::foundry::FoundryClient;
use cv_matcher::logging;
use cv_matcher::search::provision::{setup_search, ProvisionMode};
use cv_matcher::search::{SearchClient, SearchPlatform};

#[derive(Parser)]
#[command(
    name = "cvctl",
    about = "Provision and operate the CV matching agent",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the search index, data source, skillset and indexer.
    ///
    /// Safe to re-run. In `create-if-absent` mode existing resources are left
    /// as they are; `upsert` overwrites them with the current definitions.
    SetupSearch {
        /// Overrides SEARCH_PROVISION_MODE (`create-if-absent` or `upsert`).
        #[arg(long)]
        mode: Option<ProvisionMode>,
    },

    /// Start an on-demand run of the indexer.
    RunIndexer {
        /// Overrides SEARCH_INDEXER_NAME.
        #[arg(long)]
        name: Option<String>,
    },

    /// Create the matching agent and print its id.
    CreateAgent,

    /// List the CV files in the blob container.
    ListCvs,

    /// Download one CV from the blob container.
    DownloadCv {
        /// Blob name as shown by `list-cvs`.
        name: String,

        /// Destination file. Defaults to the blob's file name in the current directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Send one message to the agent on a fresh thread and print the answer.
    Ask {
        text: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cv_matcher::config::load_dotenv();
    logging::init("warn");

    match cli.command {
        Commands::SetupSearch { mode } => {
            let config = SearchConfig::from_env()?;
            let mode = mode.unwrap_or(config.provision_mode);
            let client = SearchClient::new(&config.service)?;

            let report = setup_search(&client, &config, mode).await?;
            for entry in &report {
                println!("{entry}");
            }
            println!("Search setup complete ({mode})");
        }

        Commands::RunIndexer { name } => {
            let config = IndexerRunConfig::from_env()?;
            let indexer_name = name.unwrap_or(config.indexer_name);
            let client = SearchClient::new(&config.service)?;

            client
                .run_indexer(&indexer_name)
                .await
                .with_context(|| format!("Failed to start indexer '{indexer_name}'"))?;
            println!("Indexer '{indexer_name}' started");
        }

        Commands::CreateAgent => {
            let foundry = FoundryConfig::from_env()?;
            let agent = AgentConfig::from_env()?;
            let client = FoundryClient::new(&foundry)?;

            let agent_id = create_agent(&client, &agent)
                .await
                .context("Failed to create agent")?;
            println!("Created agent, ID: {agent_id}");
            println!("Set FOUNDRY_AGENT_ID={agent_id} for the chat server");
        }

        Commands::ListCvs => {
            let storage = StorageConfig::from_env()?;
            let store = AzureBlobStore::new(&storage)?;

            let names = store.list_blobs(&storage.container).await?;
            for name in &names {
                println!("{name}");
            }
            println!("{} CV(s) in container '{}'", names.len(), storage.container);
        }

        Commands::DownloadCv { name, out } => {
            let storage = StorageConfig::from_env()?;
            let store = AzureBlobStore::new(&storage)?;

            let out = out.unwrap_or_else(|| default_output_path(&name));
            let written = download_to_file(&store, &storage.container, &name, &out).await?;
            println!("Downloaded '{name}' ({written} bytes) to {}", out.display());
        }

        Commands::Ask { text } => {
            let foundry = FoundryConfig::from_env()?;
            let chat = ChatConfig::from_env()?;
            let client = FoundryClient::new(&foundry)?;

            let outcome = run_agent(&client, &chat.agent_id, &text).await;
            if !outcome.is_answered() {
                bail!("{outcome}");
            }
            println!("{outcome}");
        }
    }

    Ok(())
}

/// Last path segment of a blob name.
fn default_output_path(blob_name: &str) -> PathBuf {
    let file_name = blob_name.rsplit('/').next().unwrap_or(blob_name);
    Path::new(".").join(file_name)
}
