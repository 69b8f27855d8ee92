//! Brings the search resources into existence, in dependency order.
//!
//! Two policies:
//! - `CreateIfAbsent`: look each resource up and create it only when missing.
//!   Existing definitions are left untouched, even when they differ.
//! - `Upsert`: always send the full definition with create-or-update.
//!
//! The first failure aborts the run. Nothing already created is rolled back;
//! running again picks up where the last run stopped.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::config::SearchConfig;
use crate::search::schema::{cv_search_resources, ResourceKind, SearchResource};
use crate::search::SearchPlatform;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvisionMode {
    #[default]
    CreateIfAbsent,
    Upsert,
}

impl FromStr for ProvisionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create-if-absent" | "create" => Ok(ProvisionMode::CreateIfAbsent),
            "upsert" | "create-or-update" => Ok(ProvisionMode::Upsert),
            other => Err(format!(
                "unknown provision mode '{other}' (expected create-if-absent or upsert)"
            )),
        }
    }
}

impl fmt::Display for ProvisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProvisionMode::CreateIfAbsent => write!(f, "create-if-absent"),
            ProvisionMode::Upsert => write!(f, "upsert"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionOutcome {
    Created,
    AlreadyPresent,
    Upserted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedResource {
    pub kind: ResourceKind,
    pub name: String,
    pub outcome: ProvisionOutcome,
}

impl fmt::Display for ProvisionedResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.outcome {
            ProvisionOutcome::Created => "created",
            ProvisionOutcome::AlreadyPresent => "already exists",
            ProvisionOutcome::Upserted => "created or updated",
        };
        write!(f, "{} '{}' {verb}", capitalize(self.kind.label()), self.name)
    }
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub struct Provisioner<'a> {
    platform: &'a dyn SearchPlatform,
    mode: ProvisionMode,
}

impl<'a> Provisioner<'a> {
    pub fn new(platform: &'a dyn SearchPlatform, mode: ProvisionMode) -> Self {
        Self { platform, mode }
    }

    /// Applies each resource in slice order and reports what happened to it.
    pub async fn apply(&self, resources: &[SearchResource]) -> Result<Vec<ProvisionedResource>> {
        let mut report = Vec::with_capacity(resources.len());

        for resource in resources {
            let outcome = self.apply_one(resource).await.with_context(|| {
                format!(
                    "Failed to provision {} '{}'",
                    resource.kind().label(),
                    resource.name()
                )
            })?;

            let entry = ProvisionedResource {
                kind: resource.kind(),
                name: resource.name().to_string(),
                outcome,
            };
            info!("{entry}");
            report.push(entry);
        }

        Ok(report)
    }

    async fn apply_one(&self, resource: &SearchResource) -> Result<ProvisionOutcome> {
        match self.mode {
            ProvisionMode::Upsert => {
                self.platform.create_or_update(resource).await?;
                Ok(ProvisionOutcome::Upserted)
            }
            ProvisionMode::CreateIfAbsent => {
                if self.platform.exists(resource.kind(), resource.name()).await? {
                    return Ok(ProvisionOutcome::AlreadyPresent);
                }
                self.platform.create(resource).await?;
                Ok(ProvisionOutcome::Created)
            }
        }
    }
}

/// Index, data source, skillset, indexer.
pub async fn setup_search(
    platform: &dyn SearchPlatform,
    config: &SearchConfig,
    mode: ProvisionMode,
) -> Result<Vec<ProvisionedResource>> {
    info!("Provisioning search resources ({mode})");
    Provisioner::new(platform, mode)
        .apply(&cv_search_resources(config))
        .await
}
