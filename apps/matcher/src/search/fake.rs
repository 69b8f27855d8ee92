//! In-memory search service for provisioning tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::PlatformError;
use crate::search::schema::{ResourceKind, SearchResource};
use crate::search::SearchPlatform;

#[derive(Default)]
pub struct FakeSearchState {
    pub resources: HashMap<(ResourceKind, String), Value>,
    pub creates: Vec<(ResourceKind, String)>,
    pub upserts: Vec<(ResourceKind, String)>,
    pub indexer_runs: Vec<String>,
}

#[derive(Default)]
pub struct FakeSearch {
    pub state: Mutex<FakeSearchState>,
    reject: Option<ResourceKind>,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any write of this kind fails with a 400.
    pub fn rejecting(mut self, kind: ResourceKind) -> Self {
        self.reject = Some(kind);
        self
    }

    pub fn holds(&self, kind: ResourceKind, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .resources
            .contains_key(&(kind, name.to_string()))
    }

    fn check(&self, kind: ResourceKind) -> Result<(), PlatformError> {
        if self.reject == Some(kind) {
            return Err(PlatformError::Api {
                status: 400,
                message: format!("invalid {} definition", kind.label()),
            });
        }
        Ok(())
    }

    fn store(&self, resource: &SearchResource) -> Result<(ResourceKind, String), PlatformError> {
        let key = (resource.kind(), resource.name().to_string());
        let body = serde_json::to_value(resource)?;
        self.state
            .lock()
            .unwrap()
            .resources
            .insert(key.clone(), body);
        Ok(key)
    }
}

#[async_trait]
impl SearchPlatform for FakeSearch {
    async fn exists(&self, kind: ResourceKind, name: &str) -> Result<bool, PlatformError> {
        Ok(self.holds(kind, name))
    }

    async fn create(&self, resource: &SearchResource) -> Result<(), PlatformError> {
        self.check(resource.kind())?;
        if self.holds(resource.kind(), resource.name()) {
            return Err(PlatformError::Api {
                status: 409,
                message: format!("'{}' already exists", resource.name()),
            });
        }
        let key = self.store(resource)?;
        self.state.lock().unwrap().creates.push(key);
        Ok(())
    }

    async fn create_or_update(&self, resource: &SearchResource) -> Result<(), PlatformError> {
        self.check(resource.kind())?;
        let key = self.store(resource)?;
        self.state.lock().unwrap().upserts.push(key);
        Ok(())
    }

    async fn run_indexer(&self, name: &str) -> Result<(), PlatformError> {
        if !self.holds(ResourceKind::Indexer, name) {
            return Err(PlatformError::NotFound(format!("indexer '{name}'")));
        }
        self.state
            .lock()
            .unwrap()
            .indexer_runs
            .push(name.to_string());
        Ok(())
    }
}
