//! Bearer tokens for the Foundry project API.
//!
//! Tokens come from a `TokenProvider`. `CachedToken` keeps the last one and
//! asks the provider again once it is within five minutes of expiry.

use std::sync::Arc;

use async_trait::async_trait;
use azure_core::auth::TokenCredential;
use azure_identity::{DefaultAzureCredential, TokenCredentialOptions};
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::PlatformError;

pub const FOUNDRY_SCOPE: &str = "https://ai.azure.com/.default";

const REFRESH_MARGIN_SECS: i64 = 300;

#[derive(Clone)]
pub struct BearerToken {
    pub secret: String,
    /// `None` for tokens that never expire from our point of view.
    pub expires_at: Option<DateTime<Utc>>,
}

impl BearerToken {
    fn is_fresh(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        match self.expires_at {
            Some(expires_at) => now + margin < expires_at,
            None => true,
        }
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self) -> Result<BearerToken, PlatformError>;
}

/// A token handed in through configuration.
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn fetch_token(&self) -> Result<BearerToken, PlatformError> {
        Ok(BearerToken {
            secret: self.0.clone(),
            expires_at: None,
        })
    }
}

/// Environment, managed identity and Azure CLI credentials, in that order.
pub struct AzureIdentityProvider {
    credential: DefaultAzureCredential,
}

impl AzureIdentityProvider {
    pub fn new() -> Result<Self, PlatformError> {
        let credential = DefaultAzureCredential::create(TokenCredentialOptions::default())
            .map_err(|e| PlatformError::Authentication(e.to_string()))?;
        Ok(Self { credential })
    }
}

#[async_trait]
impl TokenProvider for AzureIdentityProvider {
    async fn fetch_token(&self) -> Result<BearerToken, PlatformError> {
        let token = self
            .credential
            .get_token(&[FOUNDRY_SCOPE])
            .await
            .map_err(|e| PlatformError::Authentication(e.to_string()))?;

        Ok(BearerToken {
            secret: token.token.secret().to_string(),
            expires_at: DateTime::from_timestamp(token.expires_on.unix_timestamp(), 0),
        })
    }
}

pub struct CachedToken {
    provider: Arc<dyn TokenProvider>,
    cached: Mutex<Option<BearerToken>>,
    margin: Duration,
}

impl CachedToken {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            cached: Mutex::new(None),
            margin: Duration::seconds(REFRESH_MARGIN_SECS),
        }
    }

    /// Current token secret, fetching a new one when the cached token is stale.
    pub async fn bearer(&self) -> Result<String, PlatformError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.is_fresh(Utc::now(), self.margin) {
                return Ok(token.secret.clone());
            }
        }

        let token = self.provider.fetch_token().await?;
        debug!("Fetched Foundry access token (expires {:?})", token.expires_at);
        let secret = token.secret.clone();
        *cached = Some(token);
        Ok(secret)
    }
}
