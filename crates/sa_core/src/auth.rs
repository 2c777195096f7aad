use async_trait::async_trait;
use gcp_auth::TokenProvider;
use std::fmt;
use std::sync::Arc;
use crate::{Error, Result};

pub const LANGUAGE_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-language"];
pub const DATASTORE_SCOPES: &[&str] = &["https://www.googleapis.com/auth/datastore"];

/// Supplies OAuth bearer tokens for Google APIs.
///
/// Clients ask for a token on every request, so implementations that mint
/// tokens are expected to cache and refresh them.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self, scopes: &[&str]) -> Result<String>;
}

/// A fixed token taken from configuration. It is never refreshed.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StaticToken").field(&"<redacted>").finish()
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self, _scopes: &[&str]) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Application Default Credentials through `gcp_auth`: a service-account key
/// file, gcloud user credentials or the metadata server.
pub struct AdcTokenSource {
    provider: Arc<dyn TokenProvider>,
}

impl AdcTokenSource {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self { provider }
    }

    pub async fn from_environment() -> Result<Self> {
        let provider = gcp_auth::provider()
            .await
            .map_err(|e| Error::Config(format!("Failed to initialize GCP authentication: {}", e)))?;
        Ok(Self::new(provider))
    }
}

impl fmt::Debug for AdcTokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdcTokenSource").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenSource for AdcTokenSource {
    async fn access_token(&self, scopes: &[&str]) -> Result<String> {
        let token = self
            .provider
            .token(scopes)
            .await
            .map_err(|e| Error::ExternalService(format!("Failed to get access token: {}", e)))?;
        Ok(token.as_str().to_string())
    }
}

/// Picks the token source for a client: a configured static token wins over
/// an injected source.
pub fn resolve_token_source(
    access_token: Option<&str>,
    token_source: Option<&Arc<dyn TokenSource>>,
) -> Option<Arc<dyn TokenSource>> {
    match access_token.filter(|token| !token.is_empty()) {
        Some(token) => Some(Arc::new(StaticToken::new(token)) as Arc<dyn TokenSource>),
        None => token_source.cloned(),
    }
}
