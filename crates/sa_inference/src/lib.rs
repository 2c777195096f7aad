use sa_core::TokenSource;
use std::fmt;
use std::sync::Arc;

pub mod models;

pub use models::{create_model, DummyModel, GoogleLanguageModel};

#[derive(Clone, Default)]
pub struct Config {
    /// `google` (default) or `dummy`.
    pub model_name: Option<String>,
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    /// Mints bearer tokens per request when no static `access_token` is set.
    pub token_source: Option<Arc<dyn TokenSource>>,
    pub base_url: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("model_name", &self.model_name)
            .field("api_key", &self.api_key.as_deref().map(|_| "<redacted>"))
            .field("access_token", &self.access_token.as_deref().map(|_| "<redacted>"))
            .field("token_source", &self.token_source.as_ref().map(|_| "<token source>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

pub mod prelude {
    pub use super::Config;
    pub use super::models::create_model;
    pub use sa_core::{Error, Result, SentimentAnalyzer, SentimentResult};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_debug_redacts_credentials() {
        let config = Config {
            model_name: Some("google".to_string()),
            api_key: Some("secret-key".to_string()),
            access_token: Some("secret-token".to_string()),
            token_source: Some(Arc::new(sa_core::StaticToken::new("secret-minted")) as Arc<dyn TokenSource>),
            base_url: None,
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("<token source>"));
    }
}
