use std::sync::Arc;
use sa_core::{Error, Result, SentimentAnalyzer};
use crate::Config;

pub mod dummy;
pub mod google;

pub use dummy::DummyModel;
pub use google::GoogleLanguageModel;

pub async fn create_model(config: &Config) -> Result<Arc<dyn SentimentAnalyzer>> {
    let model_name = config.model_name.as_deref().unwrap_or("google");
    tracing::debug!("Creating sentiment model {:?}", model_name);

    match model_name.to_lowercase().as_str() {
        "google" => Ok(Arc::new(GoogleLanguageModel::new(config)?)),
        "dummy" => Ok(Arc::new(DummyModel::new())),
        other => Err(Error::Config(format!(
            "Unknown model: {} (available: google, dummy)",
            other
        ))),
    }
}
