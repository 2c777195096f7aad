use sa_core::{Error, RecordStore, Result, TokenSource};
use std::fmt;
use std::sync::Arc;

pub mod backends;

pub use backends::*;

#[derive(Clone, Default)]
pub struct StorageConfig {
    /// `datastore` (default) or `memory`.
    pub backend: Option<String>,
    pub project_id: Option<String>,
    pub namespace: Option<String>,
    pub access_token: Option<String>,
    /// Mints bearer tokens per request when no static `access_token` is set.
    pub token_source: Option<Arc<dyn TokenSource>>,
    /// Service root, or an emulator `host:port`.
    pub base_url: Option<String>,
}

impl fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("project_id", &self.project_id)
            .field("namespace", &self.namespace)
            .field("access_token", &self.access_token.as_deref().map(|_| "<redacted>"))
            .field("token_source", &self.token_source.as_ref().map(|_| "<token source>"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

pub async fn create_storage(config: &StorageConfig) -> Result<Arc<dyn RecordStore>> {
    let backend = config.backend.as_deref().unwrap_or("datastore");
    tracing::debug!("Creating storage backend {:?}", backend);

    match backend.to_lowercase().as_str() {
        "datastore" => Ok(Arc::new(DatastoreStorage::new(config)?)),
        "memory" => Ok(Arc::new(MemoryStorage::new())),
        other => Err(Error::Config(format!(
            "Unknown storage backend: {} (available: datastore, memory)",
            other
        ))),
    }
}

pub mod prelude {
    pub use super::StorageConfig;
    pub use super::create_storage;
    pub use super::backends::*;
}
