use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),
}
