use thiserror::Error;

use crate::domain::EndpointParseError;

#[derive(Error, Debug)]
pub enum CheckerError {
    #[cfg(feature = "redis")]
    #[error("Store error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Invalid endpoint: {0}")]
    Endpoint(#[from] EndpointParseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CheckerError>;
