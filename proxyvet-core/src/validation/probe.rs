use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::domain::Endpoint;

/// Why a single probe request did not produce a usable answer.
///
/// These never leave the pipeline; each stage folds them into `false`.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unreadable body: {0}")]
    Body(String),
    #[error("echo response does not report a proxied origin")]
    MissingOrigin,
    #[error("body does not contain '{0}'")]
    MissingContent(String),
    #[error("could not open probe session: {0}")]
    Session(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResponse {
    pub body: String,
}

impl ProbeResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

/// One HTTP session routed through a single endpoint, scoped to one pass.
#[async_trait]
pub trait ProbeSession: Send + Sync {
    async fn get(&self, url: &Url) -> Result<ProbeResponse, ProbeError>;
}

/// Opens probe sessions; the seam between the pipeline and the HTTP stack.
#[async_trait]
pub trait ProbeConnector: Send + Sync {
    async fn open(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Box<dyn ProbeSession>, ProbeError>;
}
