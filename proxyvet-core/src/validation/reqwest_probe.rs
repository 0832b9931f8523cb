use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use url::Url;

use super::probe::{ProbeConnector, ProbeError, ProbeResponse, ProbeSession};
use crate::domain::Endpoint;

/// Builds a `reqwest` client per pass with the endpoint installed as proxy
/// for every scheme.
#[derive(Clone)]
pub struct ReqwestConnector {
    timeout: Duration,
}

impl fmt::Debug for ReqwestConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestConnector")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ReqwestConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ProbeConnector for ReqwestConnector {
    async fn open(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Box<dyn ProbeSession>, ProbeError> {
        let proxy_url = endpoint
            .proxy_url()
            .map_err(|err| ProbeError::Session(err.to_string()))?;
        let proxy = Proxy::all(proxy_url)
            .map_err(|err| ProbeError::Session(err.to_string()))?;

        let client = Client::builder()
            .proxy(proxy)
            .timeout(self.timeout)
            .connect_timeout(self.timeout)
            .build()
            .map_err(|err| ProbeError::Session(err.to_string()))?;

        Ok(Box::new(ReqwestSession { client }))
    }
}

struct ReqwestSession {
    client: Client,
}

#[async_trait]
impl ProbeSession for ReqwestSession {
    async fn get(&self, url: &Url) -> Result<ProbeResponse, ProbeError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify)?;
        let body = response.text().await.map_err(classify)?;
        Ok(ProbeResponse { body })
    }
}

fn classify(err: reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout
    } else if err.is_connect() {
        ProbeError::Connect(err.to_string())
    } else if err.is_body() || err.is_decode() {
        ProbeError::Body(err.to_string())
    } else {
        ProbeError::Transport(err.to_string())
    }
}
