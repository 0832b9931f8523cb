use std::{fmt, sync::Arc};

use futures::future::join_all;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use super::probe::{ProbeConnector, ProbeError, ProbeSession};
use crate::{
    domain::{CheckEntry, Endpoint, RuleSpec},
    error::{CheckerError, Result},
};

/// Well-known echo service that reports the caller's origin.
pub const DEFAULT_ECHO_URL: &str = "http://httpbin.org/get";

/// Inputs of the validation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub echo_url: Url,
    pub rules: Vec<RuleSpec>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            echo_url: Url::parse(DEFAULT_ECHO_URL)
                .expect("default echo url is valid"),
            rules: Vec::new(),
        }
    }
}

/// Runs the echo, secure-echo and rule stages against one endpoint.
pub struct Validator {
    connector: Arc<dyn ProbeConnector>,
    http_echo: Url,
    https_echo: Url,
    rules: Vec<RuleSpec>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("http_echo", &self.http_echo.as_str())
            .field("https_echo", &self.https_echo.as_str())
            .field("rules", &self.rules.len())
            .finish()
    }
}

impl Validator {
    pub fn new(
        connector: Arc<dyn ProbeConnector>,
        settings: PipelineSettings,
    ) -> Result<Self> {
        let http_echo = with_scheme(&settings.echo_url, "http")?;
        let https_echo = with_scheme(&settings.echo_url, "https")?;
        let rules = settings
            .rules
            .into_iter()
            .filter(|rule| rule.enabled)
            .collect();

        Ok(Self {
            connector,
            http_echo,
            https_echo,
            rules,
        })
    }

    pub fn enabled_rules(&self) -> &[RuleSpec] {
        &self.rules
    }

    /// Validate one endpoint. Never fails: every stage resolves to a bool.
    pub async fn validate(&self, endpoint: &Endpoint) -> CheckEntry {
        let mut entry = CheckEntry::new(endpoint.clone());

        let session = match self.connector.open(endpoint).await {
            Ok(session) => session,
            Err(err) => {
                debug!(endpoint = %endpoint, error = %err, "probe session unavailable");
                for rule in &self.rules {
                    entry.rule_results.insert(rule.key.clone(), false);
                }
                return entry;
            }
        };

        self.http_check(session.as_ref(), &mut entry).await;
        self.https_check(session.as_ref(), &mut entry).await;
        self.rules_check(session.as_ref(), &mut entry).await;

        drop(session);
        entry
    }

    async fn http_check(&self, session: &dyn ProbeSession, entry: &mut CheckEntry) {
        let started = Instant::now();
        match echo(session, &self.http_echo).await {
            Ok(()) => {
                entry.latency = Some(started.elapsed());
                entry.http_ok = true;
            }
            Err(err) => {
                debug!(endpoint = %entry.endpoint, error = %err, "http echo failed");
                entry.http_ok = false;
            }
        }
    }

    async fn https_check(&self, session: &dyn ProbeSession, entry: &mut CheckEntry) {
        entry.https_ok = match echo(session, &self.https_echo).await {
            Ok(()) => true,
            Err(err) => {
                debug!(endpoint = %entry.endpoint, error = %err, "https echo failed");
                false
            }
        };
    }

    async fn rules_check(&self, session: &dyn ProbeSession, entry: &mut CheckEntry) {
        let outcomes = join_all(self.rules.iter().map(|rule| async move {
            let outcome = probe_rule(session, rule).await;
            if let Err(err) = &outcome {
                debug!(rule = %rule.key, error = %err, "rule probe failed");
            }
            (rule.key.clone(), outcome.is_ok())
        }))
        .await;

        entry.rule_results.extend(outcomes);
    }
}

async fn echo(session: &dyn ProbeSession, url: &Url) -> std::result::Result<(), ProbeError> {
    let response = session.get(url).await?;
    let value: Value = serde_json::from_str(&response.body)
        .map_err(|err| ProbeError::Body(err.to_string()))?;

    match value.get("origin").and_then(Value::as_str) {
        Some(origin) if !origin.trim().is_empty() => Ok(()),
        _ => Err(ProbeError::MissingOrigin),
    }
}

async fn probe_rule(
    session: &dyn ProbeSession,
    rule: &RuleSpec,
) -> std::result::Result<(), ProbeError> {
    let response = session.get(&rule.target_url).await?;
    if rule.accepts(&response.body) {
        Ok(())
    } else {
        Err(ProbeError::MissingContent(
            rule.contains.clone().unwrap_or_default(),
        ))
    }
}

fn with_scheme(url: &Url, scheme: &str) -> Result<Url> {
    let mut switched = url.clone();
    switched.set_scheme(scheme).map_err(|_| {
        CheckerError::InvalidSettings(format!(
            "echo url {url} cannot be used over {scheme}"
        ))
    })?;
    Ok(switched)
}
