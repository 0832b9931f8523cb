use std::{collections::BTreeMap, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Endpoint;

/// Outcome of one validation pass over a single endpoint.
///
/// Every field is resolved once the pipeline returns; an entry carries no
/// identity beyond the pass that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckEntry {
    pub endpoint: Endpoint,
    pub http_ok: bool,
    pub https_ok: bool,
    pub rule_results: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<Duration>,
    pub checked_at: DateTime<Utc>,
}

impl CheckEntry {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            http_ok: false,
            https_ok: false,
            rule_results: BTreeMap::new(),
            latency: None,
            checked_at: Utc::now(),
        }
    }

    /// Whether the endpoint answered the echo check on either scheme.
    pub fn is_reachable(&self) -> bool {
        self.http_ok || self.https_ok
    }

    pub fn passed_rules(&self) -> usize {
        self.rule_results.values().filter(|ok| **ok).count()
    }

    pub fn latency_ms(&self) -> Option<f64> {
        self.latency.map(|latency| latency.as_secs_f64() * 1_000.0)
    }

    /// Compact `key=bool` rendering used in log lines.
    pub fn rules_summary(&self) -> String {
        self.rule_results
            .iter()
            .map(|(key, ok)| format!("{key}={ok}"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
