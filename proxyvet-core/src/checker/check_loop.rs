use std::{fmt, sync::Arc, time::Duration};

use tracing::{debug, error, info};

use super::{
    metrics::CheckerMetrics,
    run_mode::{LoopStats, RunMode},
};
use crate::{
    domain::{CheckEntry, Endpoint},
    error::Result,
    store::{ProxyStore, ScoreLedger},
    validation::Validator,
};

/// One check worker: pop, validate, persist.
pub struct CheckWorker {
    id: String,
    store: Arc<dyn ProxyStore>,
    ledger: Arc<dyn ScoreLedger>,
    validator: Arc<Validator>,
    metrics: CheckerMetrics,
    backoff: Duration,
}

impl fmt::Debug for CheckWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckWorker")
            .field("id", &self.id)
            .field("validator", &self.validator)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl CheckWorker {
    pub fn new(
        id: impl Into<String>,
        store: Arc<dyn ProxyStore>,
        ledger: Arc<dyn ScoreLedger>,
        validator: Arc<Validator>,
        backoff: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            store,
            ledger,
            validator,
            metrics: CheckerMetrics::default(),
            backoff,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Loop until `mode` is exhausted. A failed iteration is logged and
    /// followed by the backoff delay; it never ends the loop.
    pub async fn run(&self, mode: RunMode) -> LoopStats {
        let mut stats = LoopStats::default();

        while mode.allows(stats.iterations) {
            debug!(worker = %self.id, iteration = stats.iterations, "check iteration starting");
            stats.iterations += 1;

            if let Err(err) = self.run_once().await {
                stats.failures += 1;
                error!(worker = %self.id, error = %err, "check iteration failed");
                tokio::time::sleep(self.backoff).await;
            }
        }

        stats
    }

    /// A single iteration without the error boundary.
    pub async fn run_once(&self) -> Result<CheckEntry> {
        let raw = self.store.pop_blocking().await?;
        self.metrics.record_attempt();
        info!(worker = %self.id, endpoint = %raw, "popped endpoint for validation");

        let endpoint = Endpoint::parse(&raw)?;
        let entry = self.validator.validate(&endpoint).await;
        self.metrics.record_entry(&entry);

        let score = self.ledger.persist(&entry).await?;
        info!(
            worker = %self.id,
            endpoint = %entry.endpoint,
            http = entry.http_ok,
            https = entry.https_ok,
            latency_ms = entry.latency_ms(),
            rules = %entry.rules_summary(),
            score,
            "endpoint checked"
        );

        Ok(entry)
    }
}
