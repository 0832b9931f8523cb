use std::{fmt, sync::Arc, time::Duration};

use tracing::{debug, error, info};

use super::{
    config::SweepConfig,
    run_mode::{LoopStats, RunMode},
};
use crate::{
    domain::Endpoint,
    error::Result,
    store::{ProxyStore, ScoreLedger},
};

/// Evicts verified endpoints whose score fell to zero or below.
pub struct Sweeper {
    store: Arc<dyn ProxyStore>,
    ledger: Arc<dyn ScoreLedger>,
    config: SweepConfig,
    backoff: Duration,
}

impl fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sweeper")
            .field("config", &self.config)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl Sweeper {
    pub fn new(
        store: Arc<dyn ProxyStore>,
        ledger: Arc<dyn ScoreLedger>,
        config: SweepConfig,
        backoff: Duration,
    ) -> Self {
        Self {
            store,
            ledger,
            config,
            backoff,
        }
    }

    pub async fn run(&self, mode: RunMode) -> LoopStats {
        let mut stats = LoopStats::default();

        while mode.allows(stats.iterations) {
            stats.iterations += 1;

            if let Err(err) = self.sweep_once().await {
                stats.failures += 1;
                error!(error = %err, "sweep failed");
                tokio::time::sleep(self.backoff).await;
            }

            if !mode.is_last(stats.iterations) {
                tokio::time::sleep(self.config.interval).await;
            }
        }

        stats
    }

    /// One cycle. Returns the endpoints handed to the ledger for removal.
    pub async fn sweep_once(&self) -> Result<Vec<Endpoint>> {
        let expired = self.store.range_by_score(self.config.floor, 0).await?;
        if expired.is_empty() {
            debug!(floor = self.config.floor, "no endpoints to evict");
            return Ok(expired);
        }

        let removed = self.ledger.remove(&expired).await?;
        let listed: Vec<&str> = expired.iter().map(Endpoint::as_str).collect();
        info!(removed, endpoints = ?listed, "evicted endpoints from the pool");
        Ok(expired)
    }
}
