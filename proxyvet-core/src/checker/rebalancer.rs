use std::{fmt, sync::Arc, time::Duration};

use tracing::{debug, error, info};

use super::{
    config::RebalanceConfig,
    run_mode::{LoopStats, RunMode},
};
use crate::{
    domain::ScoreBounds,
    error::Result,
    store::{ProxyStore, RunLease},
};

/// What one rebalancer cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebalanceOutcome {
    /// Another run holds the lease for this interval.
    SkippedLeaseHeld,
    /// The pending queue is already long relative to the pool.
    SkippedBackpressure { queued: usize, pooled: usize },
    /// Pool entries were pushed back for re-validation.
    Requeued { endpoints: usize, bands: usize },
}

/// Periodically pushes the verified pool back onto the pending queue, one
/// score band at a time.
pub struct Rebalancer {
    store: Arc<dyn ProxyStore>,
    lease: Arc<dyn RunLease>,
    bounds: ScoreBounds,
    config: RebalanceConfig,
    backoff: Duration,
}

impl fmt::Debug for Rebalancer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rebalancer")
            .field("bounds", &self.bounds)
            .field("config", &self.config)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

impl Rebalancer {
    pub fn new(
        store: Arc<dyn ProxyStore>,
        lease: Arc<dyn RunLease>,
        bounds: ScoreBounds,
        config: RebalanceConfig,
        backoff: Duration,
    ) -> Self {
        Self {
            store,
            lease,
            bounds,
            config,
            backoff,
        }
    }

    pub async fn run(&self, mode: RunMode) -> LoopStats {
        let mut stats = LoopStats::default();

        while mode.allows(stats.iterations) {
            stats.iterations += 1;

            match self.rebalance_once().await {
                Ok(outcome) => info!(?outcome, "rebalance cycle finished"),
                Err(err) => {
                    stats.failures += 1;
                    error!(error = %err, "rebalance failed");
                    tokio::time::sleep(self.backoff).await;
                }
            }

            if !mode.is_last(stats.iterations) {
                tokio::time::sleep(self.config.interval).await;
            }
        }

        stats
    }

    pub async fn rebalance_once(&self) -> Result<RebalanceOutcome> {
        let acquired = self
            .lease
            .try_acquire(&self.config.lease_key, self.config.interval)
            .await?;
        if !acquired {
            debug!(key = %self.config.lease_key, "rebalance already ran within the interval");
            return Ok(RebalanceOutcome::SkippedLeaseHeld);
        }

        let queued = self.store.queue_len().await?;
        let pooled = self.store.pool_count().await?;
        if queued as f64 >= pooled as f64 * self.config.ratio {
            debug!(queued, pooled, ratio = self.config.ratio, "pending queue saturated");
            return Ok(RebalanceOutcome::SkippedBackpressure { queued, pooled });
        }

        let mut endpoints = 0;
        let mut bands = 0;
        for band in self.bounds.bands() {
            let members = self.store.range_by_score(band.lo, band.hi).await?;
            bands += 1;
            if members.is_empty() {
                continue;
            }

            endpoints += self.store.push_many(&members).await?;
            debug!(lo = band.lo, hi = band.hi, pushed = members.len(), "band requeued");
        }

        Ok(RebalanceOutcome::Requeued { endpoints, bands })
    }
}
