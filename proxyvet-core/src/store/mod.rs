//! Ports the loops depend on: the shared store, the score ledger and the
//! run lease. Adapters live in [`crate::infra`].

mod clock;
mod policy;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    domain::{CheckEntry, Endpoint},
    error::Result,
};

pub use clock::{Clock, ManualClock, SystemClock};
pub use policy::{ScorePolicy, StepScorePolicy};

/// Key names of the shared collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreKeys {
    /// List holding endpoints awaiting validation.
    pub queue: String,
    /// Sorted set of verified endpoints scored by the ledger.
    pub pool: String,
    /// Prefix of per-endpoint keys holding the latest check outcome.
    pub detail_prefix: String,
}

impl Default for StoreKeys {
    fn default() -> Self {
        Self {
            queue: "proxyvet:check_queue".to_string(),
            pool: "proxyvet:pool".to_string(),
            detail_prefix: "proxyvet:detail:".to_string(),
        }
    }
}

impl StoreKeys {
    pub fn detail(&self, endpoint: &Endpoint) -> String {
        format!("{}{}", self.detail_prefix, endpoint)
    }
}

/// Queue and sorted-set primitives of the shared store.
///
/// Every operation is atomic on the store side; callers hold no locks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProxyStore: Send + Sync {
    /// Pop the oldest pending endpoint, waiting without a timeout.
    ///
    /// Returns the raw string so malformed entries surface as parse errors
    /// at the caller.
    async fn pop_blocking(&self) -> Result<String>;

    /// Append endpoints to the pending queue in order. Returns the number
    /// pushed.
    async fn push_many(&self, endpoints: &[Endpoint]) -> Result<usize>;

    async fn queue_len(&self) -> Result<usize>;

    /// Verified endpoints whose score lies in `[lo, hi]`, lowest first.
    async fn range_by_score(&self, lo: i64, hi: i64) -> Result<Vec<Endpoint>>;

    /// Number of endpoints in the verified pool.
    async fn pool_count(&self) -> Result<usize>;
}

/// Owner of the verified pool's membership and scores.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScoreLedger: Send + Sync {
    /// Apply the outcome of one pass. Returns the endpoint's new score.
    async fn persist(&self, entry: &CheckEntry) -> Result<i64>;

    /// Drop endpoints from the verified pool. Returns how many were present.
    async fn remove(&self, endpoints: &[Endpoint]) -> Result<usize>;
}

/// Best-effort, TTL-bounded marker used to deduplicate periodic runs across
/// process instances.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RunLease: Send + Sync {
    /// Returns `true` when no live lease existed and one was recorded.
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<bool>;
}
