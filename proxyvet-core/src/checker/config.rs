//! Tunables of the check loop, the sweeper and the rebalancer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    domain::ScoreBounds,
    error::{CheckerError, Result},
};

pub const DEFAULT_WORKERS: usize = 10;
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(5);
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
pub const DEFAULT_SWEEP_FLOOR: i64 = -100;
pub const DEFAULT_REBALANCE_INTERVAL: Duration = Duration::from_secs(600);
pub const DEFAULT_REBALANCE_RATIO: f64 = 1.0;
pub const DEFAULT_LEASE_KEY: &str = "proxyvet:rebalance:last_run";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepConfig {
    pub interval: Duration,
    /// Lowest score the sweeper queries; scores in `[floor, 0]` are evicted.
    pub floor: i64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
            floor: DEFAULT_SWEEP_FLOOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalanceConfig {
    /// Cycle period, also the lease TTL.
    pub interval: Duration,
    /// Skip a cycle when `queue_len >= pool_count * ratio`.
    pub ratio: f64,
    pub lease_key: String,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_REBALANCE_INTERVAL,
            ratio: DEFAULT_REBALANCE_RATIO,
            lease_key: DEFAULT_LEASE_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckerConfig {
    pub workers: usize,
    pub error_backoff: Duration,
    pub bounds: ScoreBounds,
    pub sweep: SweepConfig,
    pub rebalance: RebalanceConfig,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            bounds: ScoreBounds::default(),
            sweep: SweepConfig::default(),
            rebalance: RebalanceConfig::default(),
        }
    }
}

impl CheckerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(CheckerError::InvalidSettings(
                "at least one check worker is required".into(),
            ));
        }
        self.bounds.validate()?;
        if self.sweep.floor > 0 {
            return Err(CheckerError::InvalidSettings(format!(
                "sweep floor must not be positive, got {}",
                self.sweep.floor
            )));
        }
        if !self.rebalance.ratio.is_finite() || self.rebalance.ratio < 0.0 {
            return Err(CheckerError::InvalidSettings(format!(
                "rebalance ratio must be a non-negative number, got {}",
                self.rebalance.ratio
            )));
        }
        Ok(())
    }
}
