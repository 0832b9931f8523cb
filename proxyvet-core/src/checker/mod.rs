//! The long-running loops: check workers, eviction sweeper, rebalancer,
//! and the runtime that supervises them.

mod check_loop;
mod config;
mod metrics;
mod rebalancer;
mod run_mode;
mod runtime;
mod sweeper;

pub use check_loop::CheckWorker;
pub use config::{
    CheckerConfig, DEFAULT_ERROR_BACKOFF, DEFAULT_LEASE_KEY, DEFAULT_REBALANCE_INTERVAL,
    DEFAULT_REBALANCE_RATIO, DEFAULT_SWEEP_FLOOR, DEFAULT_SWEEP_INTERVAL, DEFAULT_WORKERS,
    RebalanceConfig, SweepConfig,
};
pub use self::metrics::CheckerMetrics;
pub use rebalancer::{RebalanceOutcome, Rebalancer};
pub use run_mode::{LoopStats, RunMode};
pub use runtime::{CheckerRuntime, RuntimeReport};
pub use sweeper::Sweeper;
