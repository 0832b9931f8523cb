use std::{fmt, sync::Arc};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::{
    check_loop::CheckWorker,
    config::CheckerConfig,
    rebalancer::Rebalancer,
    run_mode::{LoopStats, RunMode},
    sweeper::Sweeper,
};
use crate::{
    error::Result,
    store::{ProxyStore, RunLease, ScoreLedger},
    validation::Validator,
};

/// Supervises the check workers, the sweeper and the rebalancer inside a
/// single process.
pub struct CheckerRuntime {
    config: CheckerConfig,
    store: Arc<dyn ProxyStore>,
    ledger: Arc<dyn ScoreLedger>,
    lease: Arc<dyn RunLease>,
    validator: Arc<Validator>,
}

impl fmt::Debug for CheckerRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckerRuntime")
            .field("config", &self.config)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

/// Per-task counters collected when a bounded run returns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeReport {
    pub workers: Vec<LoopStats>,
    pub sweeper: Option<LoopStats>,
    pub rebalancer: Option<LoopStats>,
}

enum TaskKind {
    Worker,
    Sweeper,
    Rebalancer,
}

impl CheckerRuntime {
    pub fn new(
        config: CheckerConfig,
        store: Arc<dyn ProxyStore>,
        ledger: Arc<dyn ScoreLedger>,
        lease: Arc<dyn RunLease>,
        validator: Arc<Validator>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            ledger,
            lease,
            validator,
        })
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Spawn every task and wait for all of them. In continuous mode this
    /// only returns if every task has stopped.
    pub async fn run(&self, mode: RunMode) -> RuntimeReport {
        let mut handles: Vec<(String, TaskKind, JoinHandle<LoopStats>)> =
            Vec::with_capacity(self.config.workers + 2);

        for i in 0..self.config.workers {
            let worker = CheckWorker::new(
                format!("check-w{i}"),
                Arc::clone(&self.store),
                Arc::clone(&self.ledger),
                Arc::clone(&self.validator),
                self.config.error_backoff,
            );
            let name = worker.id().to_string();
            handles.push((
                name,
                TaskKind::Worker,
                tokio::spawn(async move { worker.run(mode).await }),
            ));
        }

        let sweeper = Sweeper::new(
            Arc::clone(&self.store),
            Arc::clone(&self.ledger),
            self.config.sweep.clone(),
            self.config.error_backoff,
        );
        handles.push((
            "sweeper".to_string(),
            TaskKind::Sweeper,
            tokio::spawn(async move { sweeper.run(mode).await }),
        ));

        let rebalancer = Rebalancer::new(
            Arc::clone(&self.store),
            Arc::clone(&self.lease),
            self.config.bounds,
            self.config.rebalance.clone(),
            self.config.error_backoff,
        );
        handles.push((
            "rebalancer".to_string(),
            TaskKind::Rebalancer,
            tokio::spawn(async move { rebalancer.run(mode).await }),
        ));

        info!(
            workers = self.config.workers,
            ?mode,
            "checker runtime started"
        );

        let (labels, joins): (Vec<_>, Vec<_>) = handles
            .into_iter()
            .map(|(name, kind, handle)| ((name, kind), handle))
            .unzip();

        let mut report = RuntimeReport::default();
        for ((name, kind), joined) in labels.into_iter().zip(join_all(joins).await) {
            match joined {
                Ok(stats) => match kind {
                    TaskKind::Worker => report.workers.push(stats),
                    TaskKind::Sweeper => report.sweeper = Some(stats),
                    TaskKind::Rebalancer => report.rebalancer = Some(stats),
                },
                Err(err) => error!(task = %name, error = %err, "checker task aborted"),
            }
        }

        info!(?report, "checker runtime stopped");
        report
    }
}
