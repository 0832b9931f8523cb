use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use clap::Args as ClapArgs;
use proxyvet_config::Config;
use proxyvet_core::{
    CheckerRuntime, RunMode,
    validation::{ReqwestConnector, Validator},
};
use tracing::info;

use crate::bootstrap::{connect_redis, install_metrics_exporter};

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Number of check workers (overrides config)
    #[arg(short, long, env = "PROXYVET_WORKERS")]
    workers: Option<usize>,

    /// Run a single iteration of every loop, then exit
    #[arg(long, conflicts_with = "iterations")]
    once: bool,

    /// Run this many iterations of every loop, then exit
    #[arg(long)]
    iterations: Option<u64>,

    /// Serve Prometheus metrics on this address; metrics are dropped when unset
    #[arg(long, env = "PROXYVET_METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,
}

impl RunArgs {
    fn run_mode(&self) -> Option<RunMode> {
        if self.once {
            Some(RunMode::once())
        } else {
            self.iterations.map(RunMode::Bounded)
        }
    }
}

pub async fn execute(mut config: Config, args: RunArgs) -> anyhow::Result<()> {
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    if let Some(mode) = args.run_mode() {
        config = config.with_run_mode(mode);
    }

    if let Some(addr) = args.metrics_addr {
        install_metrics_exporter(addr)?;
    }

    let backend = connect_redis(&config).await?;
    let connector = Arc::new(ReqwestConnector::new(config.request_timeout));
    let validator = Arc::new(
        Validator::new(connector, config.pipeline.clone())
            .context("invalid validation pipeline settings")?,
    );
    info!(
        echo = %config.pipeline.echo_url,
        rules = validator.enabled_rules().len(),
        timeout = ?config.request_timeout,
        "validation pipeline ready"
    );

    let runtime = CheckerRuntime::new(
        config.checker.clone(),
        backend.store.clone(),
        backend.ledger.clone(),
        backend.lease.clone(),
        validator,
    )
    .context("invalid checker settings")?;

    tokio::select! {
        report = runtime.run(config.run_mode) => {
            info!(?report, "all checker tasks finished");
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            info!("received Ctrl-C, exiting");
        }
    }

    Ok(())
}
