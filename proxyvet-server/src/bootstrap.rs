use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use proxyvet_config::{Config, ConfigLoad, ConfigLoader, ConfigLoaderOptions};
use proxyvet_core::{
    infra::{self, RedisRunLease, RedisScoreLedger, RedisStore},
    store::{ScorePolicy, StepScorePolicy},
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::ConfigArgs;

/// Load configuration, install the tracing subscriber and report warnings.
pub fn load_config(args: &ConfigArgs) -> anyhow::Result<Config> {
    let ConfigLoad { config, warnings } =
        ConfigLoader::with_options(ConfigLoaderOptions {
            config_path: args.config.clone(),
            env_file: args.env_file.clone(),
        })
        .load()
        .context("failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,proxyvet_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "configuration file in effect");
    }

    for warning in &warnings.items {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }

    Ok(config)
}

/// Install the global Prometheus recorder with its scrape listener on
/// `addr`. Must be called from inside the tokio runtime.
pub fn install_metrics_exporter(addr: SocketAddr) -> anyhow::Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("failed to start metrics exporter on {addr}"))?;
    info!(%addr, "serving prometheus metrics");
    Ok(())
}

/// Redis-backed collaborators sharing one multiplexed connection.
pub struct RedisBackend {
    pub store: Arc<RedisStore>,
    pub ledger: Arc<RedisScoreLedger>,
    pub lease: Arc<RedisRunLease>,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("store", &self.store)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

pub async fn connect_redis(config: &Config) -> anyhow::Result<RedisBackend> {
    let (client, conn) = infra::connect(&config.redis.url)
        .await
        .with_context(|| format!("failed to connect to Redis at {}", config.redis.url))?;

    let policy: Arc<dyn ScorePolicy> =
        Arc::new(StepScorePolicy::new(config.checker.bounds.step));

    Ok(RedisBackend {
        store: Arc::new(RedisStore::new(client, conn.clone(), config.keys.clone())),
        ledger: Arc::new(RedisScoreLedger::new(
            conn.clone(),
            config.keys.clone(),
            config.checker.bounds,
            policy,
        )),
        lease: Arc::new(RedisRunLease::new(conn)),
    })
}
