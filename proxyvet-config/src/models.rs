use std::{path::PathBuf, time::Duration};

use proxyvet_core::{
    checker::{CheckerConfig, RunMode},
    store::StoreKeys,
    validation::PipelineSettings,
};

pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub redis: RedisConfig,
    pub keys: StoreKeys,
    pub checker: CheckerConfig,
    pub pipeline: PipelineSettings,
    /// Per-request timeout of every probe.
    pub request_timeout: Duration,
    pub run_mode: RunMode,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.checker.workers = workers;
        self
    }

    pub fn with_run_mode(mut self, run_mode: RunMode) -> Self {
        self.run_mode = run_mode;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Where the values came from.
#[derive(Debug, Clone, Default)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}
