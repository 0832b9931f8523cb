use std::{
    fs,
    path::PathBuf,
    sync::LazyLock,
    time::Duration,
};

use proxyvet_core::{
    checker::{CheckerConfig, RebalanceConfig, RunMode, SweepConfig},
    domain::ScoreBounds,
    store::StoreKeys,
    validation::{DEFAULT_ECHO_URL, PipelineSettings},
};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
    models::{
        Config, ConfigMetadata, DEFAULT_REDIS_URL, DEFAULT_REQUEST_TIMEOUT,
        RedisConfig,
    },
    sources::{EnvConfig, FileConfig},
    util::parse_duration,
    validation::{self, ConfigGuardRailError, ConfigWarnings},
};

static DEFAULT_CONFIG_LOCATIONS: LazyLock<Vec<PathBuf>> = LazyLock::new(|| {
    vec![
        PathBuf::from("proxyvet.toml"),
        PathBuf::from("config/proxyvet.toml"),
    ]
});

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    /// Load `.env`, then the process environment, then the TOML file.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };

        let mut load = self.load_with_env(EnvConfig::gather())?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Resolve against an already gathered environment.
    pub fn load_with_env(
        &self,
        env: EnvConfig,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) =
            self.compose_config(file_config, env, config_path)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) = match (&self.options.config_path, &env.config_path) {
            (Some(path), _) | (None, Some(path)) => (path.clone(), true),
            (None, None) => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .find(|candidate| candidate.exists())
            {
                Some(path) => (path.clone(), false),
                None => return Ok((None, None)),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let contents =
            fs::read_to_string(&path).map_err(|source| ConfigLoadError::Io {
                path: path.clone(),
                source,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|source| {
                ConfigLoadError::Parse {
                    path: path.clone(),
                    source,
                }
            })?;

        debug!(path = %path.display(), "loaded configuration file");
        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        if config_path.is_none() {
            warnings.push_with_hint(
                "No proxyvet.toml detected; falling back to environment variables",
                "Pass --config or set PROXYVET_CONFIG to load rules from a file",
            );
        }

        let FileConfig {
            redis: file_redis,
            store: file_store,
            checker: file_checker,
            score: file_score,
            sweep: file_sweep,
            rebalance: file_rebalance,
            rules,
        } = file_config.unwrap_or_default();

        let redis = RedisConfig {
            url: env
                .redis_url
                .or(file_redis.map(|r| r.url))
                .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
        };

        let default_keys = StoreKeys::default();
        let keys = StoreKeys {
            queue: env
                .queue_key
                .or(file_store.queue_key)
                .unwrap_or(default_keys.queue),
            pool: env
                .pool_key
                .or(file_store.pool_key)
                .unwrap_or(default_keys.pool),
            detail_prefix: env
                .detail_prefix
                .or(file_store.detail_prefix)
                .unwrap_or(default_keys.detail_prefix),
        };

        let defaults = CheckerConfig::default();
        let bounds = ScoreBounds {
            min: env.min_score.or(file_score.min).unwrap_or(defaults.bounds.min),
            max: env.max_score.or(file_score.max).unwrap_or(defaults.bounds.max),
            step: env
                .inc_score
                .or(file_score.step)
                .unwrap_or(defaults.bounds.step),
        };

        let sweep = SweepConfig {
            interval: duration_field(
                "sweep.interval",
                env.sweep_interval.or(file_sweep.interval),
                defaults.sweep.interval,
            )?,
            floor: env
                .sweep_floor
                .or(file_sweep.floor)
                .unwrap_or(defaults.sweep.floor),
        };

        let rebalance = RebalanceConfig {
            interval: duration_field(
                "rebalance.interval",
                env.rebalance_interval.or(file_rebalance.interval),
                defaults.rebalance.interval,
            )?,
            ratio: env
                .rebalance_ratio
                .or(file_rebalance.ratio)
                .unwrap_or(defaults.rebalance.ratio),
            lease_key: env
                .lease_key
                .or(file_rebalance.lease_key)
                .unwrap_or(defaults.rebalance.lease_key),
        };

        let checker = CheckerConfig {
            workers: env
                .workers
                .or(file_checker.workers)
                .unwrap_or(defaults.workers),
            error_backoff: duration_field(
                "checker.error_backoff",
                env.error_backoff.or(file_checker.error_backoff),
                defaults.error_backoff,
            )?,
            bounds,
            sweep,
            rebalance,
        };

        let request_timeout = duration_field(
            "checker.request_timeout",
            env.request_timeout.or(file_checker.request_timeout),
            DEFAULT_REQUEST_TIMEOUT,
        )?;

        let echo_raw = env
            .echo_url
            .or(file_checker.echo_url)
            .unwrap_or_else(|| DEFAULT_ECHO_URL.to_string());
        let echo_url = Url::parse(&echo_raw).map_err(|source| {
            ConfigLoadError::InvalidUrl {
                field: "checker.echo_url",
                value: echo_raw.clone(),
                source,
            }
        })?;

        if rules.is_empty() {
            warnings.push_with_hint(
                "No content rules configured; only the echo checks will run",
                "Add [[rules]] tables to the configuration file",
            );
        }

        let run_mode = match env.iterations.or(file_checker.iterations) {
            Some(n) => RunMode::Bounded(n),
            None => RunMode::Continuous,
        };

        let config = Config {
            redis,
            keys,
            checker,
            pipeline: PipelineSettings { echo_url, rules },
            request_timeout,
            run_mode,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded: false,
            },
        };

        let guard_warnings = validation::apply_guard_rails(&config)?;
        warnings.extend(guard_warnings);

        Ok((config, warnings))
    }
}

fn duration_field(
    field: &'static str,
    raw: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigLoadError> {
    match raw {
        Some(value) => parse_duration(&value).map_err(|source| {
            ConfigLoadError::InvalidDuration {
                field,
                value,
                source,
            }
        }),
        None => Ok(default),
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid duration '{value}' for {field}")]
    InvalidDuration {
        field: &'static str,
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("invalid url '{value}' for {field}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error(transparent)]
    GuardRail(#[from] ConfigGuardRailError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}
