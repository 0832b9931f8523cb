use std::path::PathBuf;

use proxyvet_core::domain::RuleSpec;
use serde::{Deserialize, Serialize};

use crate::util::{non_empty, parse_var};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    pub redis: Option<FileRedisConfig>,
    #[serde(default)]
    pub store: FileStoreConfig,
    #[serde(default)]
    pub checker: FileCheckerConfig,
    #[serde(default)]
    pub score: FileScoreConfig,
    #[serde(default)]
    pub sweep: FileSweepConfig,
    #[serde(default)]
    pub rebalance: FileRebalanceConfig,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileRedisConfig {
    pub url: String,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileStoreConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_prefix: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileCheckerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    /// Bounded run length; absent means run continuously.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_backoff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echo_url: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileScoreConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<i64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileSweepConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<i64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileRebalanceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_key: Option<String>,
}

/// Environment-derived configuration values.
///
/// Durations stay raw so the loader can report which variable failed to
/// parse; numbers that do not parse are ignored.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub redis_url: Option<String>,
    pub queue_key: Option<String>,
    pub pool_key: Option<String>,
    pub detail_prefix: Option<String>,
    pub workers: Option<usize>,
    pub iterations: Option<u64>,
    pub request_timeout: Option<String>,
    pub error_backoff: Option<String>,
    pub echo_url: Option<String>,
    pub min_score: Option<i64>,
    pub max_score: Option<i64>,
    pub inc_score: Option<i64>,
    pub sweep_interval: Option<String>,
    pub sweep_floor: Option<i64>,
    pub rebalance_interval: Option<String>,
    pub rebalance_ratio: Option<f64>,
    pub lease_key: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            config_path: non_empty(&lookup, "PROXYVET_CONFIG").map(PathBuf::from),
            redis_url: non_empty(&lookup, "REDIS_URL"),
            queue_key: non_empty(&lookup, "PROXYVET_QUEUE_KEY"),
            pool_key: non_empty(&lookup, "PROXYVET_POOL_KEY"),
            detail_prefix: non_empty(&lookup, "PROXYVET_DETAIL_PREFIX"),
            workers: parse_var(&lookup, "PROXYVET_WORKERS"),
            iterations: parse_var(&lookup, "PROXYVET_ITERATIONS"),
            request_timeout: non_empty(&lookup, "PROXYVET_REQUEST_TIMEOUT"),
            error_backoff: non_empty(&lookup, "PROXYVET_ERROR_BACKOFF"),
            echo_url: non_empty(&lookup, "PROXYVET_ECHO_URL"),
            min_score: parse_var(&lookup, "PROXYVET_MIN_SCORE"),
            max_score: parse_var(&lookup, "PROXYVET_MAX_SCORE"),
            inc_score: parse_var(&lookup, "PROXYVET_INC_SCORE"),
            sweep_interval: non_empty(&lookup, "PROXYVET_SWEEP_INTERVAL"),
            sweep_floor: parse_var(&lookup, "PROXYVET_SWEEP_FLOOR"),
            rebalance_interval: non_empty(&lookup, "PROXYVET_REBALANCE_INTERVAL"),
            rebalance_ratio: parse_var(&lookup, "PROXYVET_REBALANCE_RATIO"),
            lease_key: non_empty(&lookup, "PROXYVET_LEASE_KEY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn env_lookup_maps_known_variables() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("REDIS_URL", "redis://cache:6379/2"),
            ("PROXYVET_WORKERS", "4"),
            ("PROXYVET_REBALANCE_RATIO", "0.5"),
            ("PROXYVET_SWEEP_INTERVAL", "2m"),
            ("PROXYVET_MIN_SCORE", "not-a-number"),
        ]);
        let env = EnvConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(env.redis_url.as_deref(), Some("redis://cache:6379/2"));
        assert_eq!(env.workers, Some(4));
        assert_eq!(env.rebalance_ratio, Some(0.5));
        assert_eq!(env.sweep_interval.as_deref(), Some("2m"));
        assert_eq!(env.min_score, None);
        assert!(env.config_path.is_none());
    }

    #[test]
    fn rules_parse_from_toml_tables() {
        let file: FileConfig = toml::from_str(
            r#"
            [checker]
            workers = 3

            [[rules]]
            key = "greeting"
            target_url = "http://rules.test/"
            contains = "hello"

            [[rules]]
            key = "muted"
            target_url = "http://rules.test/muted"
            enabled = false
            "#,
        )
        .expect("parse file config");

        assert_eq!(file.checker.workers, Some(3));
        assert_eq!(file.rules.len(), 2);
        assert_eq!(file.rules[0].contains.as_deref(), Some("hello"));
        assert!(!file.rules[1].enabled);
    }
}
