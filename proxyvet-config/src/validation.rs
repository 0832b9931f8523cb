use std::collections::HashSet;

use thiserror::Error;

use crate::models::Config;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigGuardRailError {
    #[error("at least one check worker is required")]
    NoWorkers,
    #[error("score min ({min}) must be below score max ({max})")]
    InvalidScoreBounds { min: i64, max: i64 },
    #[error("score step must be positive, got {0}")]
    NonPositiveStep(i64),
    #[error("rebalance ratio must be a non-negative number, got {0}")]
    InvalidRatio(f64),
    #[error("sweep floor must not be positive, got {0}")]
    PositiveFloor(i64),
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    #[error("echo url must use http or https, got '{0}'")]
    UnsupportedEchoScheme(String),
    #[error("rule key '{0}' is declared more than once")]
    DuplicateRuleKey(String),
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: None,
        });
    }

    pub fn push_with_hint<S: Into<String>, H: Into<String>>(
        &mut self,
        message: S,
        hint: H,
    ) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }
}

pub fn apply_guard_rails(
    config: &Config,
) -> Result<ConfigWarnings, ConfigGuardRailError> {
    let mut warnings = ConfigWarnings::default();
    let checker = &config.checker;

    if checker.workers == 0 {
        return Err(ConfigGuardRailError::NoWorkers);
    }

    let bounds = checker.bounds;
    if bounds.min >= bounds.max {
        return Err(ConfigGuardRailError::InvalidScoreBounds {
            min: bounds.min,
            max: bounds.max,
        });
    }
    if bounds.step <= 0 {
        return Err(ConfigGuardRailError::NonPositiveStep(bounds.step));
    }

    let ratio = checker.rebalance.ratio;
    if !ratio.is_finite() || ratio < 0.0 {
        return Err(ConfigGuardRailError::InvalidRatio(ratio));
    }
    if checker.sweep.floor > 0 {
        return Err(ConfigGuardRailError::PositiveFloor(checker.sweep.floor));
    }

    for (field, value) in [
        ("request_timeout", config.request_timeout),
        ("sweep.interval", checker.sweep.interval),
        ("rebalance.interval", checker.rebalance.interval),
    ] {
        if value.is_zero() {
            return Err(ConfigGuardRailError::ZeroDuration { field });
        }
    }

    let scheme = config.pipeline.echo_url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ConfigGuardRailError::UnsupportedEchoScheme(
            config.pipeline.echo_url.to_string(),
        ));
    }

    let mut keys = HashSet::new();
    for rule in &config.pipeline.rules {
        if !keys.insert(rule.key.as_str()) {
            return Err(ConfigGuardRailError::DuplicateRuleKey(rule.key.clone()));
        }
    }

    if ratio == 0.0 {
        warnings.push_with_hint(
            "rebalance ratio is 0; every rebalance cycle will be skipped",
            "Set rebalance.ratio (or PROXYVET_REBALANCE_RATIO) above zero",
        );
    }

    if checker.sweep.floor > bounds.min {
        warnings.push(format!(
            "sweep floor {} is above score min {}; lower scores are never evicted",
            checker.sweep.floor, bounds.min
        ));
    }

    if bounds.step > bounds.max - bounds.min {
        warnings.push(format!(
            "score step {} spans the whole score range; the rebalancer walks a single band",
            bounds.step
        ));
    }

    if checker.error_backoff.is_zero() {
        warnings.push("error backoff is zero; failing iterations will retry immediately");
    }

    Ok(warnings)
}
