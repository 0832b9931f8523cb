use serde::{Deserialize, Serialize};
use url::Url;

/// A content rule probed through every endpoint on each validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub key: String,
    pub target_url: Url,
    /// When set, the response body must contain this substring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default = "RuleSpec::default_enabled")]
    pub enabled: bool,
}

impl RuleSpec {
    pub fn new(key: impl Into<String>, target_url: Url) -> Self {
        Self {
            key: key.into(),
            target_url,
            contains: None,
            enabled: true,
        }
    }

    pub fn with_contains(mut self, needle: impl Into<String>) -> Self {
        self.contains = Some(needle.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether a fetched body satisfies this rule.
    pub fn accepts(&self, body: &str) -> bool {
        match &self.contains {
            Some(needle) => body.contains(needle.as_str()),
            None => true,
        }
    }

    const fn default_enabled() -> bool {
        true
    }
}
