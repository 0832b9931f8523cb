use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use proxyvet_core::{
    domain::{Endpoint, RuleSpec},
    validation::{
        PipelineSettings, ProbeConnector, ProbeError, ProbeResponse,
        ProbeSession, Validator,
    },
};
use url::Url;

const ORIGIN_BODY: &str = r#"{"origin": "203.0.113.7"}"#;

#[derive(Clone)]
enum Scripted {
    Body(&'static str),
    Timeout,
    Refused,
}

/// Connector whose sessions answer from a fixed url -> outcome table.
#[derive(Clone, Default)]
struct ScriptedConnector {
    outcomes: HashMap<String, Scripted>,
}

impl ScriptedConnector {
    fn on(mut self, url: &str, outcome: Scripted) -> Self {
        self.outcomes.insert(url.to_string(), outcome);
        self
    }
}

struct ScriptedSession {
    outcomes: HashMap<String, Scripted>,
}

#[async_trait]
impl ProbeConnector for ScriptedConnector {
    async fn open(
        &self,
        _endpoint: &Endpoint,
    ) -> Result<Box<dyn ProbeSession>, ProbeError> {
        Ok(Box::new(ScriptedSession {
            outcomes: self.outcomes.clone(),
        }))
    }
}

#[async_trait]
impl ProbeSession for ScriptedSession {
    async fn get(&self, url: &Url) -> Result<ProbeResponse, ProbeError> {
        match self.outcomes.get(url.as_str()) {
            Some(Scripted::Body(body)) => Ok(ProbeResponse::ok(*body)),
            Some(Scripted::Timeout) => Err(ProbeError::Timeout),
            Some(Scripted::Refused) | None => {
                Err(ProbeError::Connect("refused".into()))
            }
        }
    }
}

fn url(raw: &str) -> Url {
    Url::parse(raw).expect("valid url")
}

fn endpoint() -> Endpoint {
    Endpoint::parse("198.51.100.4:3128").expect("valid endpoint")
}

fn validator(connector: ScriptedConnector, rules: Vec<RuleSpec>) -> Validator {
    let settings = PipelineSettings {
        echo_url: url("http://echo.test/get"),
        rules,
    };
    Validator::new(Arc::new(connector), settings).expect("validator")
}

#[tokio::test]
async fn reachable_on_both_schemes() {
    let connector = ScriptedConnector::default()
        .on("http://echo.test/get", Scripted::Body(ORIGIN_BODY))
        .on("https://echo.test/get", Scripted::Body(ORIGIN_BODY));

    let entry = validator(connector, Vec::new()).validate(&endpoint()).await;

    assert!(entry.http_ok);
    assert!(entry.https_ok);
    assert!(entry.latency.is_some());
    assert!(entry.rule_results.is_empty());
}

#[tokio::test]
async fn https_outcome_is_independent_of_http() {
    let http_only = ScriptedConnector::default()
        .on("http://echo.test/get", Scripted::Body(ORIGIN_BODY))
        .on("https://echo.test/get", Scripted::Refused);
    let entry = validator(http_only, Vec::new()).validate(&endpoint()).await;
    assert!(entry.http_ok);
    assert!(!entry.https_ok);

    let https_only = ScriptedConnector::default()
        .on("http://echo.test/get", Scripted::Timeout)
        .on("https://echo.test/get", Scripted::Body(ORIGIN_BODY));
    let entry = validator(https_only, Vec::new()).validate(&endpoint()).await;
    assert!(!entry.http_ok);
    assert!(entry.https_ok);
    assert!(entry.latency.is_none(), "latency is only recorded for http");
}

#[tokio::test]
async fn echo_without_origin_is_a_failure() {
    let connector = ScriptedConnector::default()
        .on("http://echo.test/get", Scripted::Body(r#"{"headers": {}}"#))
        .on("https://echo.test/get", Scripted::Body("<html>captive portal</html>"));

    let entry = validator(connector, Vec::new()).validate(&endpoint()).await;
    assert!(!entry.http_ok);
    assert!(!entry.https_ok);
    assert!(entry.latency.is_none());
}

#[tokio::test]
async fn rule_outcomes_are_isolated() {
    let connector = ScriptedConnector::default()
        .on("http://echo.test/get", Scripted::Body(ORIGIN_BODY))
        .on("http://rules.test/greeting", Scripted::Body("hello world"))
        .on("http://rules.test/farewell", Scripted::Body("goodbye"))
        .on("http://rules.test/slow", Scripted::Timeout);

    let rules = vec![
        RuleSpec::new("greeting", url("http://rules.test/greeting"))
            .with_contains("hello"),
        RuleSpec::new("farewell", url("http://rules.test/farewell"))
            .with_contains("hello"),
        RuleSpec::new("slow", url("http://rules.test/slow")),
        RuleSpec::new("any-body", url("http://rules.test/farewell")),
        RuleSpec::new("off", url("http://rules.test/greeting")).disabled(),
    ];

    let entry = validator(connector, rules).validate(&endpoint()).await;

    assert_eq!(entry.rule_results.get("greeting"), Some(&true));
    assert_eq!(entry.rule_results.get("farewell"), Some(&false));
    assert_eq!(entry.rule_results.get("slow"), Some(&false));
    assert_eq!(entry.rule_results.get("any-body"), Some(&true));
    assert!(!entry.rule_results.contains_key("off"));
    assert_eq!(entry.passed_rules(), 2);
}

#[tokio::test]
async fn unopenable_session_fails_every_stage() {
    struct Broken;

    #[async_trait]
    impl ProbeConnector for Broken {
        async fn open(
            &self,
            _endpoint: &Endpoint,
        ) -> Result<Box<dyn ProbeSession>, ProbeError> {
            Err(ProbeError::Session("bad proxy url".into()))
        }
    }

    let settings = PipelineSettings {
        echo_url: url("http://echo.test/get"),
        rules: vec![RuleSpec::new("greeting", url("http://rules.test/"))],
    };
    let validator = Validator::new(Arc::new(Broken), settings).expect("validator");
    let entry = validator.validate(&endpoint()).await;

    assert!(!entry.http_ok);
    assert!(!entry.https_ok);
    assert_eq!(entry.rule_results.get("greeting"), Some(&false));
}
