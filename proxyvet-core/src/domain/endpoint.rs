use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::{Host, Url};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointParseError {
    #[error("endpoint is empty")]
    Empty,
    #[error("endpoint '{0}' is missing a port")]
    MissingPort(String),
    #[error("endpoint '{0}' has an invalid port")]
    InvalidPort(String),
    #[error("endpoint '{0}' has an empty host")]
    EmptyHost(String),
    #[error("endpoint '{0}' has an invalid host")]
    InvalidHost(String),
    #[error("endpoint '{0}' has malformed credentials, expected user:pass@host:port")]
    InvalidCredentials(String),
    #[error("endpoint '{0}' cannot be expressed as a proxy url")]
    InvalidUrl(String),
}

#[derive(Clone, PartialEq, Eq)]
struct Credentials {
    username: String,
    password: String,
}

/// A proxy address, `host:port` or `user:pass@host:port`.
///
/// The canonical string is the key used by the pending queue and the
/// verified pool, so two endpoints are equal exactly when their strings are.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Endpoint {
    raw: String,
    host: String,
    port: u16,
}

impl Endpoint {
    pub fn parse(input: &str) -> Result<Self, EndpointParseError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(EndpointParseError::Empty);
        }

        let address = match raw.rsplit_once('@') {
            Some((creds, address)) => {
                parse_credentials(creds).ok_or_else(|| {
                    EndpointParseError::InvalidCredentials(raw.to_string())
                })?;
                address
            }
            None => raw,
        };

        let (host, port) = address
            .rsplit_once(':')
            .ok_or_else(|| EndpointParseError::MissingPort(raw.to_string()))?;
        if host.is_empty() {
            return Err(EndpointParseError::EmptyHost(raw.to_string()));
        }
        if !is_valid_host(host) {
            return Err(EndpointParseError::InvalidHost(raw.to_string()));
        }
        let port = match port.parse::<u16>() {
            Ok(0) | Err(_) => {
                return Err(EndpointParseError::InvalidPort(raw.to_string()));
            }
            Ok(port) => port,
        };

        Ok(Self {
            raw: raw.to_string(),
            host: host.to_string(),
            port,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials().is_some()
    }

    fn credentials(&self) -> Option<Credentials> {
        self.raw
            .rsplit_once('@')
            .and_then(|(creds, _)| parse_credentials(creds))
    }

    /// Proxy url usable for both `http://` and `https://` targets.
    pub fn proxy_url(&self) -> Result<Url, EndpointParseError> {
        let invalid = || EndpointParseError::InvalidUrl(self.raw.clone());
        let mut url = Url::parse(&format!("http://{}:{}", self.host, self.port))
            .map_err(|_| invalid())?;
        if let Some(creds) = self.credentials() {
            url.set_username(&creds.username).map_err(|_| invalid())?;
            url.set_password(Some(&creds.password))
                .map_err(|_| invalid())?;
        }
        Ok(url)
    }
}

/// Bare hostname, IPv4 literal or bracketed IPv6 literal. Schemes, paths
/// and stray colons are rejected so the proxy url points at `host`.
fn is_valid_host(host: &str) -> bool {
    let bracketed = host.starts_with('[') && host.ends_with(']');
    if !bracketed && host.contains(':') {
        return false;
    }
    if host
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '/' | '\\' | '?' | '#' | '@'))
    {
        return false;
    }
    Host::parse(host).is_ok()
}

fn parse_credentials(creds: &str) -> Option<Credentials> {
    let (username, password) = creds.split_once(':')?;
    if username.is_empty() {
        return None;
    }
    Some(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

impl FromStr for Endpoint {
    type Err = EndpointParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Endpoint {
    type Error = EndpointParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Endpoint> for String {
    fn from(value: Endpoint) -> Self {
        value.raw
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// Credentials stay out of logs.
impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("credentials", &self.has_credentials())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_host_and_port() {
        let endpoint = Endpoint::parse("10.0.0.1:8080").expect("valid endpoint");
        assert_eq!(endpoint.host(), "10.0.0.1");
        assert_eq!(endpoint.port(), 8080);
        assert!(!endpoint.has_credentials());
        assert_eq!(
            endpoint.proxy_url().expect("proxy url").as_str(),
            "http://10.0.0.1:8080/"
        );
    }

    #[test]
    fn parses_embedded_credentials() {
        let endpoint =
            Endpoint::parse("alice:s3cret@proxy.example:3128").expect("valid");
        assert_eq!(endpoint.host(), "proxy.example");
        assert_eq!(endpoint.port(), 3128);
        assert!(endpoint.has_credentials());

        let url = endpoint.proxy_url().expect("proxy url");
        assert_eq!(url.username(), "alice");
        assert_eq!(url.password(), Some("s3cret"));
        assert_eq!(endpoint.to_string(), "alice:s3cret@proxy.example:3128");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let endpoint = Endpoint::parse("  1.2.3.4:80\n").expect("valid");
        assert_eq!(endpoint.as_str(), "1.2.3.4:80");
    }

    #[test]
    fn rejects_malformed_input() {
        assert_eq!(Endpoint::parse(""), Err(EndpointParseError::Empty));
        assert!(matches!(
            Endpoint::parse("1.2.3.4"),
            Err(EndpointParseError::MissingPort(_))
        ));
        assert!(matches!(
            Endpoint::parse("1.2.3.4:http"),
            Err(EndpointParseError::InvalidPort(_))
        ));
        assert!(matches!(
            Endpoint::parse("1.2.3.4:0"),
            Err(EndpointParseError::InvalidPort(_))
        ));
        assert!(matches!(
            Endpoint::parse(":8080"),
            Err(EndpointParseError::EmptyHost(_))
        ));
        assert!(matches!(
            Endpoint::parse("nopassword@1.2.3.4:80"),
            Err(EndpointParseError::InvalidCredentials(_))
        ));
    }

    #[test]
    fn rejects_hosts_that_would_not_round_trip() {
        for input in [
            "http://1.2.3.4:80",
            "host/path:80",
            "a b:80",
            "1.2.3.4:80:90",
            "host?x:80",
            "::1:80",
        ] {
            assert!(
                matches!(
                    Endpoint::parse(input),
                    Err(EndpointParseError::InvalidHost(_))
                ),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn accepts_bracketed_ipv6() {
        let endpoint = Endpoint::parse("[::1]:8080").expect("valid");
        assert_eq!(endpoint.host(), "[::1]");
        let url = endpoint.proxy_url().expect("proxy url");
        assert_eq!(url.host_str(), Some("[::1]"));
        assert_eq!(url.port(), Some(8080));
    }

    #[test]
    fn parsed_hosts_always_yield_a_proxy_url() {
        for input in ["proxy.example:3128", "u:p@10.1.2.3:80", "[2001:db8::1]:1080"] {
            let endpoint = Endpoint::parse(input).expect("valid");
            let url = endpoint.proxy_url().expect("proxy url");
            assert_eq!(url.port_or_known_default(), Some(endpoint.port()));
        }
    }

    #[test]
    fn debug_output_hides_credentials() {
        let endpoint = Endpoint::parse("bob:hunter2@h:1").expect("valid");
        let rendered = format!("{endpoint:?}");
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn serde_uses_canonical_string() {
        let endpoint = Endpoint::parse("h.example:9000").expect("valid");
        let json = serde_json::to_string(&endpoint).expect("serialize");
        assert_eq!(json, "\"h.example:9000\"");
        let back: Endpoint = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.port(), 9000);
    }
}
