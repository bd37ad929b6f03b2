//! Endpoint selection and client settings.
//!
//! Environment and API version are always chosen by the caller when the
//! client is built; nothing here is discovered at runtime.

use std::fmt;
use std::time::Duration;

/// Which brokerage deployment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Production,
    /// Demo environment with simulated fills.
    #[default]
    Demo,
}

impl Environment {
    fn host(self) -> &'static str {
        match self {
            Environment::Production => "https://kabuka.e-shiten.jp",
            Environment::Demo => "https://demo-kabuka.e-shiten.jp",
        }
    }
}

/// Version of the wire contract. Field names and codes are bound to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    V4R2,
    #[default]
    V4R3,
}

impl ApiVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            ApiVersion::V4R2 => "v4r2",
            ApiVersion::V4R3 => "v4r3",
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settings fixed at client construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub environment: Environment,
    pub api_version: ApiVersion,
    /// Whole-request timeout for request/response calls.
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    /// Events buffered between the stream worker and the consumer.
    pub stream_buffer: usize,
    /// Longest single wait on a stream read, and on the stream's response
    /// headers. A dropped stream releases its connection within this bound.
    pub stream_poll_interval: Duration,
    /// A stream that delivers no bytes, keep-alives included, for this long
    /// fails with a transport error.
    pub stream_idle_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            api_version: ApiVersion::default(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("tachibana-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            stream_buffer: 1024,
            stream_poll_interval: Duration::from_secs(2),
            stream_idle_timeout: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    pub fn new(environment: Environment, api_version: ApiVersion) -> Self {
        Self {
            environment,
            api_version,
            ..Self::default()
        }
    }

    /// Base URL for the selected environment and version, with trailing slash.
    pub fn base_url(&self) -> String {
        format!(
            "{}/e_api_{}/",
            self.environment.host(),
            self.api_version.as_str()
        )
    }

    /// Login endpoint. Every later call goes to the URLs issued at login.
    pub fn auth_url(&self) -> String {
        format!("{}auth/", self.base_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_is_default() {
        let config = ClientConfig::default();
        assert_eq!(config.environment, Environment::Demo);
        assert_eq!(config.api_version, ApiVersion::V4R3);
    }

    #[test]
    fn auth_url_per_environment() {
        let demo = ClientConfig::new(Environment::Demo, ApiVersion::V4R3);
        assert_eq!(
            demo.auth_url(),
            "https://demo-kabuka.e-shiten.jp/e_api_v4r3/auth/"
        );

        let prod = ClientConfig::new(Environment::Production, ApiVersion::V4R2);
        assert_eq!(prod.auth_url(), "https://kabuka.e-shiten.jp/e_api_v4r2/auth/");
    }
}
