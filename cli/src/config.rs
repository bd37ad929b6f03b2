//! TOML configuration loading and validation.

use std::env;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tachibana::{ApiVersion, ClientConfig, Credentials, Environment, SecondPassword};

use crate::error::{Error, Result};

/// Environment variable that overrides `account.password`.
pub const PASSWORD_ENV: &str = "TACHIBANA_PASSWORD";
/// Environment variable that overrides `account.second_password`.
pub const SECOND_PASSWORD_ENV: &str = "TACHIBANA_SECOND_PASSWORD";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub account: AccountConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountConfig {
    pub user_id: String,
    #[serde(default)]
    pub password: Option<String>,
    /// Trading PIN sent with order entry and cancellation.
    #[serde(default)]
    pub second_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub environment: EnvironmentName,
    #[serde(default)]
    pub version: VersionName,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            environment: EnvironmentName::default(),
            version: VersionName::default(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}
fn default_connect_timeout() -> u64 {
    10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentName {
    #[default]
    Demo,
    Production,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionName {
    V4r2,
    #[default]
    V4r3,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
    #[serde(default = "default_missing_tolerance")]
    pub missing_tolerance: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            max_polls: default_max_polls(),
            missing_tolerance: default_missing_tolerance(),
        }
    }
}

fn default_interval() -> u64 {
    5
}
fn default_max_polls() -> u32 {
    720
}
fn default_missing_tolerance() -> u32 {
    3
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.account.user_id.trim().is_empty() {
            return Err(Error::Config("account.user_id must not be empty".into()));
        }
        if self.api.timeout_secs == 0 || self.api.connect_timeout_secs == 0 {
            return Err(Error::Config("api timeouts must be > 0".into()));
        }
        if self.tracker.interval_secs == 0 {
            return Err(Error::Config("tracker.interval_secs must be > 0".into()));
        }
        if self.tracker.max_polls == 0 {
            return Err(Error::Config("tracker.max_polls must be > 0".into()));
        }
        Ok(())
    }

    pub fn client_config(&self) -> ClientConfig {
        let environment = match self.api.environment {
            EnvironmentName::Demo => Environment::Demo,
            EnvironmentName::Production => Environment::Production,
        };
        let version = match self.api.version {
            VersionName::V4r2 => ApiVersion::V4R2,
            VersionName::V4r3 => ApiVersion::V4R3,
        };
        ClientConfig {
            request_timeout: Duration::from_secs(self.api.timeout_secs),
            connect_timeout: Duration::from_secs(self.api.connect_timeout_secs),
            ..ClientConfig::new(environment, version)
        }
    }

    /// Login credentials. The environment variable wins over the file.
    pub fn credentials(&self) -> Result<Credentials> {
        let password = secret(PASSWORD_ENV, self.account.password.as_deref())
            .ok_or_else(|| Error::Config(format!("no password: set {PASSWORD_ENV} or account.password")))?;
        Ok(Credentials::new(self.account.user_id.clone(), password))
    }

    pub fn second_password(&self) -> Result<SecondPassword> {
        secret(SECOND_PASSWORD_ENV, self.account.second_password.as_deref())
            .map(SecondPassword::new)
            .ok_or_else(|| {
                Error::Config(format!(
                    "no second password: set {SECOND_PASSWORD_ENV} or account.second_password"
                ))
            })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.tracker.interval_secs)
    }
}

fn secret(var: &str, from_file: Option<&str>) -> Option<String> {
    env::var(var)
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| from_file.map(str::to_string))
        .filter(|v| !v.is_empty())
}
