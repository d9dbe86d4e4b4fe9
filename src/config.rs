use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_LOOKUP_URL: &str = "https://viacep.com.br/ws";
pub const DEFAULT_SESSION_QUOTA_BYTES: usize = 5 * 1024 * 1024;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is invalid: '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub lookup_url: String,
    pub lookup_timeout: Duration,
    /// `None` disables the mirror quota.
    pub session_quota_bytes: Option<usize>,
    /// `None` keeps idle sessions until they are closed.
    pub session_idle_timeout: Option<Duration>,
    pub export_dir: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let quota: usize = parse_or(&var, "SESSION_QUOTA_BYTES", DEFAULT_SESSION_QUOTA_BYTES)?;
        let idle_secs: u64 = parse_or(&var, "SESSION_IDLE_SECS", DEFAULT_SESSION_IDLE_SECS)?;
        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&var, "PORT", 8080)?,
            lookup_url: var("POSTAL_LOOKUP_URL").unwrap_or_else(|| DEFAULT_LOOKUP_URL.to_string()),
            lookup_timeout: Duration::from_secs(parse_or(&var, "POSTAL_LOOKUP_TIMEOUT_SECS", 10)?),
            session_quota_bytes: (quota > 0).then_some(quota),
            session_idle_timeout: (idle_secs > 0).then(|| Duration::from_secs(idle_secs)),
            export_dir: var("EXPORT_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        })
    }
}

fn parse_or<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
