//! Configuration handling for the service.
//!
//! Everything is read from environment variables once at startup by
//! `Config::from_env`, with development defaults for anything unset.

use std::env;
use std::time::Duration;

use thiserror::Error;

pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_PORT: &str = "PORT";
pub const ENV_FETCH_CONNECT_TIMEOUT_SECS: &str = "FETCH_CONNECT_TIMEOUT_SECS";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "FETCH_TIMEOUT_SECS";
pub const ENV_RENDER_TIMEOUT_SECS: &str = "RENDER_TIMEOUT_SECS";
pub const ENV_RENDER_ENABLED: &str = "RENDER_ENABLED";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 30;

/// Timeouts applied to outbound HTTP fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

/// Headless rendering settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    /// Bound on navigation plus the wait for the document to parse.
    pub timeout: Duration,
    /// When false, rendered strategies are downgraded to static ones.
    pub enabled: bool,
    pub chrome_executable: Option<String>,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECS),
            enabled: true,
            chrome_executable: None,
        }
    }
}

/// Application runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    bind_addr: String,
    fetch: FetchSettings,
    render: RenderSettings,
}

impl Config {
    pub fn new(bind_addr: impl Into<String>, fetch: FetchSettings, render: RenderSettings) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            fetch,
            render,
        }
    }

    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = match (env::var(ENV_BIND_ADDR), env::var(ENV_PORT)) {
            (Ok(addr), _) => addr,
            (Err(_), Ok(port)) => {
                let port: u16 = parse_var(ENV_PORT, &port)?;
                format!("0.0.0.0:{port}")
            }
            _ => DEFAULT_BIND_ADDR.to_string(),
        };

        let fetch = FetchSettings {
            connect_timeout: secs_var(ENV_FETCH_CONNECT_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS)?,
            timeout: secs_var(ENV_FETCH_TIMEOUT_SECS, DEFAULT_FETCH_TIMEOUT_SECS)?,
        };

        let enabled = match env::var(ENV_RENDER_ENABLED) {
            Ok(raw) => parse_bool(ENV_RENDER_ENABLED, &raw)?,
            Err(_) => true,
        };
        let render = RenderSettings {
            timeout: secs_var(ENV_RENDER_TIMEOUT_SECS, DEFAULT_RENDER_TIMEOUT_SECS)?,
            enabled,
            chrome_executable: env::var(ENV_CHROME_EXECUTABLE)
                .ok()
                .filter(|path| !path.trim().is_empty()),
        };

        Ok(Self {
            bind_addr,
            fetch,
            render,
        })
    }

    /// TCP bind address (host:port) for the HTTP server.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }

    pub fn fetch(&self) -> FetchSettings {
        self.fetch
    }

    pub fn render(&self) -> &RenderSettings {
        &self.render
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(
            DEFAULT_BIND_ADDR,
            FetchSettings::default(),
            RenderSettings::default(),
        )
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

fn parse_var<T>(field: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            field,
            reason: e.to_string(),
        })
}

fn secs_var(field: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match env::var(field) {
        Ok(raw) => {
            let secs: u64 = parse_var(field, &raw)?;
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(Duration::from_secs(default)),
    }
}

fn parse_bool(field: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            field,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}
