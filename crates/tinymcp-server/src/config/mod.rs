//! Configuration loading and resolution.
//!
//! Every setting resolves the same way: explicit CLI value, then the
//! matching `TINYMCP_*` environment variable, then the built-in default.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_TRANSPORT: &str = "TINYMCP_TRANSPORT";
pub const ENV_HOST: &str = "TINYMCP_HOST";
pub const ENV_PORT: &str = "TINYMCP_PORT";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SSE_PATH: &str = "/sse";
pub const DEFAULT_MESSAGE_PATH: &str = "/messages";
pub const HEALTH_PATH: &str = "/health";
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 30;
pub const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 30;
/// Pending jobs between HTTP handlers (or the stdin reader) and dispatch.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Unknown transport '{0}' (expected s/stdio or h/http/sse)")]
    UnknownTransport(String),

    #[error("Invalid port '{value}': {source}")]
    InvalidPort {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("HTTP path '{0}' must start with '/'")]
    InvalidPath(String),

    #[error("SSE path and message path must differ (both '{0}')")]
    PathConflict(String),

    #[error("HTTP path '{0}' is reserved")]
    ReservedPath(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportKind {
    #[default]
    Stdio,
    Http,
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "stdio" => Ok(TransportKind::Stdio),
            "h" | "http" | "sse" => Ok(TransportKind::Http),
            _ => Err(ConfigError::UnknownTransport(s.to_string())),
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Stdio => f.write_str("stdio"),
            TransportKind::Http => f.write_str("http"),
        }
    }
}

/// Settings for the HTTP + SSE transport.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub sse_path: String,
    pub message_path: String,
    /// Idle time after which the SSE stream emits a keep-alive comment.
    pub keep_alive: Duration,
    /// How long a POST waits for the dispatcher before acknowledging anyway.
    pub dispatch_timeout: Duration,
    pub queue_capacity: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            sse_path: DEFAULT_SSE_PATH.to_string(),
            message_path: DEFAULT_MESSAGE_PATH.to_string(),
            keep_alive: Duration::from_secs(DEFAULT_KEEP_ALIVE_SECS),
            dispatch_timeout: Duration::from_secs(DEFAULT_DISPATCH_TIMEOUT_SECS),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl HttpConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for path in [&self.sse_path, &self.message_path] {
            if !path.starts_with('/') {
                return Err(ConfigError::InvalidPath(path.clone()));
            }
        }
        if self.sse_path == self.message_path {
            return Err(ConfigError::PathConflict(self.sse_path.clone()));
        }
        for path in [&self.sse_path, &self.message_path] {
            if path == HEALTH_PATH {
                return Err(ConfigError::ReservedPath(path.clone()));
            }
        }
        if self.keep_alive.is_zero() {
            return Err(ConfigError::ZeroDuration("keep-alive interval"));
        }
        if self.dispatch_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("dispatch timeout"));
        }
        Ok(())
    }
}

/// Values given explicitly on the command line.
#[derive(Debug, Clone, Default)]
pub struct ServeOverrides {
    pub transport: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub sse_path: Option<String>,
    pub message_path: Option<String>,
    pub keep_alive_secs: Option<u64>,
    pub dispatch_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub transport: TransportKind,
    pub http: HttpConfig,
}

/// Resolve against the process environment.
pub fn resolve(overrides: &ServeOverrides) -> Result<ServerConfig, ConfigError> {
    resolve_with(overrides, |key| std::env::var(key).ok())
}

/// Resolve with an injectable environment lookup.
pub fn resolve_with<E>(overrides: &ServeOverrides, env: E) -> Result<ServerConfig, ConfigError>
where
    E: Fn(&str) -> Option<String>,
{
    let transport = match overrides.transport.clone().or_else(|| env(ENV_TRANSPORT)) {
        Some(raw) => raw.parse()?,
        None => TransportKind::default(),
    };

    let port = match overrides.port {
        Some(port) => port,
        None => match env(ENV_PORT) {
            Some(raw) => raw.trim().parse().map_err(|source| ConfigError::InvalidPort {
                value: raw.clone(),
                source,
            })?,
            None => DEFAULT_PORT,
        },
    };

    let defaults = HttpConfig::default();
    let http = HttpConfig {
        host: overrides
            .host
            .clone()
            .or_else(|| env(ENV_HOST))
            .unwrap_or(defaults.host),
        port,
        sse_path: overrides.sse_path.clone().unwrap_or(defaults.sse_path),
        message_path: overrides
            .message_path
            .clone()
            .unwrap_or(defaults.message_path),
        keep_alive: overrides
            .keep_alive_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.keep_alive),
        dispatch_timeout: overrides
            .dispatch_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.dispatch_timeout),
        queue_capacity: defaults.queue_capacity,
    };
    http.validate()?;

    Ok(ServerConfig { transport, http })
}
