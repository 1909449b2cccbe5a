//! Per-process configuration.
//!
//! An explicit [`RuntimeConfig`] is constructed once and passed into a
//! `Session`/daemon at startup instead of living behind a global.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum severity emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    None,
    Error,
    Warning,
    Info,
    Debug,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Warning
    }
}

impl LogLevel {
    /// The `tracing_subscriber::EnvFilter` directive equivalent to this level.
    #[must_use]
    pub fn as_filter_directive(self) -> &'static str {
        match self {
            LogLevel::None => "off",
            LogLevel::Error => "error",
            LogLevel::Warning => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// Negotiated content format for outgoing Reads/Writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    PlainText,
    Opaque,
    Tlv,
}

impl Default for ContentFormat {
    fn default() -> Self {
        ContentFormat::Tlv
    }
}

/// Which side of the split-process architecture a `RuntimeConfig` is for;
/// only affects default endpoint ports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Server,
}

/// A `(host, port)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: IpAddr,
    pub port: u16,
}

impl Endpoint {
    #[must_use]
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self { host, port }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl std::str::FromStr for Endpoint {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let addr: std::net::SocketAddr = s.parse().map_err(|_| ConfigError::ParseError {
            reason: format!("invalid endpoint {s:?}"),
        })?;
        Ok(Self::new(addr.ip(), addr.port()))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: String },
    #[error("failed to parse config: {reason}")]
    ParseError { reason: String },
    #[error("invalid config values: {reasons:?}")]
    ValidationError { reasons: Vec<String> },
}

/// Explicit, process-level configuration.
///
/// Constructed once, passed to `Session::connect` / the daemon entry point,
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub log_level: LogLevel,
    pub daemon_endpoint: Endpoint,
    pub coap_endpoint: Endpoint,
    #[serde(default)]
    pub content_format: ContentFormat,
    #[serde(default = "default_max_message_size")]
    pub max_message_size_bytes: u32,
    /// Maximum leaves accepted per Read/Write/Delete/Execute request.
    ///
    /// Default is `1`; lifted only by explicit configuration.
    #[serde(default = "default_max_leaves")]
    pub max_leaves_per_request: usize,
    /// Where a client-role daemon sends its CoAP registration. Unused by a
    /// server-role daemon.
    #[serde(default)]
    pub server_endpoint: Option<Endpoint>,
}

fn default_max_message_size() -> u32 {
    65536
}

fn default_max_leaves() -> usize {
    1
}

impl RuntimeConfig {
    /// Built-in defaults for the given role: client defaults to port 12345,
    /// server to port 54321.
    #[must_use]
    pub fn default_for(role: Role) -> Self {
        let daemon_port = match role {
            Role::Client => 12345,
            Role::Server => 54321,
        };
        Self {
            log_level: LogLevel::default(),
            daemon_endpoint: Endpoint::new(IpAddr::V4(Ipv4Addr::LOCALHOST), daemon_port),
            coap_endpoint: Endpoint::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 5683),
            content_format: ContentFormat::default(),
            max_message_size_bytes: default_max_message_size(),
            max_leaves_per_request: default_max_leaves(),
            server_endpoint: None,
        }
    }

    /// Load from a TOML file, falling back to `role`'s built-in defaults for
    /// any field the file omits (file values take precedence over defaults;
    /// see [`Self::apply_env_overrides`] for the next layer).
    pub fn load_from_file(path: &Path, role: Role) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            reason: e.to_string(),
        })?;
        let partial: PartialConfig = toml::from_str(&raw).map_err(|e| ConfigError::ParseError {
            reason: e.to_string(),
        })?;
        Ok(partial.merge_onto(Self::default_for(role)))
    }

    /// Apply `LWM2M_*` environment variable overrides (env wins over file,
    /// loses to explicit CLI flags applied by the caller afterwards).
    #[must_use]
    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("LWM2M_LOG_LEVEL") {
            if let Ok(level) = toml::from_str::<LogLevel>(&format!("\"{}\"", v.to_lowercase())) {
                self.log_level = level;
            }
        }
        if let Ok(v) = std::env::var("LWM2M_DAEMON_ENDPOINT") {
            if let Ok(ep) = v.parse() {
                self.daemon_endpoint = ep;
            }
        }
        if let Ok(v) = std::env::var("LWM2M_COAP_ENDPOINT") {
            if let Ok(ep) = v.parse() {
                self.coap_endpoint = ep;
            }
        }
        if let Ok(v) = std::env::var("LWM2M_CONTENT_FORMAT") {
            if let Ok(fmt) = toml::from_str::<ContentFormat>(&format!("\"{}\"", v.to_lowercase())) {
                self.content_format = fmt;
            }
        }
        if let Ok(v) = std::env::var("LWM2M_MAX_MESSAGE_SIZE_BYTES") {
            if let Ok(n) = v.parse() {
                self.max_message_size_bytes = n;
            }
        }
        if let Ok(v) = std::env::var("LWM2M_SERVER_ENDPOINT") {
            if let Ok(ep) = v.parse() {
                self.server_endpoint = Some(ep);
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut reasons = Vec::new();
        if self.max_message_size_bytes == 0 {
            reasons.push("max_message_size_bytes must be positive".to_string());
        }
        if self.max_leaves_per_request == 0 {
            reasons.push("max_leaves_per_request must be positive".to_string());
        }
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError { reasons })
        }
    }
}

/// Mirrors [`RuntimeConfig`] but every field is optional, for partial TOML files.
#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    log_level: Option<LogLevel>,
    daemon_endpoint: Option<Endpoint>,
    coap_endpoint: Option<Endpoint>,
    content_format: Option<ContentFormat>,
    max_message_size_bytes: Option<u32>,
    max_leaves_per_request: Option<usize>,
    server_endpoint: Option<Endpoint>,
}

impl PartialConfig {
    fn merge_onto(self, base: RuntimeConfig) -> RuntimeConfig {
        RuntimeConfig {
            log_level: self.log_level.unwrap_or(base.log_level),
            daemon_endpoint: self.daemon_endpoint.unwrap_or(base.daemon_endpoint),
            coap_endpoint: self.coap_endpoint.unwrap_or(base.coap_endpoint),
            content_format: self.content_format.unwrap_or(base.content_format),
            max_message_size_bytes: self
                .max_message_size_bytes
                .unwrap_or(base.max_message_size_bytes),
            max_leaves_per_request: self
                .max_leaves_per_request
                .unwrap_or(base.max_leaves_per_request),
            server_endpoint: self.server_endpoint.or(base.server_endpoint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_differ_by_role() {
        let client = RuntimeConfig::default_for(Role::Client);
        let server = RuntimeConfig::default_for(Role::Server);
        assert_eq!(client.daemon_endpoint.port, 12345);
        assert_eq!(server.daemon_endpoint.port, 54321);
    }

    #[test]
    fn validate_rejects_zero_message_size() {
        let mut cfg = RuntimeConfig::default_for(Role::Client);
        cfg.max_message_size_bytes = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn max_leaves_defaults_to_one() {
        let cfg = RuntimeConfig::default_for(Role::Client);
        assert_eq!(cfg.max_leaves_per_request, 1);
    }

    #[test]
    fn server_endpoint_defaults_to_none() {
        let cfg = RuntimeConfig::default_for(Role::Client);
        assert!(cfg.server_endpoint.is_none());
    }
}
