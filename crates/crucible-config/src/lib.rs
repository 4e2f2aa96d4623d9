#![deny(unsafe_code)]
#![warn(missing_docs)]

//! # Crucible Config
//!
//! Environment-variable-driven startup configuration (spec.md §6: "No
//! hard-coded credentials are permitted; missing required secrets must
//! fail startup."). Grounded on the teacher's `nebula-config` environment
//! loader, narrowed from a generic multi-source config framework to the
//! fixed set of variables this workspace's binaries actually read.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A startup configuration error: a required variable was missing, or a
/// present one failed to parse.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("environment variable {name} has an invalid value {value:?}: {reason}")]
    Invalid { name: &'static str, value: String, reason: String },
}

/// Startup configuration for both `crucible-runner` and `crucible-gateway`
/// (spec.md §6's environment variable list).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_host: String,
    pub bind_port: u16,
    pub registry_url: String,
    pub database_url: String,
    pub default_backend: ContainerBackend,
    pub default_timeout_ms: u32,
    pub max_timeout_ms: u32,
    pub default_cpu: crucible_manifest::Cpu,
    pub default_memory: crucible_manifest::Memory,
    pub retry_max_attempts: u32,
    pub retry_backoff_base: f64,
    pub retry_max_backoff: Duration,
    pub cache_ttl: Duration,
    pub egress_deny_by_default: bool,
    pub telemetry_endpoint: Option<String>,
}

/// Which container CLI the Sandbox Executor shells out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerBackend {
    Docker,
    Podman,
}

impl fmt::Display for ContainerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Docker => write!(f, "docker"),
            Self::Podman => write!(f, "podman"),
        }
    }
}

impl FromStr for ContainerBackend {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "podman" => Ok(Self::Podman),
            other => Err(format!("unknown container backend {other:?}")),
        }
    }
}

impl Config {
    /// Load configuration from the process environment, failing closed if
    /// `DATABASE_URL` or `REGISTRY_URL` are absent — both name the external
    /// systems this process cannot safely guess a default for.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            bind_host: env_or("CRUCIBLE_BIND_HOST", "0.0.0.0"),
            bind_port: env_parse_or("CRUCIBLE_BIND_PORT", 8080)?,
            registry_url: required("REGISTRY_URL")?,
            database_url: required("DATABASE_URL")?,
            default_backend: env_parse_or("CRUCIBLE_CONTAINER_BACKEND", ContainerBackend::Docker)?,
            default_timeout_ms: env_parse_or("CRUCIBLE_DEFAULT_TIMEOUT_MS", 30_000)?,
            max_timeout_ms: env_parse_or("CRUCIBLE_MAX_TIMEOUT_MS", crucible_manifest::MAX_TIMEOUT_MS)?,
            default_cpu: env_quantity_or("CRUCIBLE_DEFAULT_CPU", "500m", crucible_manifest::Cpu::parse)?,
            default_memory: env_quantity_or("CRUCIBLE_DEFAULT_MEMORY", "512Mi", crucible_manifest::Memory::parse)?,
            retry_max_attempts: env_parse_or("CRUCIBLE_RETRY_MAX_ATTEMPTS", 3)?,
            retry_backoff_base: env_parse_or("CRUCIBLE_RETRY_BACKOFF_BASE", 2.0)?,
            retry_max_backoff: Duration::from_secs(env_parse_or("CRUCIBLE_RETRY_MAX_BACKOFF_SECS", 60)?),
            cache_ttl: Duration::from_secs(env_parse_or("CRUCIBLE_CACHE_TTL_SECS", 1_800)?),
            egress_deny_by_default: env_parse_or("CRUCIBLE_EGRESS_DENY_BY_DEFAULT", true)?,
            telemetry_endpoint: std::env::var("CRUCIBLE_TELEMETRY_ENDPOINT").ok(),
        };
        tracing::info!(
            bind_host = %config.bind_host,
            bind_port = config.bind_port,
            backend = %config.default_backend,
            egress_deny_by_default = config.egress_deny_by_default,
            "configuration loaded"
        );
        Ok(config)
    }

    /// The Retry & Budget Controller policy implied by this configuration.
    #[must_use]
    pub fn retry_policy(&self) -> crucible_resilience::RetryPolicy {
        crucible_resilience::RetryPolicy {
            max_attempts: self.retry_max_attempts,
            base: self.retry_backoff_base,
            max_backoff: self.retry_max_backoff,
        }
    }
}

fn env_or(name: &'static str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn env_parse_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match std::env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => raw
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid { name, value: raw, reason: e.to_string() }),
    }
}

fn env_quantity_or<T>(
    name: &'static str,
    default: &str,
    parse: impl Fn(&str) -> Result<T, crucible_manifest::QuantityError>,
) -> Result<T, ConfigError> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    parse(&raw).map_err(|e| ConfigError::Invalid { name, value: raw, reason: e.to_string() })
}
