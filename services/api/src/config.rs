use openai_realtime::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_IDLE_TIMEOUT};
use podcast_core::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryPolicy};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// An API key and base URL pair, as read from the environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub api_key: String,
    pub api_base: String,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("api_key", &"[REDACTED]")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Used for the host persona and the text pipeline.
    pub primary: Endpoint,
    /// Used for the guest persona.
    pub secondary: Endpoint,
    pub chat_deployment: String,
    pub realtime_deployment: String,
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Limit on opening the realtime WebSocket.
    pub realtime_connect_timeout: Duration,
    /// Longest silence tolerated between realtime server messages.
    pub realtime_idle_timeout: Duration,
    pub log_level: Level,
    pub static_dir: PathBuf,
    pub index_path: PathBuf,
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::MissingVar(name.to_string()))
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// A duration given in (possibly fractional) seconds.
fn seconds_or(name: &str, default: Duration) -> Result<Duration, ConfigError> {
    let secs = parse_or(name, default.as_secs_f64())?;
    Duration::try_from_secs_f64(secs)
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

fn positive_seconds_or(name: &str, default: Duration) -> Result<Duration, ConfigError> {
    let duration = seconds_or(name, default)?;
    if duration.is_zero() {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    Ok(duration)
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let primary = Endpoint {
            api_key: required("OPENAI_API_KEY")?,
            api_base: required("OPENAI_API_BASE")?,
        };
        let chat_deployment = required("OPENAI_DEPLOYMENT_NAME")?;
        let realtime_deployment = required("OPENAI_REALTIME_DEPLOYMENT_NAME")?;
        let secondary = Endpoint {
            api_key: required("OPENAI_API_KEY_B")?,
            api_base: required("OPENAI_API_BASE_B")?,
        };

        let max_retries = parse_or("MAX_RETRIES", DEFAULT_MAX_ATTEMPTS)?;
        if max_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_RETRIES".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let retry_delay = seconds_or("RETRY_DELAY", DEFAULT_RETRY_DELAY)?;
        let realtime_connect_timeout =
            positive_seconds_or("REALTIME_CONNECT_TIMEOUT", DEFAULT_CONNECT_TIMEOUT)?;
        let realtime_idle_timeout =
            positive_seconds_or("REALTIME_IDLE_TIMEOUT", DEFAULT_IDLE_TIMEOUT)?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let static_dir = std::env::var("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./static"));
        let index_path = std::env::var("INDEX_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./index.html"));

        Ok(Self {
            bind_address,
            primary,
            secondary,
            chat_deployment,
            realtime_deployment,
            max_retries,
            retry_delay,
            realtime_connect_timeout,
            realtime_idle_timeout,
            log_level,
            static_dir,
            index_path,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            delay: self.retry_delay,
        }
    }
}
