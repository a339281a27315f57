use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Port the service listens on. Not configurable.
pub const DEFAULT_PORT: u16 = 8080;
/// Upper bound on how long shutdown waits for in-flight requests.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub addr: SocketAddr,
    pub shutdown_timeout: Duration,
    pub log_filter: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            addr: ([0, 0, 0, 0], DEFAULT_PORT).into(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

impl AppConfig {
    /// Build the process configuration. Only the log filter comes from the
    /// environment (`RUST_LOG`); the listen address and shutdown deadline are
    /// fixed.
    pub fn from_env() -> Result<Self> {
        let log_filter =
            parse_log_filter("RUST_LOG")?.unwrap_or_else(|| DEFAULT_LOG_FILTER.to_owned());
        Ok(Self {
            log_filter,
            ..Self::default()
        })
    }

    /// Filter for the tracing subscriber. `log_filter` is validated by
    /// `from_env`, so a bad value here only comes from a hand-built config.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_new(&self.log_filter)
            .map_err(|e| anyhow!("invalid log filter '{}': {}", self.log_filter, e))
    }
}

fn parse_log_filter(var: &str) -> Result<Option<String>> {
    match env::var(var) {
        Ok(value) if !value.trim().is_empty() => {
            let value = value.trim().to_owned();
            EnvFilter::try_new(&value)
                .map_err(|e| anyhow!("{} must be a valid tracing filter: {}", var, e))?;
            Ok(Some(value))
        }
        Ok(_) => Ok(None),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err.into()),
    }
}
