use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use ts_scanner::ScanLoopConfig;

pub const ENV_ADDR: &str = "TOKENSCOPE_ADDR";
pub const ENV_DB_PATH: &str = "TOKENSCOPE_DB_PATH";
pub const ENV_SCAN_INTERVAL_SECS: &str = "TOKENSCOPE_SCAN_INTERVAL_SECS";
pub const ENV_SUBSCRIBER_BUFFER: &str = "TOKENSCOPE_SUBSCRIBER_BUFFER";
pub const ENV_FEED_SEED: &str = "TOKENSCOPE_FEED_SEED";
pub const ENV_REPLAY_FILE: &str = "TOKENSCOPE_REPLAY_FILE";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Process configuration, read from `TOKENSCOPE_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// DuckDB file; `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    pub scan_interval: Duration,
    /// Per-subscriber channel capacity.
    pub subscriber_buffer: usize,
    pub feed_seed: Option<u64>,
    /// JSON-lines observations to replay instead of simulating.
    pub replay_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            db_path: None,
            scan_interval: Duration::from_secs(10),
            subscriber_buffer: 64,
            feed_seed: None,
            replay_file: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Unset or blank variables keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(raw) = get(ENV_ADDR) {
            config.addr = parse(ENV_ADDR, &raw)?;
        }
        config.db_path = get(ENV_DB_PATH).map(PathBuf::from);
        config.replay_file = get(ENV_REPLAY_FILE).map(PathBuf::from);

        if let Some(raw) = get(ENV_SCAN_INTERVAL_SECS) {
            let secs: u64 = parse(ENV_SCAN_INTERVAL_SECS, &raw)?;
            if secs == 0 {
                return Err(invalid(ENV_SCAN_INTERVAL_SECS, &raw, "must be at least 1"));
            }
            config.scan_interval = Duration::from_secs(secs);
        }

        if let Some(raw) = get(ENV_SUBSCRIBER_BUFFER) {
            let buffer: usize = parse(ENV_SUBSCRIBER_BUFFER, &raw)?;
            if buffer == 0 {
                return Err(invalid(ENV_SUBSCRIBER_BUFFER, &raw, "must be at least 1"));
            }
            config.subscriber_buffer = buffer;
        }

        if let Some(raw) = get(ENV_FEED_SEED) {
            config.feed_seed = Some(parse(ENV_FEED_SEED, &raw)?);
        }

        Ok(config)
    }

    pub fn scan_loop(&self) -> ScanLoopConfig {
        ScanLoopConfig {
            interval: self.scan_interval,
        }
    }
}

fn parse<T>(var: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| invalid(var, raw, &e.to_string()))
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
