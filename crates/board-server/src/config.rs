//! Configuration for the leaderboard server.
//!
//! Defaults can be overridden either from a TOML file
//! ([`Config::load`]) or from environment variables ([`Config::from_env`]):
//!
//! - `BOARD_BIND_ADDR`         (default: "0.0.0.0")
//! - `BOARD_PORT`              (default: "8080")
//! - `BOARD_STORE`             (default: "memory", or "resp")
//! - `BOARD_STORE_ADDR`        (default: "127.0.0.1:7379")
//! - `BOARD_KEY`               (default: "leaderboard")
//! - `BOARD_TOP_K`             (default: "6")
//! - `BOARD_TRIGGER`           (default: "interval", or "notify")
//! - `BOARD_POLL_INTERVAL_MS`  (default: "1000")
//! - `BOARD_SEND_TIMEOUT_MS`   (default: "2000")
//! - `BOARD_STORE_TIMEOUT_MS`  (default: "2000")
//! - `BOARD_RETRY_DELAY_MS`    (default: "1000")
//! - `BOARD_OUTBOUND_CAPACITY` (default: "8")
//! - `BOARD_MAX_SUBSCRIBERS`   (default: "0", unlimited)
//! - `BOARD_STATIC_FILE`       (default: "index.html")

use std::env;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use board_core::DEFAULT_TOP_K;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which ordered-set backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// In-process ordered set; state is lost on restart.
    Memory,
    /// External RESP server (Redis / DiceDB compatible).
    Resp,
}

/// What drives snapshot production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// The store pushes a notification on every change.
    Notify,
    /// A fixed-period timer, whether or not anything changed.
    Interval,
}

#[derive(Debug, Error)]
#[error("unknown value '{0}'")]
pub struct ParseModeError(String);

impl FromStr for StoreKind {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "resp" | "redis" | "dicedb" => Ok(StoreKind::Resp),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

impl FromStr for TriggerMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "notify" | "watch" => Ok(TriggerMode::Notify),
            "interval" | "poll" => Ok(TriggerMode::Interval),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerMode::Notify => f.write_str("notify"),
            TriggerMode::Interval => f.write_str("interval"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {key}: {message}")]
    Env { key: &'static str, message: String },

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// HTTP port to listen on.
    pub port: u16,

    pub store: StoreKind,

    /// `host:port` of the RESP store (ignored for the memory store).
    pub store_addr: String,

    /// Ordered-set key holding the leaderboard.
    pub leaderboard_key: String,

    /// Number of ranked entries per snapshot.
    pub top_k: usize,

    pub trigger: TriggerMode,

    /// Period of the interval trigger.
    pub poll_interval_ms: u64,

    /// Bound on handing a snapshot to one subscriber, and on one socket write.
    pub send_timeout_ms: u64,

    /// Bound on one store round-trip.
    pub store_timeout_ms: u64,

    /// Back-off after the trigger source reports a store failure.
    pub retry_delay_ms: u64,

    /// Snapshots queued per subscriber before deliveries start to wait.
    pub outbound_capacity: usize,

    /// Maximum simultaneously connected subscribers (0 = unlimited).
    pub max_subscribers: usize,

    /// File served at `/`.
    pub static_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            store: StoreKind::Memory,
            store_addr: "127.0.0.1:7379".to_string(),
            leaderboard_key: "leaderboard".to_string(),
            top_k: DEFAULT_TOP_K,
            trigger: TriggerMode::Interval,
            poll_interval_ms: 1000,
            send_timeout_ms: 2000,
            store_timeout_ms: 2000,
            retry_delay_ms: 1000,
            outbound_capacity: 8,
            max_subscribers: 0,
            static_file: "index.html".to_string(),
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let d = Config::default();

        Ok(Config {
            bind_addr: env::var("BOARD_BIND_ADDR").unwrap_or(d.bind_addr),
            port: read_env_or_default("BOARD_PORT", d.port)?,
            store: read_env_or_default("BOARD_STORE", d.store)?,
            store_addr: env::var("BOARD_STORE_ADDR").unwrap_or(d.store_addr),
            leaderboard_key: env::var("BOARD_KEY").unwrap_or(d.leaderboard_key),
            top_k: read_env_or_default("BOARD_TOP_K", d.top_k)?,
            trigger: read_env_or_default("BOARD_TRIGGER", d.trigger)?,
            poll_interval_ms: read_env_or_default("BOARD_POLL_INTERVAL_MS", d.poll_interval_ms)?,
            send_timeout_ms: read_env_or_default("BOARD_SEND_TIMEOUT_MS", d.send_timeout_ms)?,
            store_timeout_ms: read_env_or_default("BOARD_STORE_TIMEOUT_MS", d.store_timeout_ms)?,
            retry_delay_ms: read_env_or_default("BOARD_RETRY_DELAY_MS", d.retry_delay_ms)?,
            outbound_capacity: read_env_or_default(
                "BOARD_OUTBOUND_CAPACITY",
                d.outbound_capacity,
            )?,
            max_subscribers: read_env_or_default("BOARD_MAX_SUBSCRIBERS", d.max_subscribers)?,
            static_file: env::var("BOARD_STATIC_FILE").unwrap_or(d.static_file),
        })
    }

    /// Load from a TOML file; missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be at least 1"));
        }
        if self.leaderboard_key.is_empty() {
            return Err(ConfigError::Invalid("leaderboard_key must not be empty"));
        }
        if self.poll_interval_ms == 0
            || self.send_timeout_ms == 0
            || self.store_timeout_ms == 0
            || self.retry_delay_ms == 0
        {
            return Err(ConfigError::Invalid("durations must be non-zero"));
        }
        if self.outbound_capacity == 0 {
            return Err(ConfigError::Invalid("outbound_capacity must be at least 1"));
        }
        Ok(())
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

fn read_env_or_default<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(val) => val.trim().parse::<T>().map_err(|e| ConfigError::Env {
            key,
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
