//! Configuration for the arena TCP server.
//!
//! Defaults can be overridden via environment variables:
//!
//! - `ARENA_BIND_ADDR`            (default: "0.0.0.0")
//! - `ARENA_PORT`                 (default: "9000")
//! - `ARENA_MAX_CLIENTS`          (default: "1024")
//! - `ARENA_DATA_DIR`             (default: "./data")
//! - `ARENA_TICK_MS`              (default: "100")
//! - `ARENA_ADMIN_NICKNAME`       (default: "admin")
//! - `ARENA_CHAT_CAPACITY`        (default: "100")
//! - `ARENA_HANDSHAKE_TIMEOUT_MS` (default: "10000")
//! - `ARENA_OUTBOUND_QUEUE`       (default: "256", minimum 16)

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context};
use arena_core::{ArenaConfig, DEFAULT_CHAT_CAPACITY};

/// Room for a full hydration burst on a fresh connection.
pub const MIN_OUTBOUND_QUEUE: usize = 16;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    /// Maximum number of simultaneously open connections.
    pub max_clients: usize,

    /// Directory holding `registry.json` and `chat_history.json`.
    pub data_dir: PathBuf,

    /// Period of the `timerUpdate` broadcast.
    pub tick: Duration,

    /// How long a new connection may take to send its first frame.
    pub handshake_timeout: Duration,

    /// Frames that may wait for one connection's writer before the
    /// connection is dropped.
    pub outbound_queue: usize,

    pub admin_nickname: String,

    pub chat_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 9000,
            max_clients: 1024,
            data_dir: PathBuf::from("./data"),
            tick: Duration::from_millis(100),
            handshake_timeout: Duration::from_millis(10_000),
            outbound_queue: 256,
            admin_nickname: "admin".to_string(),
            chat_capacity: DEFAULT_CHAT_CAPACITY,
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to the defaults above.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();

        let bind_addr = env::var("ARENA_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let port = read_env_or_default("ARENA_PORT", defaults.port)?;
        let max_clients = read_env_or_default("ARENA_MAX_CLIENTS", defaults.max_clients)?;
        let data_dir = env::var("ARENA_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);
        let tick_ms = read_env_or_default("ARENA_TICK_MS", 100u64)?;
        let handshake_ms = read_env_or_default("ARENA_HANDSHAKE_TIMEOUT_MS", 10_000u64)?;
        let outbound_queue = read_env_or_default("ARENA_OUTBOUND_QUEUE", defaults.outbound_queue)?;
        let admin_nickname =
            env::var("ARENA_ADMIN_NICKNAME").unwrap_or(defaults.admin_nickname);
        let chat_capacity = read_env_or_default("ARENA_CHAT_CAPACITY", defaults.chat_capacity)?;

        if tick_ms == 0 {
            bail!("ARENA_TICK_MS must be greater than zero");
        }
        if max_clients == 0 {
            bail!("ARENA_MAX_CLIENTS must be greater than zero");
        }
        if outbound_queue < MIN_OUTBOUND_QUEUE {
            bail!("ARENA_OUTBOUND_QUEUE must be at least {}", MIN_OUTBOUND_QUEUE);
        }

        Ok(Config {
            bind_addr,
            port,
            max_clients,
            data_dir,
            tick: Duration::from_millis(tick_ms),
            handshake_timeout: Duration::from_millis(handshake_ms),
            outbound_queue,
            admin_nickname,
            chat_capacity,
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// The subset handed to the arena core.
    pub fn arena_config(&self) -> ArenaConfig {
        ArenaConfig {
            admin_nickname: self.admin_nickname.clone(),
            chat_capacity: self.chat_capacity,
        }
    }
}

fn read_env_or_default<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .with_context(|| format!("invalid value {:?} for {}", val, key)),
        Err(_) => Ok(default),
    }
}
