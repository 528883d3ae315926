//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::util::time::{BATTLE_POLL_TICK, MOVEMENT_TICK};

/// How the registry mints player ids
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdStyle {
    /// Random UUIDs
    Uuid,
    /// Four-digit numbers
    Numeric,
}

/// Server configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS; empty means any origin
    pub client_origins: Vec<String>,
    pub id_style: IdStyle,
    /// Joins accepted per second across all clients
    pub join_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let client_origins = env::var("CLIENT_ORIGIN")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let id_style = match env::var("PLAYER_ID_STYLE").as_deref() {
            Err(_) | Ok("uuid") => IdStyle::Uuid,
            Ok("numeric") => IdStyle::Numeric,
            Ok(_) => return Err(ConfigError::Invalid("PLAYER_ID_STYLE")),
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            log_level: log_level(),
            client_origins,
            id_style,
            join_rate_limit: parse_or("JOIN_RATE_LIMIT", 20)?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            client_origins: Vec::new(),
            id_style: IdStyle::Uuid,
            join_rate_limit: 20,
        }
    }
}

/// Sync client configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the arena server
    pub server_url: String,
    pub log_level: String,
    pub map_width: i32,
    pub map_height: i32,
    /// Movement and position push interval
    pub movement_tick: Duration,
    /// Opponent poll interval while waiting for their attacks
    pub battle_poll: Duration,
    /// Seed for the bot's decisions; random when unset
    pub bot_seed: Option<u64>,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_seed = match env::var("BOT_SEED") {
            Ok(_) => Some(parse_or("BOT_SEED", 0)?),
            Err(_) => None,
        };

        Ok(Self {
            server_url: env::var("SERVER_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string())
                .trim_end_matches('/')
                .to_string(),
            log_level: log_level(),
            map_width: parse_or("MAP_WIDTH", 320)?,
            map_height: parse_or("MAP_HEIGHT", 240)?,
            movement_tick: Duration::from_millis(parse_or(
                "MOVEMENT_TICK_MS",
                MOVEMENT_TICK.as_millis() as u64,
            )?),
            battle_poll: Duration::from_millis(parse_or(
                "BATTLE_POLL_MS",
                BATTLE_POLL_TICK.as_millis() as u64,
            )?),
            bot_seed,
        })
    }
}

fn log_level() -> String {
    env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string())
}

/// Parse an optional variable, falling back to `default` when unset
fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
