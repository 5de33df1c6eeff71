//! # Configuration
//!
//! TOML configuration for the tinyworld server, loaded once at startup.
//!
//! ## Configuration Structure
//!
//! - [`ServerConfig`] - listener address, session limits, output buffering
//! - [`WorldConfig`] - world seed location and new-player defaults
//! - [`LoggingConfig`] - log level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tinyworld::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     config.validate()?;
//!     println!("Listening on {}", config.server.bind);
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:4000"
//! max_sessions = 64
//! output_buffer = 64
//! write_timeout_ms = 2000
//! login_timeout_ms = 60000
//! npc_tick_ms = 15000
//!
//! [world]
//! seed_path = "data/seeds/world.json"
//! starting_dollars = 20
//!
//! [logging]
//! level = "info"
//! file = "tinyworld.log"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::world::{RoomId, DEFAULT_STARTING_DOLLARS, NO_EXIT};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub world: WorldConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
    pub max_sessions: usize,
    /// Lines buffered per session before further output to it is dropped.
    #[serde(default = "default_output_buffer")]
    pub output_buffer: usize,
    /// Upper bound on a single socket write (ms). A session that cannot keep
    /// up within this bound is disconnected.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,
    /// How long a new connection may take to pick a name (ms).
    #[serde(default = "default_login_timeout_ms")]
    pub login_timeout_ms: u64,
    /// Interval between NPC wander/prowl ticks (ms). 0 disables NPC movement.
    #[serde(default = "default_npc_tick_ms")]
    pub npc_tick_ms: u64,
}

fn default_output_buffer() -> usize {
    64
}

fn default_write_timeout_ms() -> u64 {
    2000
}

fn default_login_timeout_ms() -> u64 {
    60_000
}

fn default_npc_tick_ms() -> u64 {
    15_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// JSON world definition. When the file is missing the built-in world is used.
    #[serde(default = "default_seed_path")]
    pub seed_path: String,
    /// Overrides the seed's start room when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_room: Option<RoomId>,
    #[serde(default = "default_starting_dollars")]
    pub starting_dollars: u32,
}

fn default_seed_path() -> String {
    "data/seeds/world.json".to_string()
}

fn default_starting_dollars() -> u32 {
    DEFAULT_STARTING_DOLLARS
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed_path: default_seed_path(),
            start_room: None,
            starting_dollars: default_starting_dollars(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Load `path`, or use [`Config::default`] when no file exists there.
    /// A file that exists but cannot be read or parsed is still an error.
    pub async fn load_or_default(path: &str) -> Result<Self> {
        match fs::try_exists(path).await {
            Ok(false) => Ok(Config::default()),
            _ => Self::load(path).await,
        }
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.max_sessions == 0 {
            return Err(anyhow!("server.max_sessions must be at least 1"));
        }
        if self.server.output_buffer == 0 {
            return Err(anyhow!("server.output_buffer must be at least 1"));
        }
        if self.server.write_timeout_ms == 0 {
            return Err(anyhow!("server.write_timeout_ms must be positive"));
        }
        if self.server.login_timeout_ms == 0 {
            return Err(anyhow!("server.login_timeout_ms must be positive"));
        }
        if self.world.start_room == Some(NO_EXIT) {
            return Err(anyhow!(
                "world.start_room cannot be {} (reserved for blocked exits)",
                NO_EXIT
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                bind: "127.0.0.1:4000".to_string(),
                max_sessions: 64,
                output_buffer: default_output_buffer(),
                write_timeout_ms: default_write_timeout_ms(),
                login_timeout_ms: default_login_timeout_ms(),
                npc_tick_ms: default_npc_tick_ms(),
            },
            world: WorldConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("tinyworld.log".to_string()),
            },
        }
    }
}
