//! Configuration management (`statecast.toml`)
//!
//! Settings are read from TOML with per-field defaults, so a partial or
//! empty file is valid. The default location is the platform config
//! directory; the binary lets CLI flags override individual values.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compose::{GameState, StatePriority};

/// Config file name inside the config directory
pub const CONFIG_FILE: &str = "statecast.toml";

/// Failures while reading or validating a config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid setting {setting}: {reason}")]
    Invalid {
        setting: &'static str,
        reason: String,
    },
}

/// Server configuration, one section per concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Listener and client queue settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Schema document locations
    #[serde(default)]
    pub schema: SchemaConfig,
    /// Emulator inputs
    #[serde(default)]
    pub emulator: EmulatorConfig,
    /// Session loop timing
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: 0.0.0.0)
    #[serde(default = "default_host")]
    pub host: String,
    /// WebSocket port (default: 8765)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Snapshots buffered per client before it is dropped (default: 8)
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
    /// Commands buffered between the transport and the loop (default: 256)
    #[serde(default = "default_input_queue")]
    pub input_queue: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Address-definition document
    #[serde(default = "default_addresses")]
    pub addresses: PathBuf,
    /// Value-translation document
    #[serde(default = "default_values")]
    pub values: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmulatorConfig {
    /// Cartridge ROM; its first 32 KiB are mapped at 0x0000
    #[serde(default)]
    pub rom: Option<PathBuf>,
    /// Raw memory dump loaded into the address space
    #[serde(default)]
    pub memory_image: Option<PathBuf>,
    /// Load address of `memory_image` (default: 0xC000, work RAM)
    #[serde(default = "default_memory_image_base")]
    pub memory_image_base: u32,
    /// Accepted cartridge titles; empty accepts any (default: Red/Blue)
    #[serde(default = "default_titles")]
    pub expected_titles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Snapshots per second (default: 10)
    #[serde(default = "default_tick_rate")]
    pub tick_rate_hz: u32,
    /// Emulator frames stepped per tick (default: 6)
    #[serde(default = "default_frame_stride")]
    pub frame_stride: u32,
    /// Frames a pressed button is held (default: 24)
    #[serde(default = "default_hold_frames")]
    pub hold_frames: u32,
    /// Frames a button stays released before it may be pressed again (default: 1)
    #[serde(default = "default_release_frames")]
    pub release_frames: u32,
    /// Frames stepped before the first tick (default: 180)
    #[serde(default = "default_warmup_frames")]
    pub warmup_frames: u32,
    /// Tie-break order for the top-level state
    #[serde(default = "default_state_priority")]
    pub state_priority: Vec<GameState>,
    /// Ticks between summary log lines; 0 disables them (default: 50)
    #[serde(default = "default_summary_interval")]
    pub summary_interval: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8765
}
fn default_outbound_queue() -> usize {
    8
}
fn default_input_queue() -> usize {
    256
}

fn default_addresses() -> PathBuf {
    PathBuf::from("schemas/pokemon_red/addresses.json")
}
fn default_values() -> PathBuf {
    PathBuf::from("schemas/pokemon_red/values.json")
}

fn default_memory_image_base() -> u32 {
    0xC000
}
fn default_titles() -> Vec<String> {
    vec!["POKEMON RED".to_string(), "POKEMON BLUE".to_string()]
}

fn default_tick_rate() -> u32 {
    10
}
fn default_frame_stride() -> u32 {
    6
}
fn default_hold_frames() -> u32 {
    24
}
fn default_release_frames() -> u32 {
    1
}
fn default_warmup_frames() -> u32 {
    180
}
fn default_state_priority() -> Vec<GameState> {
    StatePriority::default().order().to_vec()
}
fn default_summary_interval() -> u64 {
    50
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            outbound_queue: default_outbound_queue(),
            input_queue: default_input_queue(),
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            addresses: default_addresses(),
            values: default_values(),
        }
    }
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            rom: None,
            memory_image: None,
            memory_image_base: default_memory_image_base(),
            expected_titles: default_titles(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate(),
            frame_stride: default_frame_stride(),
            hold_frames: default_hold_frames(),
            release_frames: default_release_frames(),
            warmup_frames: default_warmup_frames(),
            state_priority: default_state_priority(),
            summary_interval: default_summary_interval(),
        }
    }
}

impl ServerConfig {
    /// Parsed bind address
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ConfigError::Invalid {
                setting: "server.host",
                reason: format!("'{}' is not an IP address ({})", self.host, e),
            })
    }
}

impl SessionConfig {
    pub fn priority(&self) -> StatePriority {
        StatePriority::new(self.state_priority.iter().copied())
    }
}

impl Config {
    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("session.tick_rate_hz", self.session.tick_rate_hz),
            ("session.frame_stride", self.session.frame_stride),
            ("session.hold_frames", self.session.hold_frames),
            ("session.release_frames", self.session.release_frames),
        ];
        for (setting, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    setting,
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        if self.server.outbound_queue == 0 {
            return Err(ConfigError::Invalid {
                setting: "server.outbound_queue",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.server.input_queue == 0 {
            return Err(ConfigError::Invalid {
                setting: "server.input_queue",
                reason: "must be at least 1".to_string(),
            });
        }
        self.server.bind_addr()?;
        Ok(())
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Linux: `~/.config/statecast`
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.statecast", "", "statecast")
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default config file path, if a config directory exists
pub fn default_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Load a config file.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load the config file at the default location.
///
/// Returns defaults if there is no config directory or no file in it; a
/// file that exists but cannot be parsed is an error.
pub fn load() -> Result<Config, ConfigError> {
    match default_path() {
        Some(path) if path.exists() => load_from(&path),
        _ => Ok(Config::default()),
    }
}

/// Write a config file, creating its directory.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(write_err)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(write_err)
}
